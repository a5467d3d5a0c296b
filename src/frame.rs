//! Frame containers.
//!
//! - `Frame`: Owned RGB24 pixel buffer captured from a source, stamped at
//!   capture time. A frame belongs to exactly one loop iteration and is
//!   dropped when that iteration completes.
//! - `LumaPlane`: 8-bit grayscale plane derived from a `Frame`. Detection
//!   operates on luma planes only; the RGB buffer is never mutated by the
//!   detection pass.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

/// A single captured frame: RGB24 pixels plus capture metadata.
pub struct Frame {
    /// Interleaved RGB pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Wall-clock capture time, stamped by the source.
    pub timestamp: DateTime<Local>,
}

impl Frame {
    /// Create a frame from an RGB24 buffer. The buffer length must match the
    /// dimensions exactly.
    pub fn from_rgb(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp: DateTime<Local>,
    ) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp,
        })
    }

    /// Convert to an 8-bit luminance plane (Rec. 601 weights).
    pub fn to_luma(&self) -> LumaPlane {
        let pixel_count = (self.width * self.height) as usize;
        let mut data = vec![0u8; pixel_count];
        for (i, luma) in data.iter_mut().enumerate() {
            let r = self.data[i * 3] as f32;
            let g = self.data[i * 3 + 1] as f32;
            let b = self.data[i * 3 + 2] as f32;
            *luma = clamp_to_u8(0.299 * r + 0.587 * g + 0.114 * b);
        }
        LumaPlane {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// 8-bit grayscale plane, same geometry as the frame it came from.
#[derive(Clone)]
pub struct LumaPlane {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl LumaPlane {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("plane dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "luma plane length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub(crate) fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
