//! Camera frame source.
//!
//! `CameraSource` unifies local capture devices behind the `FrameSource`
//! capability: a V4L2 device node (feature `capture-v4l2`) for real
//! hardware, with a synthetic backend for `stub://` device names used by
//! tests and demos. Device-specific concerns - preferred resolution and
//! frame rate, warmup discard, dropped-frame retry - live here, not in the
//! detection core.

use anyhow::Result;
use chrono::Local;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Consecutive failed captures tolerated before the device is considered
/// permanently gone.
#[cfg(feature = "capture-v4l2")]
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device node (e.g., "/dev/video0") or "stub://name" for the synthetic
    /// backend.
    pub device: String,
    /// Target frame rate (frames per second); the device may decimate.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Frames to capture and discard right after connecting, for devices
    /// that need settling time before exposure stabilizes.
    pub warmup_frames: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            warmup_frames: 0,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
    warmup_frames: u32,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "capture-v4l2")]
    Device(DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let warmup_frames = config.warmup_frames;
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
                warmup_frames,
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCameraSource::new(config)?),
                    warmup_frames,
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                anyhow::bail!("device capture requires the capture-v4l2 feature")
            }
        }
    }

    fn backend_next(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect()?,
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.connect()?,
        }
        for _ in 0..self.warmup_frames {
            if self.backend_next()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.backend_next()
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.config.target_fps > 0 {
            std::thread::sleep(std::time::Duration::from_millis(
                (1000 / self.config.target_fps) as u64,
            ));
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        let frame = Frame::from_rgb(
            pixels,
            self.config.width,
            self.config.height,
            Local::now(),
        )?;
        Ok(Some(frame))
    }

    /// Flat scene with a bright square "intruder" for a few frames out of
    /// every fifty, so downstream detection has something to find.
    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut pixels = vec![96u8; width * height * 3];

        if self.frame_count % 50 < 5 {
            let side = (width.min(height) / 8).max(1);
            let x0 = width / 4;
            let y0 = height / 4;
            for y in y0..(y0 + side).min(height) {
                for x in x0..(x0 + side).min(width) {
                    let offset = (y * width + x) * 3;
                    pixels[offset] = 235;
                    pixels[offset + 1] = 235;
                    pixels[offset + 2] = 235;
                }
            }
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// V4L2 device source
// ----------------------------------------------------------------------------

#[cfg(feature = "capture-v4l2")]
struct DeviceCameraSource {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    consecutive_failures: u32,
    last_frame_at: Option<std::time::Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "capture-v4l2")]
#[ouroboros::self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "capture-v4l2")]
impl DeviceCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            consecutive_failures: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use anyhow::Context;
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open capture device {}", self.config.device))?;
        let mut format = device.format().context("read device format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read device format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create capture stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    /// Capture the next frame, absorbing dropped frames. Only a run of
    /// consecutive failures long enough to indicate a dead device errors.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use anyhow::Context;
        use v4l::io::traits::CaptureStream;

        let expected = (self.active_width * self.active_height * 3) as usize;
        loop {
            let captured = {
                let state = self.state.as_mut().context("capture device not connected")?;
                match state.with_mut(|fields| fields.stream.next()) {
                    Ok((buf, _meta)) => Ok(buf.to_vec()),
                    Err(err) => Err(err.to_string()),
                }
            };
            match captured {
                Ok(data) if data.len() != expected => {
                    // Stride/format hiccup: drop the frame and try again.
                    self.note_failure(format!(
                        "unexpected buffer length {} (expected {})",
                        data.len(),
                        expected
                    ))?;
                }
                Ok(data) => {
                    self.frame_count += 1;
                    self.consecutive_failures = 0;
                    self.last_frame_at = Some(std::time::Instant::now());
                    let frame = Frame::from_rgb(
                        data,
                        self.active_width,
                        self.active_height,
                        Local::now(),
                    )?;
                    return Ok(Some(frame));
                }
                Err(reason) => {
                    self.note_failure(reason)?;
                }
            }
        }
    }

    /// Record a dropped frame; errors once the failure run reaches the cap.
    fn note_failure(&mut self, reason: String) -> Result<()> {
        use anyhow::anyhow;

        self.consecutive_failures += 1;
        log::warn!(
            "CameraSource: dropped frame on {} ({} consecutive): {}",
            self.config.device,
            self.consecutive_failures,
            reason
        );
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            self.last_error = Some(reason.clone());
            return Err(anyhow!(
                "capture device {} is gone: {}",
                self.config.device,
                reason
            ));
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.device.clone(),
        }
    }

    fn health_grace(&self) -> std::time::Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        std::time::Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
