//! Frame persistence.
//!
//! Archived frames are keyed by capture time: one directory per capture
//! date, one file per frame named by high-resolution time of day. The image
//! format follows the configured extension.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use image::{ExtendedColorType, ImageFormat};
use std::path::PathBuf;

/// Storage capability: persist an RGB24 frame, return its locator.
pub trait FrameStore: Send {
    fn persist(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf>;
}

/// Filesystem store: `base_path/YYYY-MM-DD/HH-MM-SS-micros.ext`.
pub struct FilesystemFrameStore {
    base_path: PathBuf,
    extension: String,
    format: ImageFormat,
}

impl FilesystemFrameStore {
    pub fn new(base_path: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        let format = ImageFormat::from_extension(extension)
            .ok_or_else(|| anyhow!("unsupported image extension '{}'", extension))?;
        Ok(Self {
            base_path: base_path.into(),
            extension: extension.to_string(),
            format,
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl FrameStore for FilesystemFrameStore {
    fn persist(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        let day_dir = self
            .base_path
            .join(timestamp.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&day_dir)
            .with_context(|| format!("create archive directory {}", day_dir.display()))?;

        let file_name = format!("{}.{}", timestamp.format("%H-%M-%S-%6f"), self.extension);
        let path = day_dir.join(file_name);
        image::save_buffer_with_format(
            &path,
            data,
            width,
            height,
            ExtendedColorType::Rgb8,
            self.format,
        )
        .with_context(|| format!("encode frame to {}", path.display()))?;
        Ok(path)
    }
}

/// In-memory store for tests: records persist calls and hands out synthetic
/// locators, or fails on demand.
pub struct InMemoryFrameStore {
    pub persisted: Vec<(u32, u32, DateTime<Local>)>,
    pub fail: bool,
}

impl InMemoryFrameStore {
    pub fn new() -> Self {
        Self {
            persisted: Vec::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            persisted: Vec::new(),
            fail: true,
        }
    }
}

impl Default for InMemoryFrameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStore for InMemoryFrameStore {
    fn persist(
        &mut self,
        _data: &[u8],
        width: u32,
        height: u32,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        if self.fail {
            return Err(anyhow!("in-memory store configured to fail"));
        }
        self.persisted.push((width, height, timestamp));
        Ok(PathBuf::from(format!(
            "mem/frame-{}.png",
            self.persisted.len()
        )))
    }
}
