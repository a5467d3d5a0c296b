use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DEVICE: &str = "stub://camera";
const DEFAULT_DISPLAY: bool = true;
const DEFAULT_FRAMERATE: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_DELTA_THRESHOLD: u8 = 5;
const DEFAULT_MIN_AREA: u32 = 5000;
const DEFAULT_SMOOTHING: f32 = 0.5;
const DEFAULT_MIN_INTERVAL_SECS: f64 = 10.0;
const DEFAULT_BASE_PATH: &str = "./data";
const DEFAULT_IMAGE_EXT: &str = "png";
const DEFAULT_ANNOTATE: bool = true;
const DEFAULT_WARMUP_FRAMES: u32 = 0;
const DEFAULT_SMTP_PORT: u16 = 25;
const DEFAULT_EMAIL_INTERVAL_SECS: f64 = 60.0;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    device: Option<String>,
    display: Option<bool>,
    framerate: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    delta_threshold: Option<u8>,
    min_area: Option<u32>,
    smoothing: Option<f32>,
    min_interval: Option<f64>,
    base_path: Option<PathBuf>,
    image_ext: Option<String>,
    annotate: Option<bool>,
    warmup_frames: Option<u32>,
    email: Option<EmailConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct EmailConfigFile {
    enabled: Option<bool>,
    from: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    to: Option<String>,
    interval: Option<f64>,
}

/// Resolved daemon configuration. Read once at process start, immutable for
/// the session.
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub device: String,
    pub display: bool,
    pub framerate: u32,
    pub width: u32,
    pub height: u32,
    pub delta_threshold: u8,
    pub min_area: u32,
    pub smoothing: f32,
    /// Minimum spacing between motion events (the loop-level capture gate).
    pub min_interval: Duration,
    pub base_path: PathBuf,
    pub image_ext: String,
    pub annotate: bool,
    pub warmup_frames: u32,
    pub email: EmailSettings,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub enabled: bool,
    pub from: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub to: String,
    /// Minimum spacing between notification deliveries.
    pub interval: Duration,
}

impl SentinelConfig {
    /// Load from an explicit path, the `SENTINEL_CONFIG` env var, or
    /// defaults, then apply env overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SENTINEL_CONFIG").ok().map(PathBuf::from));
        let file_cfg = match &config_path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Result<Self> {
        let email_file = file.email.unwrap_or_default();
        let email = EmailSettings {
            enabled: email_file.enabled.unwrap_or(false),
            from: email_file.from.unwrap_or_default(),
            password: email_file.password.unwrap_or_default(),
            host: email_file.host.unwrap_or_default(),
            port: email_file.port.unwrap_or(DEFAULT_SMTP_PORT),
            to: email_file.to.unwrap_or_default(),
            interval: duration_from_secs(
                email_file.interval.unwrap_or(DEFAULT_EMAIL_INTERVAL_SECS),
                "email.interval",
            )?,
        };
        Ok(Self {
            device: file.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            display: file.display.unwrap_or(DEFAULT_DISPLAY),
            framerate: file.framerate.unwrap_or(DEFAULT_FRAMERATE),
            width: file.width.unwrap_or(DEFAULT_WIDTH),
            height: file.height.unwrap_or(DEFAULT_HEIGHT),
            delta_threshold: file.delta_threshold.unwrap_or(DEFAULT_DELTA_THRESHOLD),
            min_area: file.min_area.unwrap_or(DEFAULT_MIN_AREA),
            smoothing: file.smoothing.unwrap_or(DEFAULT_SMOOTHING),
            min_interval: duration_from_secs(
                file.min_interval.unwrap_or(DEFAULT_MIN_INTERVAL_SECS),
                "min_interval",
            )?,
            base_path: file
                .base_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH)),
            image_ext: file.image_ext.unwrap_or_else(|| DEFAULT_IMAGE_EXT.to_string()),
            annotate: file.annotate.unwrap_or(DEFAULT_ANNOTATE),
            warmup_frames: file.warmup_frames.unwrap_or(DEFAULT_WARMUP_FRAMES),
            email,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(device) = std::env::var("SENTINEL_DEVICE") {
            if !device.trim().is_empty() {
                self.device = device;
            }
        }
        if let Ok(base_path) = std::env::var("SENTINEL_BASE_PATH") {
            if !base_path.trim().is_empty() {
                self.base_path = PathBuf::from(base_path);
            }
        }
        if let Ok(password) = std::env::var("SENTINEL_SMTP_PASSWORD") {
            if !password.is_empty() {
                self.email.password = password;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(anyhow!("smoothing must be in (0, 1]"));
        }
        if self.framerate == 0 {
            return Err(anyhow!("framerate must be greater than zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("capture dimensions must be greater than zero"));
        }
        if image::ImageFormat::from_extension(&self.image_ext).is_none() {
            return Err(anyhow!("unsupported image extension '{}'", self.image_ext));
        }
        if self.email.enabled {
            for (field, value) in [
                ("email.from", &self.email.from),
                ("email.host", &self.email.host),
                ("email.to", &self.email.to),
            ] {
                if value.trim().is_empty() {
                    return Err(anyhow!("{} is required when email is enabled", field));
                }
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn duration_from_secs(value: f64, what: &str) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("{} must be a non-negative number of seconds", what));
    }
    Ok(Duration::from_secs_f64(value))
}
