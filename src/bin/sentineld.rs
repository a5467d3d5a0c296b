//! sentineld - motion-detection capture daemon
//!
//! This daemon:
//! 1. Loads configuration (JSON file + env overrides)
//! 2. Opens the configured frame source
//! 3. Runs background-model motion detection on every frame
//! 4. Archives motion frames and sends rate-limited email notifications
//! 5. Stops cleanly on SIGINT/SIGTERM

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use sentinel::{
    ArchiveHandler, CameraConfig, CameraSource, CaptureLoop, DetectorSettings,
    FilesystemFrameStore, LogPresenter, MotionDetector, MotionHandler, NotifyHandler,
    SentinelConfig, SmtpConfig, SmtpMailer,
};

#[derive(Parser, Debug)]
#[command(name = "sentineld", about = "Motion-detection capture daemon")]
struct Args {
    /// Path to the configuration file
    #[arg(short = 'c', long, env = "SENTINEL_CONFIG")]
    configuration: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = SentinelConfig::load(args.configuration.as_deref())?;

    log::info!("opening device {}", cfg.device);
    let source = CameraSource::new(CameraConfig {
        device: cfg.device.clone(),
        target_fps: cfg.framerate,
        width: cfg.width,
        height: cfg.height,
        warmup_frames: cfg.warmup_frames,
    })?;

    let detector = MotionDetector::new(DetectorSettings {
        delta_threshold: cfg.delta_threshold,
        min_area: cfg.min_area,
        smoothing: cfg.smoothing,
    });

    let store = FilesystemFrameStore::new(cfg.base_path.clone(), &cfg.image_ext)
        .context("configure frame archive")?;
    let mut handlers: Vec<Box<dyn MotionHandler>> =
        vec![Box::new(ArchiveHandler::new(Box::new(store), cfg.annotate))];
    if cfg.email.enabled {
        let mailer = SmtpMailer::new(SmtpConfig {
            host: cfg.email.host.clone(),
            port: cfg.email.port,
            username: cfg.email.from.clone(),
            password: cfg.email.password.clone(),
        });
        handlers.push(Box::new(NotifyHandler::new(
            Box::new(mailer),
            cfg.email.from.clone(),
            cfg.email.to.clone(),
            cfg.email.interval,
        )));
        log::info!("notifications enabled to {}", cfg.email.to);
    }

    let mut capture = CaptureLoop::new(Box::new(source), detector, handlers, cfg.min_interval);
    if cfg.display {
        capture = capture.with_presenter(Box::new(LogPresenter));
    }

    let stop = capture.stop_handle();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received");
        stop.stop();
    })
    .context("install signal handler")?;

    log::info!("sentineld running. archiving to {}", cfg.base_path.display());
    log::info!(
        "detector: delta_threshold={} min_area={} smoothing={}",
        cfg.delta_threshold,
        cfg.min_area,
        cfg.smoothing
    );
    capture.run()
}
