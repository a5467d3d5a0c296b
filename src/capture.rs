//! Capture loop orchestration.
//!
//! One logical thread drives acquisition, detection, and dispatch: a frame
//! is fully processed before the next one is acquired, so a slow handler
//! back-pressures the stream by construction. `stop()` is an atomic flag
//! observed at the top of each iteration - it never interrupts an in-flight
//! frame.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::detect::{BackgroundModel, MotionDetector, MotionRegion};
use crate::frame::Frame;
use crate::handlers::{dispatch, MotionEvent, MotionHandler};
use crate::ingest::FrameSource;
use crate::rate_limit::RateLimiter;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of a capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    Stopping,
}

/// Live-preview seam. Presentation runs after dispatch and has no effect on
/// detection or dispatch; implementations must not mutate anything the
/// pipeline observes.
pub trait Presenter: Send {
    fn present(&mut self, frame: &Frame, regions: &[MotionRegion]);
}

/// Presenter that narrates to the log instead of opening a window.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &Frame, regions: &[MotionRegion]) {
        if !regions.is_empty() {
            log::debug!(
                "preview: {}x{} frame, {} motion region(s)",
                frame.width,
                frame.height,
                regions.len()
            );
        }
    }
}

/// Cloneable stop signal, safe to trigger from a signal handler or another
/// thread while the loop is mid-iteration.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Drives FrameSource -> MotionDetector -> handler dispatch until stopped,
/// the source ends, or the device fails permanently.
pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    detector: MotionDetector,
    handlers: Vec<Box<dyn MotionHandler>>,
    /// Gates how often motion verdicts become events (minimum inter-capture
    /// interval); committed at event creation.
    capture_gate: RateLimiter,
    presenter: Option<Box<dyn Presenter>>,
    model: Option<BackgroundModel>,
    state: LoopState,
    stop: Arc<AtomicBool>,
}

impl CaptureLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: MotionDetector,
        handlers: Vec<Box<dyn MotionHandler>>,
        min_interval: Duration,
    ) -> Self {
        Self {
            source,
            detector,
            handlers,
            capture_gate: RateLimiter::new(min_interval),
            presenter: None,
            model: None,
            state: LoopState::Stopped,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Run the capture session. Blocks until stopped or the source ends;
    /// only a permanently failed device makes this return an error. A
    /// stopped session stays stopped.
    pub fn run(&mut self) -> Result<()> {
        self.source.connect()?;
        self.state = LoopState::Running;
        log::info!("starting capture");

        let mut last_health_log = Instant::now();
        let mut event_count = 0u64;

        let result = loop {
            if self.stop.load(Ordering::SeqCst) {
                self.state = LoopState::Stopping;
                break Ok(());
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("frame source ended");
                    break Ok(());
                }
                Err(err) => break Err(err),
            };

            let plane = self.detector.preprocess(&frame);
            let regions = match self.model.as_mut() {
                Some(model) => self.detector.detect(&plane, model),
                None => {
                    // First frame of the session seeds the background model;
                    // no verdict is produced for it.
                    self.model = Some(BackgroundModel::new(&plane));
                    continue;
                }
            };

            if !regions.is_empty() && self.capture_gate.should_fire(frame.timestamp) {
                self.capture_gate.mark_fired(frame.timestamp);
                event_count += 1;
                log::info!("motion event #{}: {} region(s)", event_count, regions.len());
                let mut event = MotionEvent {
                    timestamp: frame.timestamp,
                    frame: &frame,
                    regions: &regions,
                    locator: None,
                };
                dispatch(&mut self.handlers, &mut event);
            }

            if let Some(presenter) = self.presenter.as_mut() {
                presenter.present(&frame, &regions);
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "source health={} frames={} source={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.source
                );
                last_health_log = Instant::now();
            }
        };

        self.state = LoopState::Stopped;
        log::info!("capture stopped");
        result
    }
}
