//! sentinel - motion-detection capture pipeline
//!
//! This crate watches a camera frame stream, compares each frame against a
//! slowly-adapting background model, and turns significant change into
//! motion events that fan out to a configured, ordered set of handlers:
//! archiving the frame to disk and (optionally) emailing a rate-limited
//! notification with the archived image attached.
//!
//! # Architecture
//!
//! - `ingest`: frame sources (V4L2 devices, synthetic stub)
//! - `frame`: owned frame buffers and luminance planes
//! - `detect`: background model + motion detector + regions
//! - `handlers`: the MotionHandler capability, archive and notify variants
//! - `rate_limit`: per-consumer minimum-interval gate
//! - `storage`: frame archive (date-keyed image files)
//! - `transport`: notification delivery (SMTP)
//! - `overlay`: region annotation on frame copies
//! - `capture`: the orchestrating loop and its lifecycle
//! - `config`: daemon configuration
//!
//! Everything is serial per frame: acquisition, detection, and dispatch for
//! one frame complete before the next frame is acquired. Handlers never see
//! overlapping events, and the background model has a single writer.

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod handlers;
pub mod ingest;
pub mod overlay;
pub mod rate_limit;
pub mod storage;
pub mod transport;

pub use capture::{CaptureLoop, LogPresenter, LoopState, Presenter, StopHandle};
pub use config::{EmailSettings, SentinelConfig};
pub use detect::{BackgroundModel, DetectorSettings, MotionDetector, MotionRegion};
pub use frame::{Frame, LumaPlane};
pub use handlers::{dispatch, ArchiveHandler, MotionEvent, MotionHandler, NotifyHandler};
pub use ingest::{CameraConfig, CameraSource, FrameSource, SourceStats};
pub use rate_limit::RateLimiter;
pub use storage::{FilesystemFrameStore, FrameStore, InMemoryFrameStore};
pub use transport::{MailAttachment, MailTransport, OutgoingMail, SmtpConfig, SmtpMailer};
