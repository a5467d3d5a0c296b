//! Notify handler: rate-limited email notification with the archived image.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use super::{MotionEvent, MotionHandler};
use crate::rate_limit::RateLimiter;
use crate::transport::{MailAttachment, MailTransport, OutgoingMail};

/// Sends a notification for motion events that pass this handler's private
/// interval gate. The gate commits only on a confirmed delivery, so a failed
/// send is retried on the next eligible event rather than on a timer.
pub struct NotifyHandler {
    limiter: RateLimiter,
    transport: Box<dyn MailTransport>,
    from: String,
    to: String,
}

impl NotifyHandler {
    pub fn new(
        transport: Box<dyn MailTransport>,
        from: impl Into<String>,
        to: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(interval),
            transport,
            from: from.into(),
            to: to.into(),
        }
    }
}

impl MotionHandler for NotifyHandler {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn handle(&mut self, event: &mut MotionEvent<'_>) -> Result<()> {
        if !self.limiter.should_fire(event.timestamp) {
            // Under the interval: not an error, not even noteworthy.
            log::debug!("notification suppressed: under minimum interval");
            return Ok(());
        }

        // Without an archived image there is nothing to attach; degrade to a
        // log line and keep the gate open.
        let Some(locator) = event.locator.clone() else {
            log::warn!("notification skipped: motion event has no archived image");
            return Ok(());
        };
        let bytes = match std::fs::read(&locator) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!(
                    "notification skipped: cannot read archived image {}: {}",
                    locator.display(),
                    err
                );
                return Ok(());
            }
        };

        let subject = format!(
            "Motion detected at {}",
            event.timestamp.format("%A %d %B %Y %I:%M:%S %p")
        );
        let file_name = locator
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("capture");
        let mail = OutgoingMail {
            subject: &subject,
            from: &self.from,
            to: &self.to,
            attachment: Some(MailAttachment {
                file_name,
                content_type: content_type_for(&locator),
                bytes: &bytes,
            }),
        };

        // A delivery failure propagates without committing the gate, so the
        // next eligible event becomes the retry opportunity.
        self.transport.send(&mail)?;
        self.limiter.mark_fired(event.timestamp);
        log::info!("notification sent: {}", subject);
        Ok(())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MotionRegion;
    use crate::frame::Frame;
    use anyhow::anyhow;
    use chrono::{DateTime, Duration as ChronoDuration, Local};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct FakeTransport {
        sent: Arc<Mutex<Vec<String>>>,
        fail_first: bool,
        calls: usize,
    }

    impl MailTransport for FakeTransport {
        fn send(&mut self, mail: &OutgoingMail<'_>) -> Result<()> {
            self.calls += 1;
            if self.fail_first && self.calls == 1 {
                return Err(anyhow!("relay unavailable"));
            }
            self.sent.lock().unwrap().push(mail.subject.to_string());
            Ok(())
        }
    }

    fn archived_image() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"not really a png").expect("write");
        (dir, path)
    }

    fn run_event(
        handler: &mut NotifyHandler,
        timestamp: DateTime<Local>,
        locator: Option<PathBuf>,
    ) -> Result<()> {
        let frame = Frame::from_rgb(vec![0u8; 2 * 2 * 3], 2, 2, timestamp).expect("frame");
        let regions = [MotionRegion {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            area: 1,
        }];
        let mut event = MotionEvent {
            timestamp,
            frame: &frame,
            regions: &regions,
            locator,
        };
        handler.handle(&mut event)
    }

    #[test]
    fn gated_event_is_a_silent_no_op() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (_dir, image) = archived_image();
        let mut handler = NotifyHandler::new(
            Box::new(FakeTransport {
                sent: sent.clone(),
                fail_first: false,
                calls: 0,
            }),
            "cam@example.com",
            "owner@example.com",
            Duration::from_secs(10),
        );

        let t0 = Local::now();
        run_event(&mut handler, t0, Some(image.clone())).expect("first");
        run_event(&mut handler, t0 + ChronoDuration::seconds(1), Some(image)).expect("second");

        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn missing_locator_degrades_without_committing_the_gate() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (_dir, image) = archived_image();
        let mut handler = NotifyHandler::new(
            Box::new(FakeTransport {
                sent: sent.clone(),
                fail_first: false,
                calls: 0,
            }),
            "cam@example.com",
            "owner@example.com",
            Duration::from_secs(10),
        );

        let t0 = Local::now();
        run_event(&mut handler, t0, None).expect("degraded");
        assert!(sent.lock().unwrap().is_empty());

        // The gate never committed, so the very next event with an image sends.
        run_event(&mut handler, t0 + ChronoDuration::seconds(1), Some(image)).expect("send");
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_delivery_retries_on_the_next_eligible_event() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (_dir, image) = archived_image();
        let mut handler = NotifyHandler::new(
            Box::new(FakeTransport {
                sent: sent.clone(),
                fail_first: true,
                calls: 0,
            }),
            "cam@example.com",
            "owner@example.com",
            Duration::from_secs(10),
        );

        let t0 = Local::now();
        assert!(run_event(&mut handler, t0, Some(image.clone())).is_err());
        assert!(sent.lock().unwrap().is_empty());

        // No commit happened, so one second later the send is attempted again.
        run_event(&mut handler, t0 + ChronoDuration::seconds(1), Some(image)).expect("retry");
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn commit_uses_the_event_timestamp() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (_dir, image) = archived_image();
        let mut handler = NotifyHandler::new(
            Box::new(FakeTransport {
                sent: sent.clone(),
                fail_first: false,
                calls: 0,
            }),
            "cam@example.com",
            "owner@example.com",
            Duration::from_secs(10),
        );

        let t0 = Local::now();
        run_event(&mut handler, t0, Some(image.clone())).expect("first");
        run_event(
            &mut handler,
            t0 + ChronoDuration::seconds(9),
            Some(image.clone()),
        )
        .expect("gated");
        run_event(&mut handler, t0 + ChronoDuration::seconds(10), Some(image)).expect("eligible");

        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}
