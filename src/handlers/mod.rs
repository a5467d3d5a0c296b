//! Motion handlers.
//!
//! When a frame is judged to contain motion, the capture loop builds one
//! `MotionEvent` and hands it to every configured handler, in configuration
//! order, one at a time. Handlers are independent: a failure in one is
//! logged and the rest still run. The event is shared mutable state for the
//! duration of one dispatch pass only - the archive handler records the
//! storage locator on it, and later handlers may read that locator.

mod archive;
mod notify;

use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::PathBuf;

use crate::detect::MotionRegion;
use crate::frame::Frame;

pub use archive::ArchiveHandler;
pub use notify::NotifyHandler;

/// The unit of dispatch for one motion verdict. Not retained after the
/// dispatch pass completes.
pub struct MotionEvent<'a> {
    pub timestamp: DateTime<Local>,
    pub frame: &'a Frame,
    pub regions: &'a [MotionRegion],
    /// Storage locator of the archived frame, once a handler has persisted it.
    pub locator: Option<PathBuf>,
}

/// A consumer of motion events. Each variant applies its own gating; the
/// dispatcher is agnostic to the concrete handler.
pub trait MotionHandler: Send {
    fn name(&self) -> &'static str;
    fn handle(&mut self, event: &mut MotionEvent<'_>) -> Result<()>;
}

/// Invoke every handler in order. Handler failures are logged and do not
/// block subsequent handlers.
pub fn dispatch(handlers: &mut [Box<dyn MotionHandler>], event: &mut MotionEvent<'_>) {
    for handler in handlers.iter_mut() {
        if let Err(err) = handler.handle(event) {
            log::warn!("motion handler '{}' failed: {:#}", handler.name(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    fn test_frame() -> Frame {
        Frame::from_rgb(vec![0u8; 4 * 4 * 3], 4, 4, Local::now()).expect("frame")
    }

    struct Recording {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, Option<PathBuf>)>>>,
        fail: bool,
        set_locator: Option<PathBuf>,
    }

    impl MotionHandler for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle(&mut self, event: &mut MotionEvent<'_>) -> Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push((self.name, event.locator.clone()));
            if let Some(path) = &self.set_locator {
                event.locator = Some(path.clone());
            }
            if self.fail {
                return Err(anyhow!("instrumented failure"));
            }
            Ok(())
        }
    }

    #[test]
    fn handlers_run_in_configuration_order_and_share_the_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let locator = PathBuf::from("mem/archived.png");
        let mut handlers: Vec<Box<dyn MotionHandler>> = vec![
            Box::new(Recording {
                name: "first",
                seen: seen.clone(),
                fail: false,
                set_locator: Some(locator.clone()),
            }),
            Box::new(Recording {
                name: "second",
                seen: seen.clone(),
                fail: false,
                set_locator: None,
            }),
        ];

        let frame = test_frame();
        let regions = [MotionRegion {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            area: 4,
        }];
        let mut event = MotionEvent {
            timestamp: frame.timestamp,
            frame: &frame,
            regions: &regions,
            locator: None,
        };
        dispatch(&mut handlers, &mut event);

        let seen = seen.lock().unwrap();
        // First ran before second, and second observed first's locator.
        assert_eq!(
            *seen,
            vec![("first", None), ("second", Some(locator.clone()))]
        );
        assert_eq!(event.locator, Some(locator));
    }

    #[test]
    fn a_failing_handler_does_not_block_the_next() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers: Vec<Box<dyn MotionHandler>> = vec![
            Box::new(Recording {
                name: "broken",
                seen: seen.clone(),
                fail: true,
                set_locator: None,
            }),
            Box::new(Recording {
                name: "after",
                seen: seen.clone(),
                fail: false,
                set_locator: None,
            }),
        ];

        let frame = test_frame();
        let mut event = MotionEvent {
            timestamp: frame.timestamp,
            frame: &frame,
            regions: &[],
            locator: None,
        };
        dispatch(&mut handlers, &mut event);

        let names: Vec<_> = seen.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["broken", "after"]);
    }
}
