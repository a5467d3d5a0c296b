//! Archive handler: persist the frame of every motion event.

use anyhow::Result;

use super::{MotionEvent, MotionHandler};
use crate::overlay;
use crate::storage::FrameStore;

/// Persists every event's frame, ungated. On success the storage locator is
/// recorded on the event for downstream handlers.
pub struct ArchiveHandler {
    store: Box<dyn FrameStore>,
    annotate: bool,
}

impl ArchiveHandler {
    pub fn new(store: Box<dyn FrameStore>, annotate: bool) -> Self {
        Self { store, annotate }
    }
}

impl MotionHandler for ArchiveHandler {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn handle(&mut self, event: &mut MotionEvent<'_>) -> Result<()> {
        let frame = event.frame;
        let path = if self.annotate {
            // Annotation works on a copy; the captured buffer stays pristine.
            let mut copy = frame.data.clone();
            overlay::draw_region_outlines(&mut copy, frame.width, frame.height, event.regions);
            self.store
                .persist(&copy, frame.width, frame.height, event.timestamp)?
        } else {
            self.store
                .persist(&frame.data, frame.width, frame.height, event.timestamp)?
        };
        log::info!("motion recorded to {}", path.display());
        event.locator = Some(path);
        Ok(())
    }
}
