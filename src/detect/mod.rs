mod background;
mod motion;
mod result;

pub use background::BackgroundModel;
pub use motion::{DetectorSettings, MotionDetector};
pub use result::MotionRegion;
