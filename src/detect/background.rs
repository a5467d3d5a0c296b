//! Background model: a slowly-adapting reference image for change detection.
//!
//! The model keeps an exponentially-weighted running average of scene
//! luminance. It represents the static scene, not the previous frame, so
//! short-lived motion is not absorbed within a single step while persistent
//! change (a lighting shift, a parked object) gradually is.

use crate::frame::{clamp_to_u8, LumaPlane};

/// Running-average luminance model. Constructed from the first frame of a
/// session and mutated in place on every subsequent frame.
///
/// The plane shape is fixed at construction; feeding a plane of a different
/// shape is a programming error and panics.
pub struct BackgroundModel {
    avg: Vec<f32>,
    width: u32,
    height: u32,
}

impl BackgroundModel {
    /// Initialize the running average from the session's first frame.
    pub fn new(plane: &LumaPlane) -> Self {
        Self {
            avg: plane.data.iter().map(|&p| p as f32).collect(),
            width: plane.width,
            height: plane.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fold a frame into the running average:
    /// `avg[p] = avg[p] * (1 - smoothing) + frame[p] * smoothing`.
    ///
    /// `smoothing` must be in `(0, 1]` and constant across a session.
    pub fn update(&mut self, plane: &LumaPlane, smoothing: f32) {
        self.assert_shape(plane);
        assert!(
            smoothing > 0.0 && smoothing <= 1.0,
            "smoothing factor {} outside (0, 1]",
            smoothing
        );
        for (avg, &pixel) in self.avg.iter_mut().zip(plane.data.iter()) {
            *avg = *avg * (1.0 - smoothing) + pixel as f32 * smoothing;
        }
    }

    /// Per-pixel absolute difference between a frame and the rounded running
    /// average. Pure; does not advance the model.
    pub fn difference(&self, plane: &LumaPlane) -> Vec<u8> {
        self.assert_shape(plane);
        self.avg
            .iter()
            .zip(plane.data.iter())
            .map(|(&avg, &pixel)| pixel.abs_diff(clamp_to_u8(avg)))
            .collect()
    }

    fn assert_shape(&self, plane: &LumaPlane) {
        assert!(
            plane.width == self.width && plane.height == self.height,
            "luma plane shape {}x{} does not match model shape {}x{}",
            plane.width,
            plane.height,
            self.width,
            self.height
        );
    }
}
