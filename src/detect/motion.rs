//! Motion detector: turns a frame plus the background model into a set of
//! motion regions.
//!
//! The pipeline per frame:
//! 1. grayscale + fixed smoothing blur (`preprocess`, also used for the
//!    first-frame initialization path so the model always sees the same
//!    kernel),
//! 2. absolute difference against the background model,
//! 3. binarize at the delta threshold,
//! 4. dilate to close gaps between adjacent changed clusters,
//! 5. connected components with bounding boxes,
//! 6. drop regions under the minimum area,
//! 7. fold the frame into the model.

use crate::detect::background::BackgroundModel;
use crate::detect::result::MotionRegion;
use crate::frame::{Frame, LumaPlane};

/// Radius of the box-blur smoothing kernel applied before differencing.
const BLUR_RADIUS: isize = 2;
/// Box-blur passes; two passes approximate a Gaussian.
const BLUR_PASSES: usize = 2;
/// Dilation iterations applied to the binarized delta mask.
const DILATE_ITERATIONS: usize = 2;

/// Tuning knobs for the detector. Immutable for a capture session.
#[derive(Clone, Copy, Debug)]
pub struct DetectorSettings {
    /// Minimum per-pixel delta, in [0, 255], for a pixel to count as changed.
    /// Higher is less sensitive.
    pub delta_threshold: u8,
    /// Regions with fewer changed pixels than this are noise and discarded.
    /// A region exactly at the minimum is kept.
    pub min_area: u32,
    /// Background smoothing factor in (0, 1].
    pub smoothing: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            delta_threshold: 5,
            min_area: 5000,
            smoothing: 0.5,
        }
    }
}

pub struct MotionDetector {
    settings: DetectorSettings,
}

impl MotionDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Grayscale + blur. The same deterministic kernel is applied to every
    /// frame, including the one used to initialize the background model.
    pub fn preprocess(&self, frame: &Frame) -> LumaPlane {
        box_blur(&frame.to_luma())
    }

    /// Detect motion regions in a preprocessed plane, then fold the plane
    /// into the model so the background keeps adapting regardless of the
    /// verdict. Motion occurred iff the returned set is non-empty.
    pub fn detect(&self, plane: &LumaPlane, model: &mut BackgroundModel) -> Vec<MotionRegion> {
        let width = plane.width as usize;
        let height = plane.height as usize;

        let delta = model.difference(plane);
        let mut mask = binarize(&delta, self.settings.delta_threshold);
        for _ in 0..DILATE_ITERATIONS {
            mask = dilate(&mask, width, height);
        }
        let mut regions = connected_regions(&mut mask, width, height);
        regions.retain(|region| region.area >= self.settings.min_area);

        model.update(plane, self.settings.smoothing);
        regions
    }
}

/// Separable box blur with edge clamping.
fn box_blur(plane: &LumaPlane) -> LumaPlane {
    let width = plane.width as usize;
    let height = plane.height as usize;
    let mut current = plane.data.clone();
    for _ in 0..BLUR_PASSES {
        current = blur_axis(&current, width, height, true);
        current = blur_axis(&current, width, height, false);
    }
    LumaPlane {
        data: current,
        width: plane.width,
        height: plane.height,
    }
}

fn blur_axis(src: &[u8], width: usize, height: usize, horizontal: bool) -> Vec<u8> {
    let mut dst = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            let mut count = 0u32;
            for offset in -BLUR_RADIUS..=BLUR_RADIUS {
                let (sx, sy) = if horizontal {
                    (x as isize + offset, y as isize)
                } else {
                    (x as isize, y as isize + offset)
                };
                if sx >= 0 && sx < width as isize && sy >= 0 && sy < height as isize {
                    sum += src[sy as usize * width + sx as usize] as u32;
                    count += 1;
                }
            }
            dst[y * width + x] = (sum / count) as u8;
        }
    }
    dst
}

/// Mark every pixel whose delta reaches the threshold as changed (255).
fn binarize(delta: &[u8], threshold: u8) -> Vec<u8> {
    delta
        .iter()
        .map(|&d| if d >= threshold { 255 } else { 0 })
        .collect()
}

/// One 3x3 morphological dilation pass over a binary mask.
fn dilate(mask: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; mask.len()];
    for y in 0..height {
        for x in 0..width {
            let mut hit = false;
            'scan: for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx >= 0
                        && nx < width as isize
                        && ny >= 0
                        && ny < height as isize
                        && mask[ny as usize * width + nx as usize] != 0
                    {
                        hit = true;
                        break 'scan;
                    }
                }
            }
            if hit {
                out[y * width + x] = 255;
            }
        }
    }
    out
}

/// Extract 8-connected components from a binary mask. Visited pixels are
/// cleared in place, so the mask is consumed.
fn connected_regions(mask: &mut [u8], width: usize, height: usize) -> Vec<MotionRegion> {
    let mut regions = Vec::new();
    let mut stack = Vec::new();
    for start_y in 0..height {
        for start_x in 0..width {
            if mask[start_y * width + start_x] == 0 {
                continue;
            }
            mask[start_y * width + start_x] = 0;
            stack.push((start_x, start_y));

            let (mut min_x, mut min_y) = (start_x, start_y);
            let (mut max_x, mut max_y) = (start_x, start_y);
            let mut area = 0u32;

            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for dy in -1isize..=1 {
                    for dx in -1isize..=1 {
                        let nx = x as isize + dx;
                        let ny = y as isize + dy;
                        if nx < 0 || nx >= width as isize || ny < 0 || ny >= height as isize {
                            continue;
                        }
                        let index = ny as usize * width + nx as usize;
                        if mask[index] != 0 {
                            mask[index] = 0;
                            stack.push((nx as usize, ny as usize));
                        }
                    }
                }
            }

            regions.push(MotionRegion {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
                area,
            });
        }
    }
    regions
}
