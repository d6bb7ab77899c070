use float_ord::FloatOrd;
use image::{imageops::grayscale, GrayImage, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use ndarray::{s, Axis};
use tracing::instrument;

use crate::{
    config::SkewOptions,
    util::{rotate_nearest, rotate_replicate, to_array},
};

/// Estimates small in-plane rotation by searching for the angle that gives
/// the sharpest horizontal projection profile.
#[derive(Debug, Clone, Copy)]
pub struct SkewCorrector {
    limit: i32,
    delta: i32,
}

impl SkewCorrector {
    pub fn new(options: &SkewOptions) -> Self {
        Self {
            limit: options.limit.abs(),
            delta: options.delta.max(1),
        }
    }

    pub fn candidate_angles(&self) -> Vec<i32> {
        (-self.limit..=self.limit)
            .step_by(self.delta as usize)
            .collect()
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn estimate(&self, image: &RgbImage) -> i32 {
        let binary = binarize_inverted(image);
        let mut best: Option<(i32, FloatOrd<f64>)> = None;
        for angle in self.candidate_angles() {
            let score = FloatOrd(projection_score(&rotate_nearest(&binary, angle as f64)));
            log::trace!("Skew angle {angle} scored {}", score.0);
            // Strictly greater keeps the first of equal scores.
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((angle, score));
            }
        }
        best.map(|(angle, _)| angle).unwrap_or(0)
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn correct(&self, image: &RgbImage) -> RgbImage {
        let angle = self.estimate(image);
        log::debug!("Correcting skew by {angle} degrees");
        rotate_replicate(image, angle as f64)
    }
}

pub(crate) fn binarize_inverted(image: &RgbImage) -> GrayImage {
    let gray = grayscale(image);
    let level = otsu_level(&gray);
    threshold(&gray, level, ThresholdType::BinaryInverted)
}

/// Sum of squared differences between adjacent row sums.
pub fn projection_score(image: &GrayImage) -> f64 {
    if image.height() < 2 {
        return 0.0;
    }
    let histogram = to_array(image).sum_axis(Axis(1));
    let diff = &histogram.slice(s![1..]) - &histogram.slice(s![..-1]);
    diff.mapv(|it| it * it).sum()
}
