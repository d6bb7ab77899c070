use image::RgbImage;
use tracing::instrument;

use crate::{util::rotate_replicate, Error, Result, TextRecognizer};

const ROTATE_FIELD: &str = "Rotate:";

pub struct OrientationCorrector<'a, R: ?Sized> {
    recognizer: &'a R,
    min_dimension: u32,
}

impl<'a, R: TextRecognizer + ?Sized> OrientationCorrector<'a, R> {
    pub fn new(recognizer: &'a R, min_dimension: u32) -> Self {
        Self {
            recognizer,
            min_dimension,
        }
    }

    /// Returns `None` when the image is below the size gate; detection is not
    /// attempted on low-resolution input.
    #[instrument(level = "debug", skip(self, image))]
    pub fn detect(&self, image: &RgbImage) -> Result<Option<i32>> {
        let (width, height) = image.dimensions();
        if width < self.min_dimension || height < self.min_dimension {
            log::debug!("Skipping orientation detection for {width}x{height} image");
            return Ok(None);
        }
        let report = self.recognizer.detect_orientation(image)?;
        parse_rotate(&report).map(Some)
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn correct(&self, image: RgbImage) -> Result<RgbImage> {
        match self.detect(&image)? {
            Some(angle) if angle != 0 => {
                log::debug!("Page reported rotated by {angle} degrees, rotating back");
                Ok(rotate_replicate(&image, -angle as f64))
            }
            _ => Ok(image),
        }
    }
}

/// Reads the integer following `Rotate:` in an orientation report.
pub fn parse_rotate(report: &str) -> Result<i32> {
    report
        .lines()
        .find_map(|line| line.trim().strip_prefix(ROTATE_FIELD))
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| Error::OrientationReport(report.to_string()))
}
