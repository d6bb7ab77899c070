use image::{imageops::FilterType, RgbImage};
use tracing::instrument;

use crate::{util::part_image, RegionCandidate, Roi};

#[derive(Debug, Clone, Copy)]
pub struct RoiNormalizer {
    min_size: u32,
}

impl RoiNormalizer {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn normalize(
        &self,
        image: &RgbImage,
        index: usize,
        region: &RegionCandidate,
    ) -> Option<Roi> {
        let (rect, crop) = part_image(image, &region.rect)?;
        Some(Roi {
            index,
            kind: region.kind,
            rect,
            pixels: self.ensure_min_size(crop),
        })
    }

    /// Raises each dimension below the floor to the floor independently.
    pub fn ensure_min_size(&self, crop: RgbImage) -> RgbImage {
        let (width, height) = crop.dimensions();
        if width >= self.min_size && height >= self.min_size {
            return crop;
        }
        let target = (width.max(self.min_size), height.max(self.min_size));
        log::debug!("Upsampling {width}x{height} crop to {}x{}", target.0, target.1);
        image::imageops::resize(&crop, target.0, target.1, FilterType::Lanczos3)
    }
}
