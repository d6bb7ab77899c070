use image::{imageops::FilterType, GrayImage, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;
use tracing::instrument;

use crate::{config::PipelineConfig, ScaleContext};

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    min_dimension: u32,
    upscale_factor: u32,
    block_size: u32,
    offset: i32,
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_dimension: config.min_dimension,
            upscale_factor: if config.upscale_enabled {
                config.upscale_factor.max(1)
            } else {
                1
            },
            block_size: config.adaptive_block_size,
            offset: config.adaptive_offset,
        }
    }

    pub fn scale_for(&self, width: u32, height: u32) -> u32 {
        if width < self.min_dimension || height < self.min_dimension {
            self.upscale_factor
        } else {
            1
        }
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn run(&self, image: &RgbImage) -> (GrayImage, ScaleContext) {
        let (orig_width, orig_height) = image.dimensions();
        let mut gray = image::imageops::grayscale(image);

        let scale_factor = self.scale_for(orig_width, orig_height);
        if scale_factor != 1 {
            log::debug!("Upscaling {orig_width}x{orig_height} image by {scale_factor} for OCR");
            gray = image::imageops::resize(
                &gray,
                orig_width * scale_factor,
                orig_height * scale_factor,
                FilterType::Lanczos3,
            );
        }

        let binary = adaptive_threshold_gaussian(&gray, self.block_size, self.offset);
        (
            binary,
            ScaleContext {
                scale_factor,
                orig_width,
                orig_height,
            },
        )
    }
}

/// Normalized Gaussian kernel of `size` taps. The sigma is derived from the
/// size the same way common vision libraries do when none is given.
pub(crate) fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) as usize;
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size as f64 - 1.0) / 2.0;
    let weights = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect::<Vec<_>>();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// A pixel becomes white when it is brighter than its Gaussian-weighted
/// neighbourhood mean minus `offset`, black otherwise.
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let kernel = gaussian_kernel(block_size);
    let mean: GrayImage = separable_filter_equal(image, &kernel);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y)[0] as i32;
        let local = mean.get_pixel(x, y)[0] as i32;
        if value - local > -offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
