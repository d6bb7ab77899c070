use std::collections::HashMap;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use rusty_tesseract::{image_to_data, image_to_string, Args, Image};
use tempfile::NamedTempFile;
use tracing::instrument;

use crate::{config::TesseractOptions, BoundingBox, Error, RawWord, Result};

/// Page segmentation mode that only runs orientation and script detection.
const PSM_OSD_ONLY: i32 = 0;

pub trait TextRecognizer {
    /// Word-level text and geometry for a prepared (binarized) image, in that
    /// image's coordinates.
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<RawWord>>;

    /// Runs orientation detection and returns the engine's textual report,
    /// which carries a `Rotate: <degrees>` line.
    fn detect_orientation(&self, image: &RgbImage) -> Result<String>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<RawWord>> {
        (**self).recognize_words(image)
    }

    fn detect_orientation(&self, image: &RgbImage) -> Result<String> {
        (**self).detect_orientation(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<RawWord>> {
        (**self).recognize_words(image)
    }

    fn detect_orientation(&self, image: &RgbImage) -> Result<String> {
        (**self).detect_orientation(image)
    }
}

/// Tesseract driven through its command line. The executable is resolved from
/// `PATH`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    options: TesseractOptions,
}

impl TesseractEngine {
    pub fn new(options: TesseractOptions) -> Self {
        Self { options }
    }

    pub fn version() -> Result<String> {
        rusty_tesseract::get_tesseract_version().map_err(|err| Error::Ocr(err.to_string()))
    }

    fn args(&self, psm: i32) -> Args {
        Args {
            lang: self.options.lang.clone(),
            config_variables: HashMap::new(),
            dpi: self.options.dpi,
            psm: Some(psm),
            oem: Some(self.options.oem),
        }
    }
}

/// Tesseract reads images from disk, so buffers are staged as PNG files that
/// live as long as the returned handle.
fn stage(image: DynamicImage) -> Result<(NamedTempFile, Image)> {
    let file = tempfile::Builder::new()
        .prefix("diagnosis-roi-")
        .suffix(".png")
        .tempfile()?;
    image.save_with_format(file.path(), ImageFormat::Png)?;
    let staged = Image::from_path(file.path()).map_err(|err| Error::Ocr(err.to_string()))?;
    Ok((file, staged))
}

impl TextRecognizer for TesseractEngine {
    #[instrument(level = "debug", skip(self, image))]
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<RawWord>> {
        let (_file, staged) = stage(DynamicImage::ImageLuma8(image.clone()))?;
        let output = image_to_data(&staged, &self.args(self.options.psm))
            .map_err(|err| Error::Ocr(err.to_string()))?;
        log::debug!("Tesseract returned {} rows", output.data.len());
        Ok(output
            .data
            .into_iter()
            .map(|row| RawWord {
                text: row.text,
                bounds: BoundingBox::new(row.left, row.top, row.width, row.height),
            })
            .collect())
    }

    #[instrument(level = "debug", skip(self, image))]
    fn detect_orientation(&self, image: &RgbImage) -> Result<String> {
        let (_file, staged) = stage(DynamicImage::ImageRgb8(image.clone()))?;
        image_to_string(&staged, &self.args(PSM_OSD_ONLY))
            .map_err(|err| Error::Ocr(err.to_string()))
    }
}
