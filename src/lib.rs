use std::path::Path;

use image::RgbImage;
use tracing::instrument;

mod batch;
pub mod config;
mod error;
pub mod fuzzy;
mod ocr;
mod orientation;
mod preprocess;
mod region;
mod result;
mod roi;
mod skew;
mod text_locator;
pub mod util;

pub use batch::{input_images, process, BatchDriver, BatchReport, SkippedImage};
pub use config::{PipelineConfig, Preset};
pub use error::{Error, Result};
pub use ocr::{TesseractEngine, TextRecognizer};
pub use orientation::{parse_rotate, OrientationCorrector};
pub use preprocess::{adaptive_threshold_gaussian, Preprocessor};
pub use region::DiagnosisRegionLocator;
pub use result::*;
pub use roi::RoiNormalizer;
pub use skew::{projection_score, SkewCorrector};
pub use text_locator::{descale_tokens, TextLocator};

use util::{draw_marker, load_rgb};

pub struct DiagnosisExtractorBuilder {
    config: PipelineConfig,
    recognizer: Option<Box<dyn TextRecognizer>>,
}

impl DiagnosisExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.config = PipelineConfig::preset(preset);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `recognizer` instead of a Tesseract engine built from the config.
    pub fn recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn draw_markers(mut self, draw_markers: bool) -> Self {
        self.config.output.draw_markers = draw_markers;
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<DiagnosisExtractor> {
        self.config.validate()?;
        let config = self.config;
        let recognizer = self
            .recognizer
            .unwrap_or_else(|| Box::new(TesseractEngine::new(config.tesseract.clone())));
        Ok(DiagnosisExtractor {
            skew: SkewCorrector::new(&config.skew),
            preprocessor: Preprocessor::new(&config),
            locator: DiagnosisRegionLocator::new(&config),
            normalizer: RoiNormalizer::new(config.roi_min_size),
            recognizer,
            config,
        })
    }
}

impl Default for DiagnosisExtractorBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            recognizer: None,
        }
    }
}

pub struct DiagnosisExtractor {
    config: PipelineConfig,
    recognizer: Box<dyn TextRecognizer>,
    skew: SkewCorrector,
    preprocessor: Preprocessor,
    locator: DiagnosisRegionLocator,
    normalizer: RoiNormalizer,
}

impl DiagnosisExtractor {
    pub fn builder() -> DiagnosisExtractorBuilder {
        DiagnosisExtractorBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<Extraction> {
        self.extract(load_rgb(path)?)
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn extract(&self, image: RgbImage) -> Result<Extraction> {
        let image = if self.config.skew.enabled {
            self.skew.correct(&image)
        } else {
            image
        };
        let image = if self.config.orientation_enabled {
            OrientationCorrector::new(&*self.recognizer, self.config.min_dimension)
                .correct(image)?
        } else {
            image
        };

        let (page, tokens) =
            TextLocator::new(&*self.recognizer, self.preprocessor).locate(&image)?;
        let regions = self.locator.locate(page.width(), page.height(), &tokens);

        let annotated = self.config.output.draw_markers.then(|| {
            let mut annotated = page.clone();
            for region in &regions {
                draw_marker(&mut annotated, &region.rect);
            }
            annotated
        });

        let rois = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let roi = self.normalizer.normalize(&page, index, region);
                if roi.is_none() {
                    log::warn!("Skipping empty region {index} at {:?}", region.rect);
                }
                roi
            })
            .collect();

        Ok(Extraction {
            tokens,
            regions,
            rois,
            annotated,
        })
    }
}
