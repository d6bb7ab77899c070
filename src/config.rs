use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Images smaller than this on either axis are upscaled for OCR, skip
/// orientation detection and use the fallback rectangle.
pub const MIN_DIMENSION: u32 = 700;
/// Minimum width and height of a persisted crop.
pub const ROI_MIN_SIZE: u32 = 60;
pub const UPSCALE_FACTOR: u32 = 2;
pub const ADAPTIVE_BLOCK_SIZE: u32 = 65;
pub const ADAPTIVE_OFFSET: i32 = 13;
pub const SKEW_LIMIT: i32 = 5;
pub const SKEW_DELTA: i32 = 1;
pub const LABEL_OFFSET_X: i32 = 200;
pub const LABEL_PAD_TOP: i32 = 40;
pub const LABEL_PAD_BOTTOM: i32 = 30;
pub const PRIMARY_KEYWORD: &str = "diagnosis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Offline batch tuning: full skew/orientation correction, lenient
    /// matching on the single "diagnosis" keyword.
    #[default]
    Batch,
    /// Upload tuning: no geometric correction or upscaling, strict matching
    /// on both keywords, label geometry trusted at any size.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewOptions {
    pub enabled: bool,
    /// Largest angle tried in either direction, in degrees.
    pub limit: i32,
    /// Step between candidate angles, in degrees.
    pub delta: i32,
}

impl Default for SkewOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: SKEW_LIMIT,
            delta: SKEW_DELTA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRegion {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

impl Default for FallbackRegion {
    fn default() -> Self {
        Self {
            x: 0.35,
            y: 0.25,
            height: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorOptions {
    /// A token qualifies when it is similar enough to any of these.
    pub keywords: Vec<String>,
    /// Qualifying tokens are ranked by similarity to this keyword.
    pub primary_keyword: String,
    pub similarity_threshold: u8,
    pub offset_x: i32,
    pub pad_top: i32,
    pub pad_bottom: i32,
    pub fallback: FallbackRegion,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            keywords: vec![PRIMARY_KEYWORD.to_string()],
            primary_keyword: PRIMARY_KEYWORD.to_string(),
            similarity_threshold: 50,
            offset_x: LABEL_OFFSET_X,
            pad_top: LABEL_PAD_TOP,
            pad_bottom: LABEL_PAD_BOTTOM,
            fallback: FallbackRegion::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractOptions {
    pub lang: String,
    /// Page segmentation mode for word extraction. 6 treats the page as a
    /// single uniform block of text.
    pub psm: i32,
    pub oem: i32,
    pub dpi: Option<i32>,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            psm: 6,
            oem: 3,
            dpi: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub draw_markers: bool,
    pub write_annotated: bool,
    pub write_tokens: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_dimension: u32,
    pub roi_min_size: u32,
    pub upscale_factor: u32,
    pub adaptive_block_size: u32,
    pub adaptive_offset: i32,
    pub skew: SkewOptions,
    pub orientation_enabled: bool,
    pub upscale_enabled: bool,
    /// When false, label geometry is trusted regardless of image size and the
    /// fallback rectangle is never used.
    pub size_gate_enabled: bool,
    pub locator: LocatorOptions,
    pub tesseract: TesseractOptions,
    pub output: OutputOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_dimension: MIN_DIMENSION,
            roi_min_size: ROI_MIN_SIZE,
            upscale_factor: UPSCALE_FACTOR,
            adaptive_block_size: ADAPTIVE_BLOCK_SIZE,
            adaptive_offset: ADAPTIVE_OFFSET,
            skew: SkewOptions::default(),
            orientation_enabled: true,
            upscale_enabled: true,
            size_gate_enabled: true,
            locator: LocatorOptions::default(),
            tesseract: TesseractOptions::default(),
            output: OutputOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Batch => Self::default(),
            Preset::Upload => Self {
                skew: SkewOptions {
                    enabled: false,
                    ..SkewOptions::default()
                },
                orientation_enabled: false,
                upscale_enabled: false,
                size_gate_enabled: false,
                locator: LocatorOptions {
                    keywords: vec![
                        PRIMARY_KEYWORD.to_string(),
                        "provisional diagnosis".to_string(),
                    ],
                    similarity_threshold: 80,
                    ..LocatorOptions::default()
                },
                tesseract: TesseractOptions {
                    psm: 3,
                    ..TesseractOptions::default()
                },
                ..Self::default()
            },
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading pipeline config from {:?}", path.as_ref());
        Self::from_toml_str(&source)
    }

    pub fn is_small(&self, width: u32, height: u32) -> bool {
        width < self.min_dimension || height < self.min_dimension
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(Error::Config(message.to_string()));
        if self.min_dimension == 0 || self.roi_min_size == 0 {
            return fail("size gates must be positive");
        }
        if self.upscale_factor == 0 {
            return fail("upscale_factor must be positive");
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return fail("adaptive_block_size must be odd and at least 3");
        }
        if self.skew.delta <= 0 || self.skew.limit < 0 {
            return fail("skew delta must be positive and limit non-negative");
        }
        if self.locator.similarity_threshold > 100 {
            return fail("similarity_threshold must be within 0..=100");
        }
        if self.locator.keywords.is_empty() {
            return fail("at least one keyword is required");
        }
        let fallback = self.locator.fallback;
        if [fallback.x, fallback.y, fallback.height]
            .iter()
            .any(|it| !(0.0..=1.0).contains(it))
        {
            return fail("fallback proportions must be within 0..=1");
        }
        Ok(())
    }
}
