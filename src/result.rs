use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates. Signed so that rectangles
/// derived from label geometry may start above or left of the image before
/// they are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from its corners; a corner pair in the wrong order yields
    /// an empty box rather than a negative size.
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: (right - left).max(0),
            height: (bottom - top).max(0),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersects the box with `[0, width] x [0, height]`.
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let max_x = width.min(i32::MAX as u32) as i32;
        let max_y = height.min(i32::MAX as u32) as i32;
        let left = self.x.clamp(0, max_x);
        let top = self.y.clamp(0, max_y);
        let right = self.right().clamp(0, max_x);
        let bottom = self.bottom().clamp(0, max_y);
        Self::from_corners(left, top, right, bottom)
    }

    /// Divides every component by the scale factor, truncating toward zero.
    pub fn descale(&self, factor: u32) -> Self {
        let factor = factor.max(1) as i32;
        Self {
            x: self.x / factor,
            y: self.y / factor,
            width: self.width / factor,
            height: self.height / factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleContext {
    pub scale_factor: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWord {
    pub text: String,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextToken {
    pub text: String,
    #[serde(rename = "box")]
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub token: TextToken,
    pub similarity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Fallback,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionCandidate {
    pub kind: RegionKind,
    pub rect: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct Roi {
    /// Position in the order regions were produced for the image, counting
    /// regions that were later dropped.
    pub index: usize,
    pub kind: RegionKind,
    pub rect: BoundingBox,
    pub pixels: RgbImage,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub tokens: Vec<TextToken>,
    pub regions: Vec<RegionCandidate>,
    pub rois: Vec<Roi>,
    pub annotated: Option<RgbImage>,
}

impl Extraction {
    pub fn dropped(&self) -> usize {
        self.regions.len().saturating_sub(self.rois.len())
    }
}
