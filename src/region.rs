use tracing::instrument;

use crate::{
    config::{LocatorOptions, PipelineConfig},
    fuzzy, BoundingBox, MatchCandidate, RegionCandidate, RegionKind, TextToken,
};

/// Finds where the diagnosis field sits on a page, either next to its label
/// or, on small pages, at a fixed position.
#[derive(Debug, Clone)]
pub struct DiagnosisRegionLocator {
    options: LocatorOptions,
    min_dimension: u32,
    size_gate_enabled: bool,
}

impl DiagnosisRegionLocator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            options: config.locator.clone(),
            min_dimension: config.min_dimension,
            size_gate_enabled: config.size_gate_enabled,
        }
    }

    fn is_small(&self, width: u32, height: u32) -> bool {
        self.size_gate_enabled && (width < self.min_dimension || height < self.min_dimension)
    }

    pub fn qualifies(&self, text: &str) -> bool {
        self.options
            .keywords
            .iter()
            .any(|keyword| fuzzy::ratio(text, keyword) >= self.options.similarity_threshold)
    }

    pub fn candidates(&self, tokens: &[TextToken]) -> Vec<MatchCandidate> {
        tokens
            .iter()
            .filter(|token| self.qualifies(&token.text))
            .map(|token| MatchCandidate {
                token: token.clone(),
                similarity: fuzzy::ratio(&token.text, &self.options.primary_keyword),
            })
            .collect()
    }

    /// The candidate most similar to the primary keyword. Earlier tokens win
    /// ties and a candidate scoring 0 never wins.
    pub fn best_match(&self, tokens: &[TextToken]) -> Option<MatchCandidate> {
        let mut best: Option<MatchCandidate> = None;
        let mut best_similarity = 0;
        for candidate in self.candidates(tokens) {
            if candidate.similarity > best_similarity {
                best_similarity = candidate.similarity;
                best = Some(candidate);
            }
        }
        best
    }

    /// Field rectangle to the right of a label box, padded vertically and
    /// running to the right edge of the page.
    pub fn label_region(&self, label: &BoundingBox, width: u32) -> BoundingBox {
        BoundingBox::from_corners(
            label.x + self.options.offset_x,
            label.y - self.options.pad_top,
            width.min(i32::MAX as u32) as i32,
            label.bottom() + self.options.pad_bottom,
        )
    }

    pub fn fallback_region(&self, width: u32, height: u32) -> BoundingBox {
        let fallback = self.options.fallback;
        let x = (fallback.x * width as f64) as i32;
        let y = (fallback.y * height as f64) as i32;
        let box_height = (fallback.height * height as f64) as i32;
        BoundingBox::new(x, y, width as i32 - x, box_height)
    }

    #[instrument(level = "debug", skip(self, tokens))]
    pub fn locate(&self, width: u32, height: u32, tokens: &[TextToken]) -> Vec<RegionCandidate> {
        if self.is_small(width, height) {
            log::debug!("Using fallback region for {width}x{height} page");
            return vec![RegionCandidate {
                kind: RegionKind::Fallback,
                rect: self.fallback_region(width, height),
            }];
        }

        match self.best_match(tokens) {
            Some(best) => {
                log::debug!(
                    "Best label match {:?} ({}) at {:?}",
                    best.token.text,
                    best.similarity,
                    best.token.bounds
                );
                vec![RegionCandidate {
                    kind: RegionKind::Label,
                    rect: self.label_region(&best.token.bounds, width),
                }]
            }
            None => {
                log::debug!("No token resembles {:?}", self.options.keywords);
                Vec::new()
            }
        }
    }
}
