use image::RgbImage;
use tracing::instrument;

use crate::{
    preprocess::Preprocessor, util::resize_lanczos, RawWord, Result, ScaleContext, TextRecognizer,
    TextToken,
};

/// Runs OCR over the preprocessed page and reports tokens in the coordinate
/// space of the image it was given.
pub struct TextLocator<'a, R: ?Sized> {
    recognizer: &'a R,
    preprocessor: Preprocessor,
}

impl<'a, R: TextRecognizer + ?Sized> TextLocator<'a, R> {
    pub fn new(recognizer: &'a R, preprocessor: Preprocessor) -> Self {
        Self {
            recognizer,
            preprocessor,
        }
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn locate(&self, image: &RgbImage) -> Result<(RgbImage, Vec<TextToken>)> {
        let (binary, scale) = self.preprocessor.run(image);
        #[cfg(feature = "debug")]
        {
            if let Err(err) = std::fs::create_dir_all("debug")
                .map_err(image::ImageError::IoError)
                .and_then(|_| binary.save("debug/ocr_input.png"))
            {
                log::warn!("Failed to dump OCR input: {err}");
            }
        }

        let words = self.recognizer.recognize_words(&binary)?;
        let tokens = descale_tokens(words, &scale);
        log::debug!("Located {} tokens", tokens.len());

        let resized = resize_lanczos(image, scale.orig_width, scale.orig_height);
        Ok((resized, tokens))
    }
}

pub fn descale_tokens(words: Vec<RawWord>, scale: &ScaleContext) -> Vec<TextToken> {
    words
        .into_iter()
        .filter_map(|word| {
            let text = word.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TextToken {
                text: text.to_string(),
                bounds: word.bounds.descale(scale.scale_factor),
            })
        })
        .collect()
}
