use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR engine failed: {0}")]
    Ocr(String),
    #[error("malformed orientation report: {0:?}")]
    OrientationReport(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to serialize tokens: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
