//! Error types for the atlas

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

#[derive(Error, Debug)]
pub enum AtlasError {
    /// A map level asked for a scale the generator has no stage for
    #[error("unsupported map scale {scale} (expected one of 1, 4, 16, 64, 256)")]
    UnsupportedScale { scale: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("window error: {0}")]
    Window(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<minifb::Error> for AtlasError {
    fn from(error: minifb::Error) -> Self {
        AtlasError::Window(error.to_string())
    }
}
