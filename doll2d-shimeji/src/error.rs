use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DollError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid doll config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Runtime(#[from] doll2d::Error),

    #[error("failed to load atlas texture: {message}")]
    TextureLoad { message: String },
}
