use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("invalid track index: {index}")]
    InvalidTrackIndex { index: usize },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("malformed skeleton binary at offset {offset}: {message}")]
    MalformedAsset { offset: usize, message: String },

    #[error("attachment '{attachment}' references atlas region '{path}' which does not exist")]
    MissingAtlasRegion { attachment: String, path: String },

    #[error("failed to parse atlas: {message}")]
    AtlasParse { message: String },
}
