use thiserror::Error;

/// All errors produced by callsift-core.
#[derive(Debug, Error)]
pub enum CallsiftError {
    #[error("invalid value '{value}' for option '{key}': {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unrecognized option: {0}")]
    UnknownOption(String),

    #[error("audio file error: {0}")]
    AudioFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CallsiftError>;
