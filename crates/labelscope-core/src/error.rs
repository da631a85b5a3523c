use thiserror::Error;

/// All errors that can occur in labelscope-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Segment not found: {0}")]
    SegmentNotFound(u32),

    #[error("No active segment in session")]
    NoActiveSegment,

    #[error("No display set is active")]
    NoDisplaySet,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Host command failed: {0}")]
    HostCommand(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
