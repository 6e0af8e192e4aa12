/// Convenience result type used by the library half of the crate.
pub type FxResult<T> = Result<T, FxError>;

/// Error taxonomy for the harness. The binary wraps these in `anyhow`.
#[derive(thiserror::Error, Debug)]
pub enum FxError {
    /// Malformed caller input: image geometry, batch template, options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Every registered loader failed for this asset.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Bytes were found but could not be decoded (PNG, WAV).
    #[error("decode error: {0}")]
    Decode(String),

    /// Audio device or stream failure.
    #[error("audio error: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }
}
