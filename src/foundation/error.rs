/// Convenience result type used across adreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid caller-provided data (empty scene lists, zero fps, bad canvas sizes).
    #[error("validation error: {0}")]
    Validation(String),

    /// A single visual or audio asset could not be decoded.
    ///
    /// The asset resolver absorbs these and degrades to a placeholder or to no narration.
    #[error("asset decode error: {0}")]
    AssetDecode(String),

    /// None of the requested (container, codec) combinations is available.
    #[error("unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    /// The recording pipeline failed after capture started.
    #[error("capture failure: {0}")]
    Capture(String),

    /// The render was cancelled by the caller.
    #[error("render cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::AssetDecode`] value.
    pub fn asset_decode(msg: impl Into<String>) -> Self {
        Self::AssetDecode(msg.into())
    }

    /// Build a [`ReelError::UnsupportedOutputFormat`] value.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedOutputFormat(msg.into())
    }

    /// Build a [`ReelError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Return `true` for the caller-initiated cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
