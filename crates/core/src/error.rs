/// Result alias that carries the custom [`EffectSyncError`] type.
pub type Result<T> = std::result::Result<T, EffectSyncError>;

/// Common error type for the core crate.
///
/// Every variant is recoverable at the point it is raised: a bad binding or
/// an unreadable style source costs one effect, never the whole schedule.
#[derive(Debug, thiserror::Error)]
pub enum EffectSyncError {
    /// An instance could not be constructed because part of its binding was
    /// missing or out of range.
    #[error("invalid binding for effect `{effect}`: {reason}")]
    InvalidBinding { effect: String, reason: String },
    /// The schedule names an effect that no style source defines.
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),
    /// A style source refused to hand over its rules.
    #[error("style source `{source_name}` is unavailable: {reason}")]
    StyleSourceUnavailable { source_name: String, reason: String },
    /// A duration literal such as `1.5s` could not be parsed.
    #[error("invalid duration literal `{0}`")]
    InvalidDuration(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around scene file decoding errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl EffectSyncError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid_binding(effect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            effect: effect.into(),
            reason: reason.into(),
        }
    }

    pub fn source_unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StyleSourceUnavailable {
            source_name: source.into(),
            reason: reason.into(),
        }
    }
}

impl From<&str> for EffectSyncError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for EffectSyncError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
