/// Result alias that carries the custom [`LavaError`] type.
pub type Result<T> = std::result::Result<T, LavaError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum LavaError {
    /// Free-form failure raised by the studio plumbing (poisoned queues,
    /// invalid settings and the like).
    #[error("{0}")]
    Message(String),
    /// The host cannot capture the render surface into a media stream.
    #[error("capture is not supported: {0}")]
    UnsupportedCapture(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl LavaError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn unsupported<T: Into<String>>(reason: T) -> Self {
        Self::UnsupportedCapture(reason.into())
    }
}

impl From<&str> for LavaError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LavaError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
