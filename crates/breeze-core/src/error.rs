//! Error types for Breeze

/// Result type alias using Breeze's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Breeze operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Detection layer errors
    #[error("layer error: {0}")]
    Layer(String),

    /// Handler resolution or invocation errors
    #[error("handler error: {0}")]
    Handler(String),

    /// Extension discovery or loading errors
    #[error("extension error: {0}")]
    Extension(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new layer error
    pub fn layer(msg: impl Into<String>) -> Self {
        Self::Layer(msg.into())
    }

    /// Create a new handler error
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    /// Create a new extension error
    pub fn extension(msg: impl Into<String>) -> Self {
        Self::Extension(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
