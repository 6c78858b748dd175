use thiserror::Error;

/// Top-level error type for chatgraph.
///
/// The clustering engine itself never fails; these errors come from loading
/// configuration, talking to an embedding provider, or reading input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatGraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ChatGraphError {
    fn from(err: toml::de::Error) -> Self {
        ChatGraphError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ChatGraphError {
    fn from(err: toml::ser::Error) -> Self {
        ChatGraphError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ChatGraphError {
    fn from(err: serde_json::Error) -> Self {
        ChatGraphError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for chatgraph operations.
pub type Result<T> = std::result::Result<T, ChatGraphError>;
