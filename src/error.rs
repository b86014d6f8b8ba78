use thiserror::Error;

/// Errors returned by the remote recipe source
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The server answered with a non-success status
    #[error("API request failed: {0}")]
    Status(u16),

    /// The request never produced a response (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected JSON shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status(code) => Some(*code),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            GatewayError::Decode(_) => None,
        }
    }
}

/// Errors from the key-value persistence medium
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level errors surfaced while assembling a finder session
#[derive(Error, Debug)]
pub enum FinderError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Remote recipe source error
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Persistence error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
}
