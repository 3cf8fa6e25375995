//! Error types for the real-time layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No channel (or an empty channel id) was given
    #[error("ER_NO_SESSION_ID")]
    MissingChannel,

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Not allowed to join {0}")]
    Forbidden(String),

    #[error(transparent)]
    Core(#[from] voto_core::Error),
}

impl Error {
    /// Message sent to the client in an `error` event
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingChannel => "ER_NO_SESSION_ID".to_string(),
            Self::InvalidChannel(_) | Self::UnknownConnection(_) => self.to_string(),
            Self::Forbidden(_) => "UN_AUTHORIZED".to_string(),
            Self::Core(e) => e.client_message().to_string(),
        }
    }
}

/// Result type for real-time operations
pub type Result<T> = std::result::Result<T, Error>;
