use thiserror::Error;

use crate::holded::HoldedError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Order API error: {0}")]
    Holded(#[from] HoldedError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures while delivering a notification. None of them are retried.
#[derive(Debug, Error)]
pub enum MailError {
    /// The SMTP server rejected the credentials (535).
    #[error("SMTP authentication failed: {0}")]
    Unauthorized(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    /// The message could not be built (bad address, empty recipient list).
    #[error("invalid message: {0}")]
    Message(String),

    #[error("missing mail setting: {0}")]
    MissingSetting(&'static str),
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let is_auth = err
            .status()
            .is_some_and(|code| code.to_string() == "535");
        if is_auth {
            MailError::Unauthorized(err.to_string())
        } else {
            MailError::Transport(err.to_string())
        }
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        MailError::Message(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::Message(err.to_string())
    }
}
