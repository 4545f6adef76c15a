// common/src/error.rs
use thiserror::Error;

/// Start-up faults. Any of these must stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("session signing secret is not configured (set APP__SESSION__SECRET or JWT_SECRET)")]
    MissingSecret,

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Infrastructure faults raised by the session core.
///
/// An absent, expired or tampered token is not an error; those surface as `None`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("failed to write session cookie: {0}")]
    Store(String),
}

/// Reasons a login assertion is turned away.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("wallet address is not a valid chain address")]
    InvalidWalletAddress,

    #[error("login challenge is invalid, expired or already used")]
    InvalidChallenge,

    #[error("wallet signature does not match the challenge")]
    InvalidSignature,

    #[error(transparent)]
    Session(#[from] SessionError),
}
