//! Error types for the TOTP viewer

use thiserror::Error;

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a secret or computing codes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Nothing was entered
    #[error("Please enter a URL")]
    EmptyInput,

    /// Not an `otpauth://totp/...` URI
    #[error("Invalid URL format: {0}")]
    UriFormat(String),

    /// The `secret` query parameter is absent or empty
    #[error("No secret found")]
    MissingSecret,

    /// The secret is not valid base32
    #[error("Invalid base32 secret: {0}")]
    Base32Decode(#[from] Base32Error),

    /// The signing capability failed
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// Key-value store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a base32 secret is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Base32Error {
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    /// Decoded to zero bytes
    #[error("secret decodes to an empty key")]
    Empty,
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
