//! Error types for the verification pipeline.

use thiserror::Error;

/// Licensing-specific errors.
///
/// Most per-request failures never surface as a `LicenseError`: an invalid
/// response is routed through the policy and the callback instead. What is
/// left here is misconfiguration, storage trouble, and the one fatal case of
/// a failing crypto provider.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The public key is malformed or unusable with the configured algorithm.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature provider failed for a reason other than a bad signature.
    #[error("crypto provider failure: {0}")]
    Crypto(String),

    /// The signature algorithm named in configuration is not supported.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Policy state could not be loaded or saved.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
