//! Caller-supplied expectations for a single verification.

use serde::{Deserialize, Serialize};

/// What the originating request asked for.
///
/// A decoded reply is only trusted if its nonce, package name and version
/// code all match the context it is verified against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationContext {
    /// Nonce chosen for the originating request.
    pub nonce: i32,
    /// Package identifier of the installation being checked.
    pub package_name: String,
    /// Version identifier of the installation being checked.
    pub version_code: String,
}

impl VerificationContext {
    /// Creates a context for a request that used the given nonce.
    pub fn new(nonce: i32, package_name: impl Into<String>, version_code: impl Into<String>) -> Self {
        Self {
            nonce,
            package_name: package_name.into(),
            version_code: version_code.into(),
        }
    }

    /// Creates a context with a freshly drawn random nonce.
    ///
    /// The nonce must be sent with the request and is echoed back inside the
    /// signed reply.
    pub fn with_random_nonce(package_name: impl Into<String>, version_code: impl Into<String>) -> Self {
        Self::new(rand::random::<i32>(), package_name, version_code)
    }
}
