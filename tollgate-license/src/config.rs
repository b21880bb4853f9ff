//! Verifier configuration, loaded from TOML.
//!
//! ```toml
//! signature_algorithm = "rsa-sha1"   # or "rsa-sha256", "ed25519"
//! checksum_mode = "full"             # or "legacy"
//! artifact_path = "/opt/app/bin/app" # defaults to the running executable
//! policy_store_path = "/var/lib/app/policy.json"
//! ```

use crate::error::{LicenseError, LicenseResult};
use crate::integrity::{ArtifactHasher, ChecksumMode};
use crate::policy::JsonFilePolicyStore;
use crate::signature::{SignatureAlgorithm, SignatureAuthenticator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a [`crate::LicenseVerifier`]. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Scheme the licensing service signs replies with.
    pub signature_algorithm: SignatureAlgorithm,
    /// Checksum variant for the installed artifact.
    pub checksum_mode: ChecksumMode,
    /// Installed artifact to checksum. `None` means the running executable.
    pub artifact_path: Option<PathBuf>,
    /// Where a caching policy keeps its state. `None` means the platform
    /// data directory.
    pub policy_store_path: Option<PathBuf>,
}

impl VerifierConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] on malformed TOML or unknown values.
    pub fn from_toml_str(s: &str) -> LicenseResult<Self> {
        toml::from_str(s).map_err(|e| LicenseError::Config(e.to_string()))
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Io`] if the file cannot be read and
    /// [`LicenseError::Config`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds the artifact hasher these settings describe.
    #[must_use]
    pub fn hasher(&self) -> ArtifactHasher {
        match &self.artifact_path {
            Some(path) => ArtifactHasher::new(path, self.checksum_mode),
            None => ArtifactHasher::current_exe(self.checksum_mode),
        }
    }

    /// Builds the signature authenticator these settings describe.
    #[must_use]
    pub fn authenticator(&self) -> SignatureAuthenticator {
        SignatureAuthenticator::new(self.signature_algorithm)
    }

    /// Opens the JSON policy store these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Storage`] if no path is configured and the
    /// platform has no data directory.
    pub fn policy_store(&self) -> LicenseResult<JsonFilePolicyStore> {
        match &self.policy_store_path {
            Some(path) => Ok(JsonFilePolicyStore::new(path)),
            None => JsonFilePolicyStore::open_default(),
        }
    }
}
