//! Public keys and signature authentication of server replies.
//!
//! The signature covers the raw bytes of the signed-data string exactly as
//! received, and arrives as standard base64. The deployed licensing service
//! signs with RSA PKCS#1 v1.5 over SHA-1; the algorithm is configurable so
//! that newer deployments can move off SHA-1.
//!
//! Failure modes are split three ways:
//! - a bad or undecodable signature is `Ok(false)` (invalid response)
//! - a key that cannot be used is [`LicenseError::InvalidPublicKey`]
//! - anything else from the provider is [`LicenseError::Crypto`], fatal

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::pkcs8::DecodePublicKey as _;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::error;

/// Signature scheme used to authenticate server replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1. Wire-compatible with deployed servers.
    #[default]
    #[serde(rename = "rsa-sha1")]
    RsaSha1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "rsa-sha256")]
    RsaSha256,
    /// Ed25519.
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RsaSha1 => "rsa-sha1",
            Self::RsaSha256 => "rsa-sha256",
            Self::Ed25519 => "ed25519",
        };
        f.write_str(s)
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsa-sha1" | "sha1withrsa" => Ok(Self::RsaSha1),
            "rsa-sha256" | "sha256withrsa" => Ok(Self::RsaSha256),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(LicenseError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// A public key able to verify server replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA key, used with the `rsa-*` algorithms.
    Rsa(RsaPublicKey),
    /// Ed25519 key.
    Ed25519(VerifyingKey),
}

impl PublicKey {
    /// Decodes a base64-encoded key, as usually embedded in an application.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidPublicKey`] if the text is not base64
    /// or the decoded bytes are not a supported key.
    pub fn from_base64(encoded: &str) -> LicenseResult<Self> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|e| LicenseError::InvalidPublicKey(format!("invalid base64: {e}")))?;
        Self::from_der(&der)
    }

    /// Decodes an X.509 SubjectPublicKeyInfo (RSA or Ed25519), or a raw
    /// 32-byte Ed25519 key.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidPublicKey`] if no supported key format
    /// matches.
    pub fn from_der(der: &[u8]) -> LicenseResult<Self> {
        if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
            return Ok(Self::Rsa(key));
        }
        if let Ok(key) = VerifyingKey::from_public_key_der(der) {
            return Ok(Self::Ed25519(key));
        }
        let raw: [u8; 32] = der.try_into().map_err(|_| {
            LicenseError::InvalidPublicKey(format!("unrecognized key encoding ({} bytes)", der.len()))
        })?;
        VerifyingKey::from_bytes(&raw)
            .map(Self::Ed25519)
            .map_err(|_| LicenseError::InvalidPublicKey("invalid ed25519 point".to_string()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "rsa",
            Self::Ed25519(_) => "ed25519",
        }
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(key: RsaPublicKey) -> Self {
        Self::Rsa(key)
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        Self::Ed25519(key)
    }
}

/// Checks reply signatures with a fixed algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureAuthenticator {
    algorithm: SignatureAlgorithm,
}

impl SignatureAuthenticator {
    /// Creates an authenticator for the given algorithm.
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Returns the configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Authenticates `signed_data` against a base64 `signature`.
    ///
    /// Returns `Ok(false)` for empty signed data, undecodable base64 and
    /// signatures that do not verify.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidPublicKey`] if the key does not fit the
    /// algorithm, and [`LicenseError::Crypto`] for provider failures.
    pub fn authenticate(
        &self,
        public_key: &PublicKey,
        signed_data: &str,
        signature: &str,
    ) -> LicenseResult<bool> {
        if signed_data.is_empty() {
            error!("signature verification failed: signed data is empty (no signed-in account on device?)");
            return Ok(false);
        }

        let sig_bytes = match STANDARD.decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("could not base64-decode signature: {e}");
                return Ok(false);
            }
        };

        let valid = match (self.algorithm, public_key) {
            (SignatureAlgorithm::RsaSha1, PublicKey::Rsa(key)) => verify_rsa(
                key,
                Pkcs1v15Sign::new::<Sha1>(),
                &Sha1::digest(signed_data.as_bytes()),
                &sig_bytes,
            )?,
            (SignatureAlgorithm::RsaSha256, PublicKey::Rsa(key)) => verify_rsa(
                key,
                Pkcs1v15Sign::new::<Sha256>(),
                &Sha256::digest(signed_data.as_bytes()),
                &sig_bytes,
            )?,
            (SignatureAlgorithm::Ed25519, PublicKey::Ed25519(key)) => {
                match Ed25519Signature::from_slice(&sig_bytes) {
                    Ok(sig) => key.verify(signed_data.as_bytes(), &sig).is_ok(),
                    Err(_) => false,
                }
            }
            (algorithm, key) => {
                return Err(LicenseError::InvalidPublicKey(format!(
                    "{} key cannot verify {algorithm} signatures",
                    key.kind()
                )));
            }
        };

        if !valid {
            error!("signature verification failed");
        }
        Ok(valid)
    }
}

fn verify_rsa(
    key: &RsaPublicKey,
    scheme: Pkcs1v15Sign,
    hashed: &[u8],
    sig: &[u8],
) -> LicenseResult<bool> {
    match key.verify(scheme, hashed, sig) {
        Ok(()) => Ok(true),
        Err(rsa::Error::Verification) => Ok(false),
        Err(e) => Err(LicenseError::Crypto(e.to_string())),
    }
}
