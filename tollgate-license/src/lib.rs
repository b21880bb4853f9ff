//! Signed license response verification for Tollgate.
//!
//! This crate handles:
//! - Signature authentication of server replies (RSA/SHA-1 by default)
//! - Cross-checking the decoded reply against the originating request
//! - An anti-tamper dispatch keyed by a checksum of the installed artifact
//! - Access policies that turn a validated outcome into allow/deny
//! - Optional per-user device limits
//!
//! # Flow
//!
//! The embedding application fetches `(response_code, signed_data,
//! signature)` from the licensing service and hands it to
//! [`LicenseVerifier::verify`] together with the [`VerificationContext`] it
//! used for the request. The result arrives on a [`LicenseCallback`].
//!
//! `verify` blocks on file I/O and public-key crypto. Run it off the UI
//! thread, e.g. with `verify_in_background` (feature `runtime`).

mod callback;
mod config;
mod error;
mod integrity;
mod limiter;
pub mod policy;
mod signature;
mod transform;
mod verifier;

pub use callback::{ApplicationError, LicenseCallback};
pub use config::VerifierConfig;
pub use error::{LicenseError, LicenseResult};
pub use integrity::{checksum_reader, ArtifactHasher, ChecksumMode, IntegrityHash, BLOCK_SIZE};
pub use limiter::{BoundDeviceLimiter, DeviceFingerprint, DeviceLimiter, NullDeviceLimiter};
pub use policy::{AccessPolicy, CachingPolicy, JsonFilePolicyStore, MemoryPolicyStore, PolicySnapshot, PolicyStore, StrictPolicy};
pub use signature::{PublicKey, SignatureAlgorithm, SignatureAuthenticator};
pub use transform::{ResponseCode, ResponseTransform};
pub use verifier::LicenseVerifier;

pub use tollgate_types::{Outcome, SignedReply, VerificationContext};
