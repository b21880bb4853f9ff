//! Notification channel from the verifier to the embedding application.

use std::fmt;
use tollgate_types::Outcome;

/// Misconfiguration of the installation or the request itself.
///
/// These bypass the access policy entirely; retrying will not help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationError {
    /// The store does not know the package name.
    InvalidPackageName,
    /// The requesting uid does not own the package.
    NonMatchingUid,
    /// The application is not managed by the store.
    NotMarketManaged,
    /// The public key is malformed or does not fit the signature algorithm.
    InvalidPublicKey,
}

impl ApplicationError {
    /// Numeric code reported to embedders that work with integers.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidPackageName => 1,
            Self::NonMatchingUid => 2,
            Self::NotMarketManaged => 3,
            Self::InvalidPublicKey => 5,
        }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidPackageName => "invalid package name",
            Self::NonMatchingUid => "non-matching uid",
            Self::NotMarketManaged => "not market managed",
            Self::InvalidPublicKey => "invalid public key",
        };
        f.write_str(s)
    }
}

/// Receives the result of a verification. Exactly one method fires per call.
pub trait LicenseCallback: Send + Sync {
    /// The policy allows access.
    fn allow(&self, outcome: Outcome);

    /// The policy denies access, or the response was invalid.
    fn dont_allow(&self, outcome: Outcome);

    /// The installation or request is misconfigured.
    fn application_error(&self, error: ApplicationError);
}
