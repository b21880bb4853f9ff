//! Resolved policy outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The result of validating a server response, as fed to an access policy.
///
/// Device limiters answer with the same type, so a limiter can narrow an
/// entitlement the server granted down to a denial.
///
/// A fresh policy starts in `Retry`, so the embedding application always
/// validates at least once before trusting a cached decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The user is entitled to run the application.
    Entitled,
    /// The server (or a limiter) denied entitlement.
    NotEntitled,
    /// A transient failure; no decision could be reached.
    #[default]
    Retry,
}

impl Outcome {
    /// Returns true for outcomes that grant access on their own.
    #[must_use]
    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Entitled)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Entitled => "entitled",
            Self::NotEntitled => "not_entitled",
            Self::Retry => "retry",
        };
        f.write_str(s)
    }
}
