//! Access policies: turn a validated outcome into an allow/deny decision.
//!
//! The verifier owns an `Arc<dyn AccessPolicy>` handed to it at
//! construction. Implementations guard their state with a mutex so a single
//! policy can be shared by concurrent verifications.

mod caching;
mod store;
mod strict;

pub use caching::{CachingPolicy, PolicySnapshot, MILLIS_PER_MINUTE};
pub use store::{JsonFilePolicyStore, MemoryPolicyStore, PolicyStore};
pub use strict::StrictPolicy;

use tollgate_types::{Extras, Outcome, SignedReply};
use tracing::warn;

/// Extras key carrying the licensing (acquisition) URL.
pub const EXTRA_LICENSING_URL: &str = "LU";

/// Decides whether the application may run.
pub trait AccessPolicy: Send + Sync {
    /// Records the result of a server exchange.
    ///
    /// `reply` is present only when the response carried an authenticated
    /// payload; policies must cope with `None`.
    fn process_server_response(&self, outcome: Outcome, reply: Option<&SignedReply>);

    /// Returns true if the application may run right now.
    fn allow_access(&self) -> bool;

    /// URL where an unlicensed user can acquire the application, if the
    /// server supplied one.
    fn licensing_url(&self) -> Option<String>;
}

/// Decodes a reply's extras, logging and discarding malformed data.
fn decode_reply_extras(reply: Option<&SignedReply>) -> Extras {
    let Some(reply) = reply else {
        return Extras::new();
    };
    reply.extras().unwrap_or_else(|e| {
        warn!("invalid extras data from server: {e}");
        Extras::new()
    })
}
