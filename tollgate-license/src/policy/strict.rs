//! Non-caching policy.
//!
//! Every decision comes from the most recent server exchange; nothing is
//! kept locally for a user to tamper with. The application cannot run
//! offline under this policy.

use super::{decode_reply_extras, AccessPolicy, EXTRA_LICENSING_URL};
use std::sync::{Mutex, PoisonError};
use tollgate_types::{Outcome, SignedReply};

#[derive(Debug, Default)]
struct StrictState {
    last_outcome: Outcome,
    licensing_url: Option<String>,
}

/// Allows access iff the last server exchange resolved to `Entitled`.
#[derive(Debug, Default)]
pub struct StrictPolicy {
    state: Mutex<StrictState>,
}

impl StrictPolicy {
    /// Creates a policy in the `Retry` state, which denies access until the
    /// first successful validation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outcome of the last server exchange.
    #[must_use]
    pub fn last_outcome(&self) -> Outcome {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).last_outcome
    }
}

impl AccessPolicy for StrictPolicy {
    fn process_server_response(&self, outcome: Outcome, reply: Option<&SignedReply>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_outcome = outcome;

        if outcome == Outcome::NotEntitled {
            state.licensing_url = decode_reply_extras(reply).remove(EXTRA_LICENSING_URL);
        }
    }

    fn allow_access(&self) -> bool {
        self.last_outcome() == Outcome::Entitled
    }

    fn licensing_url(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .licensing_url
            .clone()
    }
}
