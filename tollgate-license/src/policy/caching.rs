//! Server-managed caching policy.
//!
//! The server tells the client how long a positive answer stays valid and
//! how long, or how many times, the client may keep running while the
//! server is unreachable. Those hints arrive in the reply extras:
//!
//! | Key  | Meaning                                              |
//! |------|------------------------------------------------------|
//! | `VT` | validity timestamp (ms) of an `Entitled` answer      |
//! | `GT` | grace: keep allowing `Retry` until this time (ms)    |
//! | `GR` | grace: number of consecutive `Retry` answers allowed |
//! | `LU` | licensing URL, on `NotEntitled`                      |
//!
//! State is persisted through a [`PolicyStore`] after every update.

use super::{decode_reply_extras, AccessPolicy, PolicyStore, EXTRA_LICENSING_URL};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tollgate_types::{Extras, Outcome, SignedReply};
use tracing::{debug, warn};

/// One minute in milliseconds.
pub const MILLIS_PER_MINUTE: i64 = 60 * 1000;

const EXTRA_VALIDITY_TIMESTAMP: &str = "VT";
const EXTRA_RETRY_UNTIL: &str = "GT";
const EXTRA_MAX_RETRIES: &str = "GR";

/// Persisted state of a [`CachingPolicy`]. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySnapshot {
    /// Outcome of the last server exchange.
    pub last_outcome: Outcome,
    /// When the last server exchange was recorded.
    pub last_response_time: i64,
    /// An `Entitled` outcome is trusted until this time.
    pub validity_timestamp: i64,
    /// `Retry` outcomes are tolerated until this time.
    pub retry_until: i64,
    /// Number of consecutive `Retry` outcomes tolerated.
    pub max_retries: i64,
    /// Consecutive `Retry` outcomes seen so far.
    pub retry_count: i64,
    /// Licensing URL from the last `NotEntitled` reply.
    pub licensing_url: Option<String>,
}

/// Policy that caches positive answers and tolerates short outages.
pub struct CachingPolicy {
    store: Arc<dyn PolicyStore>,
    state: Mutex<PolicySnapshot>,
}

impl CachingPolicy {
    /// Creates a policy, restoring state from `store`.
    ///
    /// A store that cannot be read leaves the policy in its initial state.
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => PolicySnapshot::default(),
            Err(e) => {
                warn!("could not restore policy state, starting fresh: {e}");
                PolicySnapshot::default()
            }
        };
        Self {
            store,
            state: Mutex::new(snapshot),
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PolicySnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccessPolicy for CachingPolicy {
    fn process_server_response(&self, outcome: Outcome, reply: Option<&SignedReply>) {
        let now = now_millis();
        let mut state = self.lock();

        if outcome == Outcome::Retry {
            state.retry_count = state.retry_count.saturating_add(1);
        } else {
            state.retry_count = 0;
        }

        let mut extras = decode_reply_extras(reply);
        match outcome {
            Outcome::Entitled => {
                // No usable validity hint: trust the answer for one minute.
                state.validity_timestamp = parse_extra(&extras, EXTRA_VALIDITY_TIMESTAMP)
                    .unwrap_or(now + MILLIS_PER_MINUTE);
                state.retry_until = parse_extra(&extras, EXTRA_RETRY_UNTIL).unwrap_or(0);
                state.max_retries = parse_extra(&extras, EXTRA_MAX_RETRIES).unwrap_or(0);
            }
            Outcome::NotEntitled => {
                state.validity_timestamp = 0;
                state.retry_until = 0;
                state.max_retries = 0;
                state.licensing_url = extras.remove(EXTRA_LICENSING_URL);
            }
            Outcome::Retry => {}
        }

        state.last_outcome = outcome;
        state.last_response_time = now;
        debug!(%outcome, retry_count = state.retry_count, "policy state updated");

        if let Err(e) = self.store.save(&state) {
            warn!("could not persist policy state: {e}");
        }
    }

    fn allow_access(&self) -> bool {
        let now = now_millis();
        let state = self.lock();
        match state.last_outcome {
            Outcome::Entitled => now <= state.validity_timestamp,
            Outcome::Retry if now < state.last_response_time.saturating_add(MILLIS_PER_MINUTE) => {
                now <= state.retry_until || state.retry_count <= state.max_retries
            }
            _ => false,
        }
    }

    fn licensing_url(&self) -> Option<String> {
        self.lock().licensing_url.clone()
    }
}

fn parse_extra(extras: &Extras, key: &str) -> Option<i64> {
    extras.get(key).and_then(|v| v.parse().ok())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
