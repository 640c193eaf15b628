//! Throttle gate
//!
//! Session-initiation rate limit persisted across page loads. A session may
//! start only if at least `window` has passed since the last send attempt.
//! Once a session passes the gate it may later exit through any path; the gate
//! is never consulted again for that session.

use std::sync::Arc;

use chrono::Duration;

use super::store::{LocalStore, LAST_SENT_KEY};
use crate::clock::Clock;
use crate::error::Result;

/// Default cooldown between sessions that may send.
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

pub struct ThrottleGate {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl ThrottleGate {
    pub fn new(store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    /// Epoch milliseconds of the last send attempt; missing, unparseable or
    /// negative values read as 0.
    pub fn last_sent_ms(&self) -> i64 {
        self.store
            .get(LAST_SENT_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|ms| *ms >= 0)
            .unwrap_or(0)
    }

    /// Whether a new session may start now.
    ///
    /// A stored attempt later than the current time also reads as 0, so a
    /// clock set backwards cannot lock the page out.
    pub fn should_emit(&self) -> bool {
        let now = self.clock.now().timestamp_millis();
        let last = match self.last_sent_ms() {
            ms if ms > now => 0,
            ms => ms,
        };
        now.saturating_sub(last) >= self.window.num_milliseconds()
    }

    /// Record a send attempt at the current time.
    pub fn record_attempt(&self) -> Result<()> {
        let now = self.clock.now().timestamp_millis();
        self.store.set(LAST_SENT_KEY, &now.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::MemoryStore;
    use crate::clock::ManualClock;
    use chrono::Utc;

    fn gate() -> (ThrottleGate, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = ThrottleGate::new(
            store.clone(),
            clock.clone(),
            Duration::milliseconds(DEFAULT_WINDOW_MS),
        );
        (gate, store, clock)
    }

    #[test]
    fn test_first_visit_passes() {
        let (gate, _, _) = gate();
        assert!(gate.should_emit());
    }

    #[test]
    fn test_within_window_is_blocked() {
        let (gate, _, clock) = gate();
        gate.record_attempt().unwrap();

        clock.advance(Duration::milliseconds(59_999));
        assert!(!gate.should_emit());

        clock.advance(Duration::milliseconds(1));
        assert!(gate.should_emit());
    }

    #[test]
    fn test_garbage_timestamp_reads_as_zero() {
        let (gate, store, _) = gate();
        store.set(LAST_SENT_KEY, "yesterday").unwrap();
        assert_eq!(gate.last_sent_ms(), 0);
        assert!(gate.should_emit());
    }

    #[test]
    fn test_extreme_timestamps_do_not_block() {
        let (gate, store, _) = gate();

        store.set(LAST_SENT_KEY, &i64::MIN.to_string()).unwrap();
        assert_eq!(gate.last_sent_ms(), 0);
        assert!(gate.should_emit());

        store.set(LAST_SENT_KEY, &i64::MAX.to_string()).unwrap();
        assert!(gate.should_emit());
    }

    #[test]
    fn test_future_timestamp_is_ignored() {
        let (gate, store, clock) = gate();
        let ahead = clock.now() + Duration::hours(1);
        store
            .set(LAST_SENT_KEY, &ahead.timestamp_millis().to_string())
            .unwrap();
        assert!(gate.should_emit());
    }
}
