//! Cooldown cache deciding whether a submission may proceed.
//!
//! The gate remembers when each email was last *admitted*. A second attempt
//! inside the window is rejected without touching that timestamp, so the
//! cooldown is anchored to the last admission and not to the last attempt.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use super::ports::Clock;

pub struct SubmissionGate {
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SubmissionGate {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject `email` at `now`, sweeping stale entries on the way.
    ///
    /// The check and the insert happen under one lock, so two concurrent
    /// requests for the same email can never both be admitted.
    pub fn admit(&self, email: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.lock();
        let swept = Self::sweep_locked(&mut entries, self.window, now);
        if swept > 0 {
            debug!(swept, "Cleared expired cooldown entries");
        }

        if let Some(last) = entries.get(email) {
            if age(now, *last) < self.window {
                return false;
            }
        }
        entries.insert(email.to_string(), now);
        true
    }

    /// `admit` using the gate's clock.
    pub fn admit_now(&self, email: &str) -> bool {
        self.admit(email, self.clock.now())
    }

    /// Remove every entry strictly older than the window. Returns how many went.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        Self::sweep_locked(&mut entries, self.window, now)
    }

    pub fn sweep_now(&self) -> usize {
        self.sweep(self.clock.now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn sweep_locked(
        entries: &mut HashMap<String, DateTime<Utc>>,
        window: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, last| age(now, *last) <= window);
        before - entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // The map holds plain timestamps; a panic elsewhere cannot leave it half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SubmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionGate")
            .field("window", &self.window)
            .field("entries", &self.len())
            .finish()
    }
}

/// Elapsed time since `last`. A timestamp in the future counts as zero.
fn age(now: DateTime<Utc>, last: DateTime<Utc>) -> Duration {
    (now - last).to_std().unwrap_or(Duration::ZERO)
}
