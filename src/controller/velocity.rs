//! Per-account order rate tracking over a trailing window

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

/// Counts orders per account within a trailing window.
///
/// Timestamps older than the window are evicted on every touch; `sweep`
/// drops accounts whose window has emptied.
pub struct OrderVelocity {
    window: Duration,
    entries: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl OrderVelocity {
    /// Create a counter over `window`
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    /// Trailing window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an order at `now`; returns the count in the window, this order
    /// included
    pub fn record(&self, account_id: &str, now: DateTime<Utc>) -> usize {
        let mut entry = self.entries.entry(account_id.to_string()).or_default();
        let times = entry.value_mut();
        evict(times, now - self.window);
        times.push_back(now);
        times.len()
    }

    /// Count in the window without recording
    pub fn count(&self, account_id: &str, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        self.entries
            .get(account_id)
            .map(|times| times.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0)
    }

    /// Evict expired timestamps everywhere; returns accounts dropped
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let before = self.entries.len();
        self.entries.retain(|_, times| {
            evict(times, cutoff);
            !times.is_empty()
        });
        before - self.entries.len()
    }

    /// Number of tracked accounts
    pub fn tracked_accounts(&self) -> usize {
        self.entries.len()
    }
}

/// Drop timestamps at or before `cutoff` (oldest first)
fn evict(times: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while times.front().is_some_and(|t| *t <= cutoff) {
        times.pop_front();
    }
}
