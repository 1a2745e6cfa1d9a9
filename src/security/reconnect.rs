//! Reconnect throttling.
//!
//! The ledger remembers when each source IP last opened a session. A second
//! session inside the reconnect window is refused before any outbound
//! connection is made. Entries older than five windows are swept.

use std::net::IpAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Sweep horizon, in reconnect windows.
const HORIZON_WINDOWS: u32 = 5;

/// Longest pause between two sweeps, however large the window.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// A refused reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reconnect throttled for {retry_after:?}")]
pub struct Throttled {
    /// Time left until the window closes.
    pub retry_after: Duration,
}

/// Per-IP record of the last admitted session.
#[derive(Debug)]
pub struct ReconnectLedger {
    window: Duration,
    entries: DashMap<IpAddr, Instant>,
}

impl ReconnectLedger {
    /// Empty ledger refusing reconnects closer together than `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    /// The reconnect window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Age after which an entry is swept. Saturates at `Duration::MAX`.
    pub fn horizon(&self) -> Duration {
        self.window.saturating_mul(HORIZON_WINDOWS)
    }

    /// Interval of the background sweep: the horizon, capped at one day.
    pub fn sweep_period(&self) -> Duration {
        self.horizon().min(MAX_SWEEP_PERIOD)
    }

    /// Admit a session from `ip` now.
    pub fn admit(&self, ip: IpAddr) -> Result<(), Throttled> {
        self.admit_at(ip, Instant::now())
    }

    /// Admit a session from `ip` at `now`.
    ///
    /// An admitted session stamps the ledger. A refused one does not, so a
    /// client hammering the relay is let back in one window after its last
    /// successful session.
    pub fn admit_at(&self, ip: IpAddr, now: Instant) -> Result<(), Throttled> {
        match self.entries.entry(ip.to_canonical()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < self.window {
                    return Err(Throttled {
                        retry_after: self.window - elapsed,
                    });
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Ok(())
    }

    /// Drop entries older than the horizon. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// [`sweep`](Self::sweep) as of `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let horizon = self.horizon();
        let before = self.entries.len();
        self.entries
            .retain(|_, stamp| now.saturating_duration_since(*stamp) <= horizon);
        before.saturating_sub(self.entries.len())
    }

    /// Whether `ip` has an entry, after canonicalization.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.entries.contains_key(&ip.to_canonical())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep every [`sweep_period`](Self::sweep_period) until the ledger is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let ledger: Weak<Self> = Arc::downgrade(self);
        let period = self.sweep_period();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(ledger) = ledger.upgrade() else {
                    break;
                };
                let purged = ledger.sweep();
                if purged > 0 {
                    debug!(purged, remaining = ledger.len(), "reconnect ledger swept");
                }
            }
        })
    }
}
