//! Per-host pacing of clone operations.
//!
//! The ledger remembers when each key was last granted a slot. A later
//! request for the same key sleeps until `delay` has passed since that
//! grant; the grant time is recorded after the sleep, so the interval is
//! measured between the starts of allowed work.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{BundleError, Result};

#[derive(Debug, Clone, Copy)]
struct Slot {
    last: Instant,
    grants: u64,
}

/// Enforces a minimum interval between operations sharing a key.
///
/// Calls are expected from a single control thread; distinct keys never
/// wait on each other.
#[derive(Debug, Clone)]
pub struct Throttler {
    delay: Duration,
    ledger: HashMap<String, Slot>,
}

impl Throttler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ledger: HashMap::new(),
        }
    }

    /// Build from a delay in (possibly fractional) seconds.
    ///
    /// # Errors
    /// Returns [`BundleError::Config`] if `seconds` is negative or not finite.
    pub fn from_secs_f64(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(BundleError::Config(format!(
                "delay must be a finite number >= 0: {}",
                seconds
            )));
        }
        Ok(Self::new(Duration::from_secs_f64(seconds)))
    }

    /// A throttler that never sleeps.
    pub fn no_delay() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Block until `key` may proceed, then record the grant.
    ///
    /// The first call for a key never blocks.
    pub fn throttle(&mut self, key: &str) {
        if let Some(slot) = self.ledger.get(key) {
            let elapsed = slot.last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                debug!("category={}; sleeping for {:?}", key, wait);
                thread::sleep(wait);
            }
        }
        let now = Instant::now();
        let slot = self
            .ledger
            .entry(key.to_string())
            .and_modify(|s| {
                s.last = now;
                s.grants += 1;
            })
            .or_insert(Slot {
                last: now,
                grants: 1,
            });
        debug!("category={}; grant #{}", key, slot.grants);
    }

    /// Number of slots granted to `key` so far.
    #[cfg(test)]
    pub(crate) fn grants(&self, key: &str) -> u64 {
        self.ledger.get(key).map_or(0, |s| s.grants)
    }

    /// When `key` was last granted a slot.
    #[cfg(test)]
    pub(crate) fn last_grant(&self, key: &str) -> Option<Instant> {
        self.ledger.get(key).map(|s| s.last)
    }
}
