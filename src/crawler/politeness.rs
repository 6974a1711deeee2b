//! Per-host request spacing
//!
//! Concurrent workers may target the same host. Each one reserves the next
//! free slot for that host under a short lock and then sleeps until the slot
//! opens, so requests to one host are at least `delay` apart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Spaces out requests to the same host
#[derive(Debug)]
pub struct HostThrottle {
    delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    /// Creates a throttle with the given minimum spacing
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Whether any spacing is applied at all
    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Reserves the next slot for `host` and returns when it opens
    fn reserve(&self, host: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let slot = slots
            .get(host)
            .map_or(now, |next| (*next).max(now));
        slots.insert(host.to_string(), slot + self.delay);
        slot
    }

    /// Waits until a request to `host` may be sent
    pub async fn wait(&self, host: &str) {
        if !self.is_enabled() {
            return;
        }

        let slot = self.reserve(host);
        if slot > Instant::now() {
            tracing::debug!("Delaying request to {} by {:?}", host, slot - Instant::now());
            tokio::time::sleep_until(slot).await;
        }
    }
}
