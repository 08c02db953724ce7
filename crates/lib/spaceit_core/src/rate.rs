//! Request rate gate.
//!
//! A single token bucket shared by every request of the process. The bucket
//! starts full, refills continuously at `refill_per_sec` up to `capacity`, and
//! each admitted request consumes one token. Callers never wait: an empty
//! bucket rejects immediately.

use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateGateConfig {
    /// Maximum burst size.
    pub capacity: u32,
    /// Sustained tokens per second.
    pub refill_per_sec: f64,
}

impl Default for RateGateConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            refill_per_sec: 2.0,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Process-wide admission filter. Share it behind an `Arc`.
#[derive(Debug)]
pub struct RateGate {
    config: RateGateConfig,
    bucket: Mutex<Bucket>,
}

impl RateGate {
    pub fn new(config: RateGateConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    /// Build a gate whose bucket was last refilled at `start`.
    pub fn starting_at(config: RateGateConfig, start: Instant) -> Self {
        let refill_per_sec = if config.refill_per_sec.is_finite() {
            config.refill_per_sec.max(0.0)
        } else {
            0.0
        };
        let config = RateGateConfig {
            refill_per_sec,
            ..config
        };
        Self {
            bucket: Mutex::new(Bucket {
                tokens: f64::from(config.capacity),
                last_refill: start,
            }),
            config,
        }
    }

    pub fn config(&self) -> RateGateConfig {
        self.config
    }

    /// Admit one request now.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Admit one request at the clock reading `now`.
    ///
    /// Readings earlier than the last refill add nothing.
    pub fn allow_at(&self, now: Instant) -> bool {
        // The critical section is pure arithmetic; a poisoned lock still holds
        // a consistent bucket.
        let mut bucket = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if !elapsed.is_zero() {
            let refill = elapsed.as_secs_f64() * self.config.refill_per_sec;
            bucket.tokens = (bucket.tokens + refill).min(f64::from(self.config.capacity));
            bucket.last_refill = now;
        }

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!(capacity = self.config.capacity, "rate gate rejected request");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn gate(capacity: u32, refill_per_sec: f64) -> (RateGate, Instant) {
        let start = Instant::now();
        let gate = RateGate::starting_at(
            RateGateConfig {
                capacity,
                refill_per_sec,
            },
            start,
        );
        (gate, start)
    }

    #[test]
    fn drains_exactly_capacity() {
        let (gate, start) = gate(3, 1.0);
        assert!(gate.allow_at(start));
        assert!(gate.allow_at(start));
        assert!(gate.allow_at(start));
        assert!(!gate.allow_at(start));
    }

    #[test]
    fn refills_proportionally_and_caps() {
        let (gate, start) = gate(2, 2.0);
        assert!(gate.allow_at(start));
        assert!(gate.allow_at(start));
        assert!(!gate.allow_at(start));

        // Half a second at 2/s is one token.
        let later = start + Duration::from_millis(500);
        assert!(gate.allow_at(later));
        assert!(!gate.allow_at(later));

        // A long idle period refills only up to capacity.
        let much_later = later + Duration::from_secs(60);
        assert!(gate.allow_at(much_later));
        assert!(gate.allow_at(much_later));
        assert!(!gate.allow_at(much_later));
    }

    #[test]
    fn clock_going_backwards_adds_nothing() {
        let (gate, start) = gate(1, 10.0);
        let later = start + Duration::from_secs(1);
        assert!(gate.allow_at(later));
        assert!(!gate.allow_at(start));
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let (gate, start) = gate(0, 5.0);
        assert!(!gate.allow_at(start));
        assert!(!gate.allow_at(start + Duration::from_secs(10)));
    }

    #[test]
    fn nonsense_refill_rate_is_clamped() {
        let (nan, _) = gate(1, f64::NAN);
        assert_eq!(nan.config().refill_per_sec, 0.0);
        let (negative, _) = gate(1, -3.0);
        assert_eq!(negative.config().refill_per_sec, 0.0);
    }

    #[test]
    fn concurrent_callers_share_capacity_exactly() {
        const CAPACITY: u32 = 16;
        const CALLERS: usize = 64;

        let (gate, start) = gate(CAPACITY, 0.0);
        let gate = Arc::new(gate);
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let gate = gate.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    if gate.allow_at(start) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), CAPACITY as usize);
    }
}
