use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Largest counter value handed to clients. The web client keeps tokens as
/// JS numbers, so the counter wraps one step before 2^53 - 1.
const MAX_SAFE: u64 = (1 << 53) - 1;

/// Change token for client-side cache invalidation. Seeded randomly per
/// process so a restart invalidates every previously issued token; never
/// persisted. Lost increments under contention are acceptable — the value
/// is a change hint, not a sequence number.
pub struct ModCount {
    value: AtomicU64,
}

impl ModCount {
    pub fn new() -> Self {
        let seed = rand::rng().random_range(0..10_000_000_000u64);
        ModCount {
            value: AtomicU64::new(seed),
        }
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Advance the token, wrapping to 1 at the safe-integer ceiling.
    pub fn increment(&self) -> u64 {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                if v >= MAX_SAFE - 1 { Some(1) } else { Some(v + 1) }
            });
        self.get()
    }

    /// True while `token` still matches the current state.
    pub fn validate(&self, token: u64) -> bool {
        self.get() == token
    }
}

impl Default for ModCount {
    fn default() -> Self {
        Self::new()
    }
}
