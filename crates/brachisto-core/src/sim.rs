//! Simulation clock and state hashing.
//!
//! Time in the transfer subsystem is measured in days (`f64`). The owning
//! engine decides how many days each tick covers; the subsystem only counts
//! ticks and accumulates elapsed time.

use serde::{Deserialize, Serialize};

/// Ticks are the atomic unit of simulation progress.
pub type Ticks = u64;

/// Simulation time in days.
pub type SimTime = f64;

// ---------------------------------------------------------------------------
// Simulation clock
// ---------------------------------------------------------------------------

/// Mutable clock tracked by the transfer system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Number of completed `advance` calls.
    pub tick: Ticks,

    /// Elapsed simulation time in days.
    pub time: SimTime,
}

impl SimClock {
    /// Create a clock at tick 0, day 0.
    pub fn new() -> Self {
        Self { tick: 0, time: 0.0 }
    }

    /// Create a clock starting at the given day (e.g. when restoring a game).
    pub fn starting_at(time: SimTime) -> Self {
        Self { tick: 0, time }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an f64 into the hash by its bit pattern.
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Feed a bool into the hash.
    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.tick, 0);
        assert_eq!(clock.time, 0.0);
    }

    #[test]
    fn clock_can_start_mid_game() {
        let clock = SimClock::starting_at(412.5);
        assert_eq!(clock.tick, 0);
        assert_eq!(clock.time, 412.5);
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_f64(0.25);

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_f64(0.25);

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_distinguishes_float_values() {
        let mut h1 = StateHash::new();
        h1.write_f64(100.0);

        let mut h2 = StateHash::new();
        h2.write_f64(100.000001);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }
}
