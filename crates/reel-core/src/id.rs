//! Strongly-typed counters used throughout the engine.

use std::fmt;

/// Monotonically increasing turn counter.
///
/// One turn is one discrete unit of simulated game time — the granularity
/// at which determinism checkpoints are taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u32);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TurnId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Cumulative count of substantive random draws consumed by the simulation.
///
/// Incremented by the game for every draw that can influence world state.
/// Recorded at each turn boundary and compared against the live counter
/// during playback; the two must be identical under correct replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawCount(pub u64);

impl fmt::Display for DrawCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DrawCount {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
