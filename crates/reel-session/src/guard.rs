//! The determinism guard: recorded vs live draw-counter comparison.

use tracing::warn;

use reel_core::{DrawCount, TurnId};

/// Diagnostic produced when playback goes out of sync.
///
/// Preserved by the session for the caller to log or display; the
/// simulation state is left exactly as it was at the mismatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OosReport {
    /// Turn at which the divergence was detected.
    pub turn: TurnId,
    /// Draw count stored in the log for that turn.
    pub recorded: DrawCount,
    /// Draw count the live simulation reported.
    pub live: DrawCount,
}

/// Compares per-turn draw counters during playback.
///
/// The guard's precision depends entirely on the caller taking a
/// checkpoint at the same logical point every turn; it can only ever
/// localize a divergence to the turn whose checkpoint caught it.
#[derive(Debug, Default)]
pub struct DeterminismGuard {
    last: Option<(TurnId, DrawCount)>,
}

impl DeterminismGuard {
    /// Create a guard with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify one checkpoint.
    ///
    /// Fails when the recorded and live counters differ, and also when
    /// either the turn or the counter moves backwards — the counters
    /// are monotonic by contract, so regression is divergence even if
    /// the two values happen to agree.
    pub fn verify(
        &mut self,
        turn: TurnId,
        recorded: DrawCount,
        live: DrawCount,
    ) -> Result<(), OosReport> {
        let report = OosReport {
            turn,
            recorded,
            live,
        };
        if recorded != live {
            warn!(
                turn = turn.0,
                recorded = recorded.0,
                live = live.0,
                "draw counters diverged"
            );
            return Err(report);
        }
        if let Some((last_turn, last_draws)) = self.last {
            if turn <= last_turn || recorded < last_draws {
                warn!(
                    turn = turn.0,
                    last_turn = last_turn.0,
                    "checkpoint regressed"
                );
                return Err(report);
            }
        }
        self.last = Some((turn, recorded));
        Ok(())
    }

    /// The most recent checkpoint that verified cleanly.
    pub fn last_verified(&self) -> Option<(TurnId, DrawCount)> {
        self.last
    }
}
