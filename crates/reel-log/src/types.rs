//! Wire-level data types for the event log.

use reel_core::{DrawCount, Event, GameMode, KeyCode, TurnId};

/// The log file header.
///
/// Written once when a recording starts and rewritten with the final
/// counts when it is finished; read and validated once when playback
/// starts, before any event is consumed.
///
/// # Examples
///
/// ```
/// use reel_core::GameMode;
/// use reel_log::SessionHeader;
///
/// let header = SessionHeader {
///     version: "CE 1.9.3".into(),
///     mode: GameMode::Standard,
///     seed: 0xDEAD_BEEF_CAFE_F00D,
///     turn_count: 0,
///     max_level_changes: 0,
///     declared_length: 0,
/// };
///
/// assert_eq!(header.seed >> 32, 0xDEAD_BEEF);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeader {
    /// Version string of the build that produced the log
    /// (variant identifier plus major.minor.patch triplet).
    pub version: String,
    /// Rule variant the session was played under.
    pub mode: GameMode,
    /// Seed the simulation's RNG was initialized with.
    pub seed: u64,
    /// Number of turns in the finished recording.
    pub turn_count: u32,
    /// Deepest-level-change count of the finished recording.
    pub max_level_changes: u32,
    /// Total length of the log in bytes, header included.
    ///
    /// Zero until the recording is finished; playback rejects a header
    /// whose declared length cannot contain the header itself.
    pub declared_length: u32,
}

/// A per-turn determinism checkpoint.
///
/// Pairs a turn number with the cumulative substantive-draw count at
/// that turn boundary. Appended every turn while recording; compared
/// against the live counter every turn during playback. Both counters
/// are monotonically non-decreasing and identical under correct replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeterminismRecord {
    /// The turn this checkpoint was taken at.
    pub turn: TurnId,
    /// Cumulative random draws consumed up to this turn.
    pub draws: DrawCount,
}

/// A decoded log record, before run expansion.
///
/// [`Player`](crate::Player) expands `KeystrokeRun` into repeated
/// keystroke events; this type is what the codec itself produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    /// A single event.
    Event(Event),
    /// A compressed run of identical modifier-free keystrokes.
    KeystrokeRun {
        /// The repeated key.
        code: KeyCode,
        /// Number of logical keystrokes in the run, at least one.
        count: u32,
    },
    /// A determinism checkpoint.
    RngCheck(DeterminismRecord),
}

// ── Opcode constants ────────────────────────────────────────────

/// Opcode for a single keystroke record.
pub const OP_KEYSTROKE: u8 = 0;
/// Opcode for a compressed keystroke run.
pub const OP_KEYSTROKE_RUN: u8 = 1;
/// Opcode for a mouse-down record.
pub const OP_MOUSE_DOWN: u8 = 2;
/// Opcode for a mouse-up record.
pub const OP_MOUSE_UP: u8 = 3;
/// Opcode for the saved-game-loaded marker.
pub const OP_SAVED_GAME_LOADED: u8 = 4;
/// Opcode for a determinism checkpoint record.
pub const OP_RNG_CHECK: u8 = 5;
/// Opcode for the switched-to-live marker.
pub const OP_SWITCHED_TO_LIVE: u8 = 6;
