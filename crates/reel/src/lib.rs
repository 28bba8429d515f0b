//! Reel: a deterministic input recording and replay engine for
//! turn-based games.
//!
//! Every keystroke and mouse event a session consumes, together with
//! the pseudo-random stream it drove, is recorded to a compact binary
//! log that can be re-executed later to regenerate an identical
//! sequence of world states. This powers save files (play a recording
//! back to its last turn), shareable replays, and an out-of-sync
//! detector that catches non-determinism bugs during development.
//!
//! This is the top-level facade crate re-exporting the public API of
//! the Reel sub-crates. For most users, adding `reel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::io::Cursor;
//! use reel::prelude::*;
//! use reel::types::GameMode;
//!
//! // The game layer implements the Simulation collaborator trait.
//! struct Game {
//!     turn: u32,
//!     draws: u64,
//! }
//! impl Simulation for Game {
//!     fn current_draw_count(&self) -> DrawCount { DrawCount(self.draws) }
//!     fn current_turn(&self) -> TurnId { TurnId(self.turn) }
//!     fn apply_event(&mut self, _event: Event) { self.draws += 1; }
//! }
//!
//! let header = SessionHeader {
//!     version: "CE 1.9.3".into(),
//!     mode: GameMode::Standard,
//!     seed: 42,
//!     turn_count: 0,
//!     max_level_changes: 0,
//!     declared_length: 0,
//! };
//!
//! // Record one turn.
//! let mut game = Game { turn: 0, draws: 0 };
//! let config = SessionConfig::default();
//! let mut session =
//!     Session::record(Cursor::new(Vec::new()), header, &config).unwrap();
//! session.record_keystroke(KeyCode(b'h' as u16), false, false).unwrap();
//! game.draws += 1;
//! game.turn += 1;
//! session.record_turn_checkpoint(&game).unwrap();
//! let log = session.finish(1, 0).unwrap();
//!
//! // Play it back against a fresh game.
//! let mut game = Game { turn: 0, draws: 0 };
//! let current = Version::parse("CE 1.9.3").unwrap();
//! let mut session = Session::playback(log, &current, &config).unwrap();
//! let event = session.next_event().unwrap().unwrap();
//! game.apply_event(event);
//! game.turn += 1;
//! session.record_turn_checkpoint(&game).unwrap();
//! assert!(session.next_event().unwrap().is_none());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `reel-core` | Events, typed counters, the `Simulation` trait |
//! | [`log`] | `reel-log` | Binary log: buffer, codec, recorder, player |
//! | [`session`] | `reel-session` | Session state machine, version gate, guard |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the collaborator trait (`reel-core`).
///
/// The [`types::Event`] sum type, [`types::TurnId`] / [`types::DrawCount`]
/// counters, and the [`types::Simulation`] trait the game implements.
pub use reel_core as types;

/// Binary event log (`reel-log`).
///
/// The streaming [`log::LogBuffer`], the wire codec, and the
/// [`log::Recorder`] / [`log::Player`] pair.
pub use reel_log as log;

/// Session control (`reel-session`).
///
/// The [`session::Session`] state machine, the version compatibility
/// gate, the determinism guard, and the annotation sidecar reader.
pub use reel_session as session;

/// Common imports for typical Reel usage.
///
/// ```rust
/// use reel::prelude::*;
/// ```
pub mod prelude {
    pub use reel_core::{DrawCount, Event, KeyCode, Simulation, TurnId};
    pub use reel_log::{LogError, SessionHeader};
    pub use reel_session::{
        SeekOutcome, SeekTarget, Session, SessionConfig, SessionError, SessionState, Version,
        VersionCompat,
    };
}
