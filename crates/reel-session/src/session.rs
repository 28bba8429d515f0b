//! The session controller state machine.
//!
//! A [`Session`] owns one log stream in exactly one mode at a time and
//! mediates every interaction between the game's turn loop and the log:
//!
//! ```text
//! start ──(recording)──────────────────────────▶ Recording
//! start ──(playback, version gate passes)──────▶ Playback
//! start ──(playback, version incompatible)─────▶ error, nothing consumed
//! Playback ──(pause)──▶ PlaybackPaused ──(resume)──▶ Playback
//! Playback ──(checkpoint mismatch)──▶ OutOfSync      (terminal)
//! Playback ──(log exhausted, switch_to_live)──▶ Recording
//! Recording ──(finish)──▶ Ended
//! ```
//!
//! All transitions are synchronous and run to completion inside the
//! call that triggered them; there is no background I/O thread and no
//! engine-internal global state.

use std::fmt;
use std::io::{Read, Seek, Write};
use std::mem;

use tracing::{debug, warn};

use reel_core::{DrawCount, Event, KeyCode, Simulation, TurnId};
use reel_log::types::DeterminismRecord;
use reel_log::{LogError, PlaybackRecord, Player, Recorder, SessionHeader};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::guard::{DeterminismGuard, OosReport};
use crate::version::{Version, VersionCompat};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Appending events to the log.
    Recording,
    /// Consuming events from the log.
    Playback,
    /// Playback temporarily halted; no events are consumed.
    PlaybackPaused,
    /// Playback diverged from the recording. Terminal.
    OutOfSync,
    /// The session is over. Terminal.
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Recording => "recording",
            Self::Playback => "playback",
            Self::PlaybackPaused => "playback-paused",
            Self::OutOfSync => "out-of-sync",
            Self::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// Where a forward seek should stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekTarget {
    /// Stop once the checkpoint for this turn has been crossed.
    Turn(TurnId),
    /// Stop once the stream position reaches this byte offset.
    ByteOffset(u64),
}

/// How a forward seek ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The target was reached; normal dispatch can resume.
    Reached,
    /// The caller's cancel flag was raised mid-scan.
    Cancelled,
    /// The log ran out before the target.
    EndOfLog,
}

enum Mode<S: Read + Write + Seek> {
    Recording(Recorder<S>),
    Playback(Player<S>),
    /// Transient placeholder while ownership moves between modes.
    Done,
}

/// A recording or playback session over one log stream.
///
/// Generic over the backing stream; tests run against
/// `io::Cursor<Vec<u8>>`, production against `File`. Exactly one
/// writer or one reader owns a log at a time — opening the same path
/// in both modes at once is a caller error this engine does not
/// arbitrate.
pub struct Session<S: Read + Write + Seek> {
    mode: Mode<S>,
    state: SessionState,
    header: SessionHeader,
    guard: DeterminismGuard,
    compat: Option<VersionCompat>,
    oos: Option<OosReport>,
}

impl<S: Read + Write + Seek> Session<S> {
    /// Start a recording session, writing the header immediately.
    pub fn record(
        backing: S,
        header: SessionHeader,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let recorder = Recorder::new(backing, header.clone(), config.window_capacity)?;
        debug!(seed = header.seed, "session started in recording mode");
        Ok(Self {
            mode: Mode::Recording(recorder),
            state: SessionState::Recording,
            header,
            guard: DeterminismGuard::new(),
            compat: None,
            oos: None,
        })
    }

    /// Start a playback session.
    ///
    /// The header is read and gated against `current` before anything
    /// else; on rejection no event has been consumed. A header whose
    /// layout cannot be parsed is reported as a version
    /// incompatibility, since a foreign layout and a foreign build are
    /// indistinguishable from here.
    pub fn playback(
        backing: S,
        current: &Version,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let player = match Player::open(backing, config.window_capacity) {
            Ok(player) => player,
            Err(LogError::HeaderMismatch { detail }) => {
                warn!(%detail, "rejecting log with unreadable header");
                return Err(SessionError::VersionIncompatible {
                    recorded: format!("<unreadable header: {detail}>"),
                    current: current.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let stored = player.header().version.clone();
        let compat = match current.compat_with(&stored) {
            Some(compat) => compat,
            None => {
                warn!(
                    recorded = %stored,
                    current = %current,
                    "version gate rejected recording"
                );
                return Err(SessionError::VersionIncompatible {
                    recorded: stored,
                    current: current.to_string(),
                });
            }
        };

        debug!(recorded = %stored, ?compat, "session started in playback mode");
        let header = player.header().clone();
        Ok(Self {
            mode: Mode::Playback(player),
            state: SessionState::Playback,
            header,
            guard: DeterminismGuard::new(),
            compat: Some(compat),
            oos: None,
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The log header as of session start.
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// How the log's version relates to the running build.
    /// `None` while recording.
    pub fn compat(&self) -> Option<VersionCompat> {
        self.compat
    }

    /// Diagnostic from the out-of-sync transition, if one happened.
    pub fn oos_report(&self) -> Option<&OosReport> {
        self.oos.as_ref()
    }

    /// Fraction of the log consumed; `None` while recording.
    pub fn progress(&self) -> Option<f64> {
        match &self.mode {
            Mode::Playback(player) => Some(player.progress()),
            _ => None,
        }
    }

    // ── Recording ───────────────────────────────────────────────

    /// Append an event to the log.
    pub fn record_event(&mut self, event: Event) -> Result<(), SessionError> {
        let recorder = self.require_recorder("record_event")?;
        recorder.record_event(event)?;
        Ok(())
    }

    /// Append a keystroke, merging runs of identical simple keystrokes.
    pub fn record_keystroke(
        &mut self,
        code: KeyCode,
        ctrl: bool,
        shift: bool,
    ) -> Result<(), SessionError> {
        let recorder = self.require_recorder("record_keystroke")?;
        recorder.record_keystroke(code, ctrl, shift)?;
        Ok(())
    }

    /// Retract the most recently recorded keystroke, if it has not yet
    /// been flushed to disk.
    pub fn cancel_keystroke(&mut self) -> Result<bool, SessionError> {
        let recorder = self.require_recorder("cancel_keystroke")?;
        Ok(recorder.cancel_keystroke())
    }

    // ── Playback ────────────────────────────────────────────────

    /// The next recorded event, or `None` once the log is exhausted.
    pub fn next_event(&mut self) -> Result<Option<Event>, SessionError> {
        let player = self.require_player("next_event")?;
        Ok(player.next_event()?)
    }

    /// Halt event consumption until [`resume`](Self::resume).
    pub fn pause(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Playback => {
                self.state = SessionState::PlaybackPaused;
                debug!("playback paused");
                Ok(())
            }
            state => Err(SessionError::InvalidState {
                operation: "pause",
                state,
            }),
        }
    }

    /// Resume a paused playback.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::PlaybackPaused => {
                self.state = SessionState::Playback;
                debug!("playback resumed");
                Ok(())
            }
            state => Err(SessionError::InvalidState {
                operation: "resume",
                state,
            }),
        }
    }

    // ── Turn checkpoints ────────────────────────────────────────

    /// Take the once-per-turn determinism checkpoint.
    ///
    /// While recording this appends the simulation's current turn and
    /// draw counter to the log; during playback it reads the recorded
    /// pair and compares it against the live counter, transitioning to
    /// the terminal [`SessionState::OutOfSync`] on any divergence.
    ///
    /// The caller must invoke this unconditionally once per turn
    /// boundary in both modes; the out-of-sync check is exactly as
    /// precise as that discipline.
    pub fn record_turn_checkpoint(&mut self, sim: &impl Simulation) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording => {
                let turn = sim.current_turn();
                let draws = sim.current_draw_count();
                let recorder = self.require_recorder("record_turn_checkpoint")?;
                recorder.record_rng_check(turn, draws)?;
                Ok(())
            }
            SessionState::Playback => {
                let live = sim.current_draw_count();
                let check = {
                    let player = self.require_player("record_turn_checkpoint")?;
                    player.next_rng_check()?
                };
                self.verify_checkpoint(check, live)
            }
            state => Err(SessionError::InvalidState {
                operation: "record_turn_checkpoint",
                state,
            }),
        }
    }

    // ── Seeking ─────────────────────────────────────────────────

    /// Scan forward to `target`, applying every crossed event to the
    /// simulation without dispatching it to the rendering layer.
    ///
    /// The log format is not randomly seekable — keystroke runs make
    /// positions context-dependent — so this is the only sanctioned way
    /// to jump ahead, and it only ever moves forward. Determinism
    /// checkpoints crossed during the scan are still verified.
    ///
    /// `cancelled` is polled once per scanned record, never mid-record;
    /// a cancelled seek leaves the session playable at the position it
    /// had reached.
    pub fn seek(
        &mut self,
        sim: &mut impl Simulation,
        target: SeekTarget,
        mut cancelled: impl FnMut() -> bool,
    ) -> Result<SeekOutcome, SessionError> {
        if self.state != SessionState::Playback {
            return Err(SessionError::InvalidState {
                operation: "seek",
                state: self.state,
            });
        }

        loop {
            if cancelled() {
                return Ok(SeekOutcome::Cancelled);
            }

            let record = {
                let Mode::Playback(player) = &mut self.mode else {
                    return Err(SessionError::InvalidState {
                        operation: "seek",
                        state: self.state,
                    });
                };
                if let SeekTarget::ByteOffset(offset) = target {
                    if player.stream_position() >= offset {
                        return Ok(SeekOutcome::Reached);
                    }
                }
                player.next_record()?
            };

            match record {
                None => return Ok(SeekOutcome::EndOfLog),
                Some(PlaybackRecord::Event(event)) => sim.apply_event(event),
                Some(PlaybackRecord::RngCheck(check)) => {
                    let live = sim.current_draw_count();
                    self.verify_checkpoint(check, live)?;
                    if let SeekTarget::Turn(turn) = target {
                        if check.turn >= turn {
                            return Ok(SeekOutcome::Reached);
                        }
                    }
                }
            }
        }
    }

    // ── Mode transition ─────────────────────────────────────────

    /// Continue an exhausted playback as a live recording.
    ///
    /// Allowed exactly once, and only when every recorded event has
    /// been consumed; the log gains a switched-to-live marker and
    /// subsequent events append after it. There is no way back to
    /// playback within the session.
    pub fn switch_to_live(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Playback {
            return Err(SessionError::InvalidState {
                operation: "switch_to_live",
                state: self.state,
            });
        }
        match &self.mode {
            Mode::Playback(player) if player.at_end() => {}
            _ => {
                return Err(SessionError::InvalidState {
                    operation: "switch_to_live before the end of the log",
                    state: self.state,
                })
            }
        }

        let Mode::Playback(player) = mem::replace(&mut self.mode, Mode::Done) else {
            return Err(SessionError::InvalidState {
                operation: "switch_to_live",
                state: self.state,
            });
        };
        match Self::make_live(player) {
            Ok(recorder) => {
                self.mode = Mode::Recording(recorder);
                self.state = SessionState::Recording;
                debug!("switched playback session to live recording");
                Ok(())
            }
            Err(e) => {
                // The stream is in an unknown state; the session is over.
                self.state = SessionState::Ended;
                Err(e.into())
            }
        }
    }

    fn make_live(player: Player<S>) -> Result<Recorder<S>, LogError> {
        let mut recorder = player.into_recorder()?;
        recorder.record_event(Event::SwitchedToLive)?;
        Ok(recorder)
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Finish a recording: flush, finalize the header with the given
    /// counts, and return the backing stream.
    pub fn finish(self, turn_count: u32, max_level_changes: u32) -> Result<S, SessionError> {
        match self.mode {
            Mode::Recording(recorder) => {
                debug!(turns = turn_count, "session finished");
                Ok(recorder.finish(turn_count, max_level_changes)?)
            }
            _ => Err(SessionError::InvalidState {
                operation: "finish",
                state: self.state,
            }),
        }
    }

    /// Close a playback session and return the backing stream.
    ///
    /// A recording session must be [`finish`](Self::finish)ed instead,
    /// so its header is never left with stale counts.
    pub fn close(self) -> Result<S, SessionError> {
        match self.mode {
            Mode::Playback(player) => Ok(player.into_inner()),
            _ => Err(SessionError::InvalidState {
                operation: "close",
                state: self.state,
            }),
        }
    }

    // ── Internals ───────────────────────────────────────────────

    fn require_recorder(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut Recorder<S>, SessionError> {
        match (self.state, &mut self.mode) {
            (SessionState::Recording, Mode::Recording(recorder)) => Ok(recorder),
            (state, _) => Err(SessionError::InvalidState { operation, state }),
        }
    }

    fn require_player(&mut self, operation: &'static str) -> Result<&mut Player<S>, SessionError> {
        match (self.state, &mut self.mode) {
            (SessionState::Playback, Mode::Playback(player)) => Ok(player),
            (state, _) => Err(SessionError::InvalidState { operation, state }),
        }
    }

    /// Compare a recorded checkpoint against the live counter,
    /// freezing the session on divergence.
    ///
    /// The transition completes before this returns; by the time the
    /// caller sees the error, event consumption is already frozen and
    /// the diagnostic stored.
    fn verify_checkpoint(
        &mut self,
        check: DeterminismRecord,
        live: DrawCount,
    ) -> Result<(), SessionError> {
        match self.guard.verify(check.turn, check.draws, live) {
            Ok(()) => Ok(()),
            Err(report) => {
                warn!(
                    turn = report.turn.0,
                    recorded = report.recorded.0,
                    live = report.live.0,
                    "playback is out of sync; freezing session"
                );
                self.oos = Some(report);
                self.state = SessionState::OutOfSync;
                Err(SessionError::OutOfSync {
                    turn: report.turn,
                    recorded: report.recorded,
                    live: report.live,
                })
            }
        }
    }
}
