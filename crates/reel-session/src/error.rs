//! Error types for the session layer.

use std::fmt;

use reel_core::{DrawCount, TurnId};
use reel_log::LogError;

use crate::config::ConfigError;
use crate::session::SessionState;

/// Errors that end a session.
///
/// Every variant is terminal for the current session; the caller
/// decides user-facing behavior, such as falling back to a fresh game.
#[derive(Debug)]
pub enum SessionError {
    /// The log layer failed (I/O, truncation, malformed records).
    Log(LogError),
    /// The log was produced by a build this one cannot replay.
    VersionIncompatible {
        /// Version string from the log header, or a description of why
        /// it could not be read.
        recorded: String,
        /// Version of the running build.
        current: String,
    },
    /// Recorded and live draw counters diverged during playback.
    ///
    /// Terminal for this playback, not a crash: the simulation is left
    /// exactly as it was at the mismatch and no rollback is attempted.
    OutOfSync {
        /// Turn at which the divergence was detected.
        turn: TurnId,
        /// Draw count stored in the log.
        recorded: DrawCount,
        /// Draw count reported by the live simulation.
        live: DrawCount,
    },
    /// An operation was invoked in a state that does not permit it.
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the session was in.
        state: SessionState,
    },
    /// The session configuration failed validation.
    Config(ConfigError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log(e) => write!(f, "log error: {e}"),
            Self::VersionIncompatible { recorded, current } => {
                write!(
                    f,
                    "recording from version '{recorded}' cannot be replayed by '{current}'"
                )
            }
            Self::OutOfSync {
                turn,
                recorded,
                live,
            } => {
                write!(
                    f,
                    "out of sync at turn {turn}: recorded {recorded} draws, live {live}"
                )
            }
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not valid in the {state} state")
            }
            Self::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Log(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LogError> for SessionError {
    fn from(e: LogError) -> Self {
        Self::Log(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
