//! Session configuration and validation.

use std::error::Error;
use std::fmt;

use reel_log::{DEFAULT_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY};

/// Configuration for a recording or playback session.
///
/// Validated once at session start; a session never reconfigures
/// itself mid-stream.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Capacity of the in-memory byte window between the codec and the
    /// log file. Larger windows mean fewer flush/refill syscalls;
    /// the default is ample for interactive play.
    pub window_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity < MIN_WINDOW_CAPACITY {
            return Err(ConfigError::WindowTooSmall {
                requested: self.window_capacity,
                minimum: MIN_WINDOW_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The window cannot hold the header and largest record.
    WindowTooSmall {
        /// The requested capacity.
        requested: usize,
        /// The smallest accepted capacity.
        minimum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowTooSmall { requested, minimum } => {
                write!(
                    f,
                    "window capacity {requested} is below the minimum {minimum}"
                )
            }
        }
    }
}

impl Error for ConfigError {}
