//! Error types for the log layer.

use std::fmt;
use std::io;

/// Errors that can occur while writing or reading the event log.
///
/// Every variant is terminal for the current session: the log is either
/// unwritable or untrustworthy beyond the failure point, and no local
/// retry is attempted anywhere in the engine.
#[derive(Debug)]
pub enum LogError {
    /// An I/O error occurred during flush or refill.
    Io(io::Error),
    /// The backing stream ended before the declared log length.
    UnexpectedEndOfStream {
        /// Stream position at which the read came up empty.
        position: u64,
        /// Declared total length, if the header had been read.
        declared: Option<u64>,
    },
    /// A record or header field could not be encoded or decoded.
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A record opcode outside the closed set was encountered.
    UnknownOpcode {
        /// The unrecognized opcode byte.
        opcode: u8,
    },
    /// The header bytes do not match the expected field layout.
    ///
    /// Surfaced by the session layer as a version incompatibility:
    /// a header written with a different field order or width is
    /// indistinguishable from a log produced by a foreign build.
    HeaderMismatch {
        /// Human-readable description of the layout deviation.
        detail: String,
    },
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::UnexpectedEndOfStream { position, declared } => {
                write!(f, "unexpected end of stream at byte {position}")?;
                if let Some(declared) = declared {
                    write!(f, " (declared length {declared})")?;
                }
                Ok(())
            }
            Self::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
            Self::UnknownOpcode { opcode } => write!(f, "unknown opcode {opcode:#04x}"),
            Self::HeaderMismatch { detail } => write!(f, "header mismatch: {detail}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LogError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
