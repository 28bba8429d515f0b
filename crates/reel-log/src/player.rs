//! Read-mode event log.
//!
//! [`Player`] validates the header on open and then yields records in
//! file order, expanding compressed keystroke runs into repeated
//! logical events. Playback ends cleanly when the stream position
//! reaches the declared total length; anything short of that is an
//! error, never a silent stop.

use std::io::{Read, Seek, Write};

use tracing::debug;

use reel_core::{Event, KeyCode};

use crate::buffer::LogBuffer;
use crate::codec::{decode_header, get_record, HEADER_LEN};
use crate::error::LogError;
use crate::recorder::Recorder;
use crate::types::{DeterminismRecord, Record, SessionHeader};

/// A playback-level record: an event or a determinism checkpoint.
///
/// Keystroke runs are already expanded at this level; successive calls
/// to [`Player::next_record`] yield one keystroke per logical event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackRecord {
    /// The next event to dispatch into the simulation.
    Event(Event),
    /// The checkpoint recorded at a turn boundary.
    RngCheck(DeterminismRecord),
}

/// State of a keystroke run being expanded.
#[derive(Debug)]
struct RunState {
    code: KeyCode,
    remaining: u32,
}

/// Consumes events from a log stream.
///
/// Generic over `S: Read` so tests can play back from
/// `io::Cursor<Vec<u8>>` and production code from a `File`.
#[derive(Debug)]
pub struct Player<S: Read> {
    buffer: LogBuffer<S>,
    header: SessionHeader,
    run: Option<RunState>,
    events_read: u64,
}

impl<S: Read> Player<S> {
    /// Open a log stream, reading and validating the header.
    ///
    /// No event is consumed here; a header that fails validation
    /// leaves the stream untouched beyond the header bytes.
    pub fn open(backing: S, capacity: usize) -> Result<Self, LogError> {
        let mut buffer = LogBuffer::for_reading(backing, capacity);
        let mut raw = [0u8; HEADER_LEN];
        buffer.get_exact(&mut raw)?;
        let header = decode_header(&raw)?;

        if u64::from(header.declared_length) < HEADER_LEN as u64 {
            return Err(LogError::HeaderMismatch {
                detail: format!(
                    "declared length {} cannot contain the header",
                    header.declared_length
                ),
            });
        }
        buffer.set_total_length(u64::from(header.declared_length));

        Ok(Self {
            buffer,
            header,
            run: None,
            events_read: 0,
        })
    }

    /// The validated header.
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// Number of logical events yielded so far.
    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    /// Cumulative bytes consumed since the start of the log.
    pub fn stream_position(&self) -> u64 {
        self.buffer.stream_position()
    }

    /// Fraction of the log consumed so far.
    pub fn progress(&self) -> f64 {
        self.buffer.progress().unwrap_or(0.0)
    }

    /// Consume the player and return the backing stream.
    pub fn into_inner(self) -> S {
        self.buffer.into_backing()
    }

    /// Whether every record has been consumed.
    pub fn at_end(&self) -> bool {
        self.run.is_none() && self.stream_position() >= u64::from(self.header.declared_length)
    }

    /// Yield the next playback record, or `None` at the end of the log.
    ///
    /// This is the low-level step used by forward seeking, where events
    /// and checkpoints are handled in a single scan. Turn-loop callers
    /// normally use [`next_event`](Self::next_event) and
    /// [`next_rng_check`](Self::next_rng_check) instead.
    pub fn next_record(&mut self) -> Result<Option<PlaybackRecord>, LogError> {
        if let Some(run) = &mut self.run {
            let code = run.code;
            run.remaining -= 1;
            if run.remaining == 0 {
                self.run = None;
            }
            self.events_read += 1;
            return Ok(Some(PlaybackRecord::Event(Event::keystroke(code))));
        }

        if self.at_end() {
            return Ok(None);
        }

        let record = get_record(&mut self.buffer)?;
        if self.stream_position() > u64::from(self.header.declared_length) {
            return Err(LogError::MalformedRecord {
                detail: "record crosses the declared end of the log".into(),
            });
        }

        match record {
            Record::Event(event) => {
                self.events_read += 1;
                Ok(Some(PlaybackRecord::Event(event)))
            }
            Record::KeystrokeRun { code, count } => {
                if count > 1 {
                    self.run = Some(RunState {
                        code,
                        remaining: count - 1,
                    });
                }
                self.events_read += 1;
                Ok(Some(PlaybackRecord::Event(Event::keystroke(code))))
            }
            Record::RngCheck(check) => Ok(Some(PlaybackRecord::RngCheck(check))),
        }
    }

    /// Yield the next event, or `None` once the log is exhausted.
    ///
    /// Encountering a determinism checkpoint here means the caller's
    /// turn structure has diverged from the recording — the stream can
    /// no longer be trusted, so this fails rather than skipping.
    pub fn next_event(&mut self) -> Result<Option<Event>, LogError> {
        match self.next_record()? {
            None => Ok(None),
            Some(PlaybackRecord::Event(event)) => Ok(Some(event)),
            Some(PlaybackRecord::RngCheck(check)) => Err(LogError::MalformedRecord {
                detail: format!(
                    "determinism record for turn {} where an event was expected",
                    check.turn
                ),
            }),
        }
    }

    /// Yield the determinism checkpoint at the current turn boundary.
    ///
    /// The recording writes exactly one checkpoint per turn, so a
    /// faithful playback finds one here; an event record instead means
    /// the call sequences have diverged.
    pub fn next_rng_check(&mut self) -> Result<DeterminismRecord, LogError> {
        match self.next_record()? {
            Some(PlaybackRecord::RngCheck(check)) => Ok(check),
            Some(PlaybackRecord::Event(_)) => Err(LogError::MalformedRecord {
                detail: "event record where a determinism record was expected".into(),
            }),
            None => Err(LogError::UnexpectedEndOfStream {
                position: self.stream_position(),
                declared: Some(u64::from(self.header.declared_length)),
            }),
        }
    }
}

impl<S: Read + Write + Seek> Player<S> {
    /// Convert an exhausted player into a recorder appending to the
    /// same stream.
    ///
    /// This is the one-time playback-to-live transition. The caller
    /// must have consumed the log to its end; the session layer
    /// enforces that before calling.
    pub fn into_recorder(self) -> Result<Recorder<S>, LogError> {
        debug_assert!(self.at_end(), "cannot append before the end of the log");
        let mut buffer = self.buffer;
        buffer.begin_appending()?;
        debug!(position = buffer.stream_position(), "switched log to append mode");
        Ok(Recorder::resume(buffer, self.header))
    }
}
