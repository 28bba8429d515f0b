//! Write-mode event log.
//!
//! [`Recorder`] appends events to the log through the streaming buffer,
//! merging consecutive identical modifier-free keystrokes into
//! compressed runs. The header is written immediately on construction
//! with zeroed counts and rewritten with the real ones by
//! [`finish`](Recorder::finish).

use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use reel_core::{DrawCount, Event, KeyCode, TurnId};

use crate::buffer::LogBuffer;
use crate::codec::{encode_header, put_event, put_keystroke_run, put_rng_check};
use crate::error::LogError;
use crate::types::SessionHeader;

/// An open keystroke run not yet committed to the stream.
struct PendingRun {
    code: KeyCode,
    count: u32,
}

/// Window location of the last single-keystroke record, for
/// [`Recorder::cancel_keystroke`]. Valid only while no flush has
/// happened since it was appended.
struct UnflushedSpan {
    cursor: usize,
    epoch: u64,
}

/// Appends events to a log stream.
///
/// Generic over `S: Write` so tests can record into
/// `io::Cursor<Vec<u8>>` and production code into a `File`.
/// [`finish`](Recorder::finish) additionally needs `Seek` to rewrite
/// the header.
pub struct Recorder<S: Write> {
    buffer: LogBuffer<S>,
    header: SessionHeader,
    pending_run: Option<PendingRun>,
    last_single: Option<UnflushedSpan>,
    events_recorded: u64,
}

impl<S: Write> Recorder<S> {
    /// Start a recording, immediately writing the header.
    ///
    /// The header's `turn_count`, `max_level_changes`, and
    /// `declared_length` are written as given (normally zero) and
    /// replaced with the final values when the recording is finished.
    pub fn new(backing: S, header: SessionHeader, capacity: usize) -> Result<Self, LogError> {
        let mut buffer = LogBuffer::for_writing(backing, capacity);
        buffer.put_bytes(&encode_header(&header)?)?;
        Ok(Self {
            buffer,
            header,
            pending_run: None,
            last_single: None,
            events_recorded: 0,
        })
    }

    /// Continue an existing stream in write mode.
    ///
    /// Used for the one-time playback-to-live transition; the header
    /// is already on disk and is not rewritten here.
    pub(crate) fn resume(buffer: LogBuffer<S>, header: SessionHeader) -> Self {
        Self {
            buffer,
            header,
            pending_run: None,
            last_single: None,
            events_recorded: 0,
        }
    }

    /// The header this recording was started with.
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// Number of logical events recorded so far, cancelled ones excluded.
    pub fn events_recorded(&self) -> u64 {
        self.events_recorded
    }

    /// Append an event.
    ///
    /// Keystrokes are routed through the run-merging path; everything
    /// else closes any open run first so record order is preserved.
    pub fn record_event(&mut self, event: Event) -> Result<(), LogError> {
        if let Event::Keystroke { code, ctrl, shift } = event {
            return self.record_keystroke(code, ctrl, shift);
        }
        self.commit_pending_run()?;
        put_event(&mut self.buffer, &event)?;
        self.last_single = None;
        self.events_recorded += 1;
        Ok(())
    }

    /// Append a keystroke, merging consecutive identical simple
    /// keystrokes into a compressed run automatically.
    pub fn record_keystroke(
        &mut self,
        code: KeyCode,
        ctrl: bool,
        shift: bool,
    ) -> Result<(), LogError> {
        if !ctrl && !shift {
            match &mut self.pending_run {
                Some(run) if run.code == code && run.count < u32::MAX => {
                    run.count += 1;
                }
                _ => {
                    self.commit_pending_run()?;
                    self.pending_run = Some(PendingRun { code, count: 1 });
                }
            }
            self.last_single = None;
            self.events_recorded += 1;
            return Ok(());
        }

        // Modifier keystrokes never merge; remember the record's window
        // span so an unflushed one can still be cancelled.
        self.commit_pending_run()?;
        let span = UnflushedSpan {
            cursor: self.buffer.write_cursor(),
            epoch: self.buffer.flush_epoch(),
        };
        put_event(&mut self.buffer, &Event::Keystroke { code, ctrl, shift })?;
        self.last_single = Some(span);
        self.events_recorded += 1;
        Ok(())
    }

    /// Retract the most recently recorded keystroke.
    ///
    /// Used when a keypress is withdrawn by input-method editing.
    /// Succeeds while the keystroke is still in the open run or in the
    /// unflushed window; returns `false` once its bytes are on disk or
    /// when the last record was not a single keystroke.
    pub fn cancel_keystroke(&mut self) -> bool {
        if let Some(run) = &mut self.pending_run {
            run.count -= 1;
            if run.count == 0 {
                self.pending_run = None;
            }
            self.events_recorded -= 1;
            return true;
        }
        if let Some(span) = self.last_single.take() {
            if self.buffer.rewind_to(span.cursor, span.epoch) {
                self.events_recorded -= 1;
                return true;
            }
        }
        false
    }

    /// Append the per-turn determinism checkpoint and give the buffer a
    /// chance to flush the batch of records accumulated this turn.
    pub fn record_rng_check(&mut self, turn: TurnId, draws: DrawCount) -> Result<(), LogError> {
        self.commit_pending_run()?;
        put_rng_check(&mut self.buffer, turn, draws)?;
        self.last_single = None;
        self.buffer.consider_flushing()
    }

    /// Flush everything buffered so far to the backing stream.
    pub fn flush(&mut self) -> Result<(), LogError> {
        self.commit_pending_run()?;
        self.last_single = None;
        self.buffer.flush()
    }

    /// Current length of the log in bytes, header included.
    pub fn stream_position(&self) -> u64 {
        let pending = match &self.pending_run {
            // An open run still owes the stream one record.
            Some(run) if run.count == 1 => 4,
            Some(_) => 7,
            None => 0,
        };
        self.buffer.stream_position() + pending
    }

    /// Consume the recorder and return the backing stream.
    ///
    /// Buffered bytes are discarded and the header keeps its zeroed
    /// counts; use [`finish`](Self::finish) to produce a playable log.
    pub fn into_inner(self) -> S {
        self.buffer.into_backing()
    }

    /// Encode the open run, if any, as a single record.
    fn commit_pending_run(&mut self) -> Result<(), LogError> {
        match self.pending_run.take() {
            None => Ok(()),
            Some(PendingRun { code, count: 1 }) => {
                let span = UnflushedSpan {
                    cursor: self.buffer.write_cursor(),
                    epoch: self.buffer.flush_epoch(),
                };
                put_event(&mut self.buffer, &Event::keystroke(code))?;
                self.last_single = Some(span);
                Ok(())
            }
            Some(PendingRun { code, count }) => {
                put_keystroke_run(&mut self.buffer, code, count)?;
                self.last_single = None;
                Ok(())
            }
        }
    }
}

impl<S: Write + Seek> Recorder<S> {
    /// Finish the recording: flush, rewrite the header with the final
    /// turn and level-change counts plus the true total length, and
    /// return the backing stream rewound to the start, ready to be
    /// reopened for playback.
    pub fn finish(mut self, turn_count: u32, max_level_changes: u32) -> Result<S, LogError> {
        self.flush()?;
        let total = self.buffer.stream_position();
        if total > u64::from(u32::MAX) {
            return Err(LogError::MalformedRecord {
                detail: format!("log length {total} exceeds the 4 GiB header field"),
            });
        }

        self.header.turn_count = turn_count;
        self.header.max_level_changes = max_level_changes;
        self.header.declared_length = total as u32;
        let header_bytes = encode_header(&self.header)?;

        let mut backing = self.buffer.into_backing();
        backing.seek(SeekFrom::Start(0))?;
        backing.write_all(&header_bytes)?;
        backing.flush()?;
        backing.seek(SeekFrom::Start(0))?;
        debug!(turns = turn_count, bytes = total, "finished recording");
        Ok(backing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MIN_WINDOW_CAPACITY;
    use crate::codec::{get_record, HEADER_LEN};
    use crate::types::{DeterminismRecord, Record};
    use reel_core::GameMode;
    use std::io::Cursor;

    fn test_header() -> SessionHeader {
        SessionHeader {
            version: "CE 1.9.3".into(),
            mode: GameMode::Standard,
            seed: 42,
            turn_count: 0,
            max_level_changes: 0,
            declared_length: 0,
        }
    }

    /// Finish a recorder and reopen the produced bytes as a raw record
    /// stream positioned after the header.
    fn records_of(recorder: Recorder<Cursor<Vec<u8>>>) -> Vec<Record> {
        let backing = recorder.finish(0, 0).unwrap();
        let bytes = backing.into_inner();
        let total = bytes.len() as u64;
        let mut buf = LogBuffer::for_reading(Cursor::new(bytes), 4096);
        buf.set_total_length(total);
        let mut skip = [0u8; HEADER_LEN];
        buf.get_exact(&mut skip).unwrap();

        let mut records = Vec::new();
        while buf.stream_position() < total {
            records.push(get_record(&mut buf).unwrap());
        }
        records
    }

    #[test]
    fn identical_simple_keystrokes_merge_into_a_run() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        for _ in 0..5 {
            rec.record_keystroke(KeyCode(10), false, false).unwrap();
        }
        rec.record_keystroke(KeyCode(11), false, false).unwrap();
        assert_eq!(rec.events_recorded(), 6);

        assert_eq!(
            records_of(rec),
            vec![
                Record::KeystrokeRun {
                    code: KeyCode(10),
                    count: 5
                },
                Record::Event(Event::keystroke(KeyCode(11))),
            ]
        );
    }

    #[test]
    fn modifier_keystrokes_never_merge() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), true, false).unwrap();
        rec.record_keystroke(KeyCode(10), true, false).unwrap();

        assert_eq!(
            records_of(rec),
            vec![
                Record::Event(Event::Keystroke {
                    code: KeyCode(10),
                    ctrl: true,
                    shift: false
                });
                2
            ]
        );
    }

    #[test]
    fn non_keystroke_event_closes_the_run() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_event(Event::MouseDown { x: 3, y: 7 }).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();

        assert_eq!(
            records_of(rec),
            vec![
                Record::KeystrokeRun {
                    code: KeyCode(10),
                    count: 2
                },
                Record::Event(Event::MouseDown { x: 3, y: 7 }),
                Record::Event(Event::keystroke(KeyCode(10))),
            ]
        );
    }

    #[test]
    fn rng_check_closes_the_run_and_is_interleaved() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_rng_check(TurnId(1), DrawCount(3)).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_rng_check(TurnId(2), DrawCount(5)).unwrap();

        assert_eq!(
            records_of(rec),
            vec![
                Record::Event(Event::keystroke(KeyCode(10))),
                Record::RngCheck(DeterminismRecord {
                    turn: TurnId(1),
                    draws: DrawCount(3)
                }),
                Record::Event(Event::keystroke(KeyCode(10))),
                Record::RngCheck(DeterminismRecord {
                    turn: TurnId(2),
                    draws: DrawCount(5)
                }),
            ]
        );
    }

    #[test]
    fn cancel_pops_the_open_run() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        assert!(rec.cancel_keystroke());
        assert_eq!(rec.events_recorded(), 1);

        assert_eq!(
            records_of(rec),
            vec![Record::Event(Event::keystroke(KeyCode(10)))]
        );
    }

    #[test]
    fn cancel_drains_a_single_keystroke_entirely() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        assert!(rec.cancel_keystroke());
        assert!(!rec.cancel_keystroke(), "nothing left to cancel");
        assert_eq!(records_of(rec), vec![]);
    }

    #[test]
    fn cancel_rewinds_an_unflushed_modifier_keystroke() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), true, false).unwrap();
        assert!(rec.cancel_keystroke());
        assert_eq!(records_of(rec), vec![]);
    }

    #[test]
    fn cancel_refuses_once_bytes_are_flushed() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), true, false).unwrap();
        rec.flush().unwrap();
        assert!(!rec.cancel_keystroke());

        assert_eq!(
            records_of(rec),
            vec![Record::Event(Event::Keystroke {
                code: KeyCode(10),
                ctrl: true,
                shift: false
            })]
        );
    }

    #[test]
    fn cancel_refuses_after_a_non_keystroke_record() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), true, false).unwrap();
        rec.record_event(Event::SavedGameLoaded).unwrap();
        assert!(!rec.cancel_keystroke());
    }

    #[test]
    fn finish_rewrites_header_with_final_counts() {
        let mut rec = Recorder::new(Cursor::new(Vec::new()), test_header(), 4096).unwrap();
        rec.record_keystroke(KeyCode(10), false, false).unwrap();
        rec.record_rng_check(TurnId(1), DrawCount(1)).unwrap();
        let bytes = rec.finish(1, 4).unwrap().into_inner();

        let header =
            crate::codec::decode_header(bytes[..HEADER_LEN].try_into().unwrap()).unwrap();
        assert_eq!(header.turn_count, 1);
        assert_eq!(header.max_level_changes, 4);
        assert_eq!(u64::from(header.declared_length), bytes.len() as u64);
    }

    #[test]
    fn tiny_window_recording_still_produces_a_valid_stream() {
        let mut rec =
            Recorder::new(Cursor::new(Vec::new()), test_header(), MIN_WINDOW_CAPACITY).unwrap();
        for i in 0..100u16 {
            rec.record_keystroke(KeyCode(i), false, false).unwrap();
        }
        let records = records_of(rec);
        assert_eq!(records.len(), 100);
    }
}
