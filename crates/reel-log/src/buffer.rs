//! The streaming byte window between the codec and the disk.
//!
//! [`LogBuffer`] owns a fixed-capacity window plus the backing stream.
//! Writers fill the window and it flushes itself when full; readers
//! drain the window and it refills itself when empty. Every other
//! component touches only the in-memory window — all disk I/O lives
//! here.
//!
//! The buffer is generic over the backing stream, with trait bounds
//! applied per operation: a write-mode buffer only needs `Write`, a
//! read-mode buffer only needs `Read`, and only the one-time
//! read-to-append switch needs `Seek`.

use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::trace;

use crate::error::LogError;

/// Default window capacity in bytes.
pub const DEFAULT_WINDOW_CAPACITY: usize = 64 * 1024;

/// Smallest usable window capacity.
///
/// Must hold the header and the largest single record with room to
/// spare; anything smaller degenerates into one syscall per byte.
pub const MIN_WINDOW_CAPACITY: usize = 64;

/// Headroom [`LogBuffer::consider_flushing`] keeps free: one maximum
/// record (a determinism checkpoint is opcode + u32 + u64 = 13 bytes).
pub(crate) const RECORD_HEADROOM: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    /// Write mode: the caller fills the window, flushes drain it to disk.
    Filling,
    /// Read mode: refills fill the window, the caller drains it.
    Draining,
}

/// Fixed-capacity byte window over a backing stream.
///
/// Maintains the invariant `0 <= cursor <= capacity`: a full window
/// always flushes (write mode) or refills (read mode) before further
/// access. `stream_position()` reports the cumulative bytes produced
/// or consumed since the start of the file, which is what progress
/// reporting and forward seeking work in.
#[derive(Debug)]
pub struct LogBuffer<S> {
    window: Vec<u8>,
    /// Write mode: bytes appended and not yet flushed.
    /// Read mode: bytes loaded by the last refill.
    write_cursor: usize,
    /// Read mode only: bytes consumed from the window.
    read_cursor: usize,
    /// Cumulative bytes flushed to / refilled from the backing stream.
    base_position: u64,
    /// Declared total log length, once known.
    total_length: Option<u64>,
    /// Incremented on every flush; invalidates unflushed-span references.
    flush_epoch: u64,
    direction: Direction,
    backing: S,
}

impl<S> LogBuffer<S> {
    /// Create a write-mode buffer over an empty backing stream.
    ///
    /// Capacities below [`MIN_WINDOW_CAPACITY`] are clamped up to it.
    pub fn for_writing(backing: S, capacity: usize) -> Self {
        Self {
            window: vec![0; capacity.max(MIN_WINDOW_CAPACITY)],
            write_cursor: 0,
            read_cursor: 0,
            base_position: 0,
            total_length: None,
            flush_epoch: 0,
            direction: Direction::Filling,
            backing,
        }
    }

    /// Create a read-mode buffer positioned at the start of the stream.
    ///
    /// Capacities below [`MIN_WINDOW_CAPACITY`] are clamped up to it.
    pub fn for_reading(backing: S, capacity: usize) -> Self {
        Self {
            window: vec![0; capacity.max(MIN_WINDOW_CAPACITY)],
            write_cursor: 0,
            read_cursor: 0,
            base_position: 0,
            total_length: None,
            flush_epoch: 0,
            direction: Direction::Draining,
            backing,
        }
    }

    /// Cumulative bytes produced (write mode) or consumed (read mode)
    /// since the start of the stream.
    pub fn stream_position(&self) -> u64 {
        match self.direction {
            Direction::Filling => self.base_position + self.write_cursor as u64,
            Direction::Draining => self.base_position + self.read_cursor as u64,
        }
    }

    /// Declared total length of the log, once known.
    pub fn total_length(&self) -> Option<u64> {
        self.total_length
    }

    /// Declare the total log length (read mode, from the decoded header).
    pub fn set_total_length(&mut self, length: u64) {
        self.total_length = Some(length);
    }

    /// Fraction of the declared length consumed so far, if known.
    pub fn progress(&self) -> Option<f64> {
        self.total_length
            .filter(|&t| t > 0)
            .map(|t| self.stream_position() as f64 / t as f64)
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    /// Current write cursor within the window.
    ///
    /// Paired with [`flush_epoch`](Self::flush_epoch) to reference the
    /// start of a just-appended record for [`rewind_to`](Self::rewind_to).
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Flush generation counter; bumped on every flush.
    pub fn flush_epoch(&self) -> u64 {
        self.flush_epoch
    }

    /// Consume the buffer and return the backing stream.
    ///
    /// Unflushed window bytes are discarded; call
    /// [`flush`](Self::flush) first in write mode.
    pub fn into_backing(self) -> S {
        self.backing
    }
}

// ── Write mode ──────────────────────────────────────────────────

impl<S: Write> LogBuffer<S> {
    /// Append one byte, flushing first if the window is full.
    pub fn put_byte(&mut self, byte: u8) -> Result<(), LogError> {
        debug_assert_eq!(self.direction, Direction::Filling);
        if self.write_cursor == self.window.len() {
            self.flush()?;
        }
        self.window[self.write_cursor] = byte;
        self.write_cursor += 1;
        Ok(())
    }

    /// Append a byte slice, flushing as many times as the window requires.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        debug_assert_eq!(self.direction, Direction::Filling);
        let mut written = 0;
        while written < bytes.len() {
            if self.write_cursor == self.window.len() {
                self.flush()?;
            }
            let n = (self.window.len() - self.write_cursor).min(bytes.len() - written);
            self.window[self.write_cursor..self.write_cursor + n]
                .copy_from_slice(&bytes[written..written + n]);
            self.write_cursor += n;
            written += n;
        }
        Ok(())
    }

    /// Write the filled portion of the window to the backing stream.
    ///
    /// I/O failures (disk full, permission lost) propagate from here
    /// synchronously; the buffer does not accept further writes past a
    /// failed flush in any useful way, since the session treats the
    /// error as terminal.
    pub fn flush(&mut self) -> Result<(), LogError> {
        debug_assert_eq!(self.direction, Direction::Filling);
        if self.write_cursor == 0 {
            return Ok(());
        }
        self.backing.write_all(&self.window[..self.write_cursor])?;
        self.backing.flush()?;
        trace!(
            bytes = self.write_cursor,
            position = self.base_position,
            "flushed window"
        );
        self.base_position += self.write_cursor as u64;
        self.write_cursor = 0;
        self.flush_epoch += 1;
        Ok(())
    }

    /// Flush if fewer than one maximum record of headroom remains.
    ///
    /// Lets callers batch several logical writes into one flush without
    /// violating the full-window invariant mid-record.
    pub fn consider_flushing(&mut self) -> Result<(), LogError> {
        if self.write_cursor + RECORD_HEADROOM >= self.window.len() {
            self.flush()?;
        }
        Ok(())
    }

    /// Roll the write cursor back to `cursor`, dropping bytes appended
    /// since, provided no flush has happened in between.
    ///
    /// Returns `false` when the epoch does not match — the bytes are
    /// already on disk and cannot be removed.
    pub fn rewind_to(&mut self, cursor: usize, epoch: u64) -> bool {
        debug_assert_eq!(self.direction, Direction::Filling);
        if epoch == self.flush_epoch && cursor <= self.write_cursor {
            self.write_cursor = cursor;
            true
        } else {
            false
        }
    }
}

// ── Read mode ───────────────────────────────────────────────────

impl<S: Read> LogBuffer<S> {
    /// Consume one byte, refilling first if the window is drained.
    pub fn get_byte(&mut self) -> Result<u8, LogError> {
        debug_assert_eq!(self.direction, Direction::Draining);
        if self.read_cursor == self.write_cursor {
            self.refill()?;
        }
        let byte = self.window[self.read_cursor];
        self.read_cursor += 1;
        Ok(byte)
    }

    /// Fill `out` exactly, refilling as many times as needed.
    pub fn get_exact(&mut self, out: &mut [u8]) -> Result<(), LogError> {
        debug_assert_eq!(self.direction, Direction::Draining);
        let mut filled = 0;
        while filled < out.len() {
            if self.read_cursor == self.write_cursor {
                self.refill()?;
            }
            let n = (self.write_cursor - self.read_cursor).min(out.len() - filled);
            out[filled..filled + n]
                .copy_from_slice(&self.window[self.read_cursor..self.read_cursor + n]);
            self.read_cursor += n;
            filled += n;
        }
        Ok(())
    }

    /// Load the next chunk of the stream into the window.
    ///
    /// A zero-byte read here means the file is shorter than its declared
    /// length — the log is untrustworthy beyond this point.
    fn refill(&mut self) -> Result<(), LogError> {
        debug_assert_eq!(self.read_cursor, self.write_cursor);
        self.base_position += self.write_cursor as u64;
        self.write_cursor = 0;
        self.read_cursor = 0;
        loop {
            match self.backing.read(&mut self.window) {
                Ok(0) => {
                    return Err(LogError::UnexpectedEndOfStream {
                        position: self.base_position,
                        declared: self.total_length,
                    })
                }
                Ok(n) => {
                    trace!(bytes = n, position = self.base_position, "refilled window");
                    self.write_cursor = n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LogError::Io(e)),
            }
        }
    }
}

// ── Read-to-append transition ───────────────────────────────────

impl<S: Seek> LogBuffer<S> {
    /// Switch a fully drained read-mode buffer into write mode,
    /// positioned to append at the current stream position.
    ///
    /// Used exactly once per session, when an exhausted playback
    /// continues as a live recording. The backing stream is seeked to
    /// the consumed position so bytes the window read ahead of it are
    /// not overwritten or duplicated.
    pub fn begin_appending(&mut self) -> Result<(), LogError> {
        debug_assert_eq!(self.direction, Direction::Draining);
        let position = self.stream_position();
        self.backing.seek(SeekFrom::Start(position))?;
        self.base_position = position;
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.total_length = None;
        self.direction = Direction::Filling;
        self.flush_epoch += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_then_read_across_window_boundary() {
        // Window far smaller than the payload: forces several flushes
        // on the way out and several refills on the way back.
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        let mut buf = LogBuffer::for_writing(Cursor::new(Vec::new()), MIN_WINDOW_CAPACITY);
        buf.put_bytes(&payload).unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.stream_position(), 1000);

        let stored = buf.into_backing().into_inner();
        assert_eq!(stored, payload);

        let mut buf = LogBuffer::for_reading(Cursor::new(stored), MIN_WINDOW_CAPACITY);
        buf.set_total_length(1000);
        let mut out = vec![0u8; 1000];
        buf.get_exact(&mut out).unwrap();
        assert_eq!(out, payload);
        assert_eq!(buf.stream_position(), 1000);
    }

    #[test]
    fn single_bytes_roundtrip() {
        let mut buf = LogBuffer::for_writing(Cursor::new(Vec::new()), MIN_WINDOW_CAPACITY);
        for i in 0..200u8 {
            buf.put_byte(i).unwrap();
        }
        buf.flush().unwrap();

        let mut buf = LogBuffer::for_reading(
            Cursor::new(buf.into_backing().into_inner()),
            MIN_WINDOW_CAPACITY,
        );
        for i in 0..200u8 {
            assert_eq!(buf.get_byte().unwrap(), i);
        }
    }

    #[test]
    fn short_stream_is_unexpected_end() {
        let mut buf = LogBuffer::for_reading(Cursor::new(vec![1u8, 2, 3]), MIN_WINDOW_CAPACITY);
        buf.set_total_length(10);
        let mut out = [0u8; 5];
        let err = buf.get_exact(&mut out).unwrap_err();
        match err {
            LogError::UnexpectedEndOfStream { position, declared } => {
                assert_eq!(position, 3);
                assert_eq!(declared, Some(10));
            }
            other => panic!("expected UnexpectedEndOfStream, got {other:?}"),
        }
    }

    #[test]
    fn rewind_within_window_succeeds() {
        let mut buf = LogBuffer::for_writing(Cursor::new(Vec::new()), MIN_WINDOW_CAPACITY);
        buf.put_bytes(&[1, 2, 3]).unwrap();
        let mark = buf.write_cursor();
        let epoch = buf.flush_epoch();
        buf.put_bytes(&[4, 5]).unwrap();

        assert!(buf.rewind_to(mark, epoch));
        buf.flush().unwrap();
        assert_eq!(buf.into_backing().into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn rewind_after_flush_is_refused() {
        let mut buf = LogBuffer::for_writing(Cursor::new(Vec::new()), MIN_WINDOW_CAPACITY);
        buf.put_bytes(&[1, 2, 3]).unwrap();
        let mark = buf.write_cursor();
        let epoch = buf.flush_epoch();
        buf.put_bytes(&[4, 5]).unwrap();
        buf.flush().unwrap();

        assert!(!buf.rewind_to(mark, epoch));
        assert_eq!(buf.into_backing().into_inner(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn consider_flushing_only_flushes_near_capacity() {
        let mut buf = LogBuffer::for_writing(Cursor::new(Vec::new()), MIN_WINDOW_CAPACITY);
        buf.put_bytes(&[0; 8]).unwrap();
        buf.consider_flushing().unwrap();
        assert_eq!(buf.flush_epoch(), 0, "plenty of headroom, no flush");

        buf.put_bytes(&[0; MIN_WINDOW_CAPACITY - RECORD_HEADROOM]).unwrap();
        buf.consider_flushing().unwrap();
        assert_eq!(buf.flush_epoch(), 1, "within headroom of full, flushed");
    }

    #[test]
    fn progress_tracks_declared_length() {
        let data = vec![0u8; 100];
        let mut buf = LogBuffer::for_reading(Cursor::new(data), MIN_WINDOW_CAPACITY);
        assert_eq!(buf.progress(), None);
        buf.set_total_length(100);

        let mut out = [0u8; 50];
        buf.get_exact(&mut out).unwrap();
        let progress = buf.progress().unwrap();
        assert!((progress - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn begin_appending_continues_at_consumed_position() {
        let mut buf = LogBuffer::for_reading(Cursor::new(vec![9u8, 9, 9, 9]), MIN_WINDOW_CAPACITY);
        buf.set_total_length(4);
        let mut out = [0u8; 4];
        buf.get_exact(&mut out).unwrap();

        buf.begin_appending().unwrap();
        assert_eq!(buf.stream_position(), 4);
        buf.put_bytes(&[7, 7]).unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.into_backing().into_inner(), vec![9, 9, 9, 9, 7, 7]);
    }
}
