//! Binary encode/decode for the log format.
//!
//! All integers are little-endian with no padding. Records are an
//! opcode byte followed by a fixed payload; the header is a fixed
//! 37-byte block. The format is intentionally simple — no compression
//! beyond keystroke runs, no alignment, no self-describing schema.

use std::io::{Read, Write};

use reel_core::{DrawCount, Event, GameMode, KeyCode, TurnId};

use crate::buffer::LogBuffer;
use crate::error::LogError;
use crate::types::*;

/// Width of the NUL-padded version field at the start of the header.
pub const VERSION_FIELD_LEN: usize = 16;

/// Total header length in bytes:
/// version field + mode byte + seed + turns + level changes + length.
pub const HEADER_LEN: usize = VERSION_FIELD_LEN + 1 + 8 + 4 + 4 + 4;

/// Keystroke modifier bit: control held.
const FLAG_CTRL: u8 = 0b0000_0001;
/// Keystroke modifier bit: shift held.
const FLAG_SHIFT: u8 = 0b0000_0010;

// ── Fixed-width integers ────────────────────────────────────────

/// Declared byte width for an integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntWidth {
    /// One byte.
    W1,
    /// Two bytes.
    W2,
    /// Four bytes.
    W4,
    /// Eight bytes.
    W8,
}

impl IntWidth {
    /// Number of bytes this width occupies on the wire.
    pub fn bytes(self) -> usize {
        match self {
            Self::W1 => 1,
            Self::W2 => 2,
            Self::W4 => 4,
            Self::W8 => 8,
        }
    }

    /// Largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            Self::W8 => u64::MAX,
            w => (1u64 << (w.bytes() * 8)) - 1,
        }
    }
}

/// Write `value` at the declared width, little-endian.
///
/// A value out of range for the width is a caller bug and fails as
/// [`LogError::MalformedRecord`] rather than truncating silently.
pub fn put_uint<S: Write>(
    buf: &mut LogBuffer<S>,
    value: u64,
    width: IntWidth,
) -> Result<(), LogError> {
    if value > width.max_value() {
        return Err(LogError::MalformedRecord {
            detail: format!("value {value} does not fit in {} bytes", width.bytes()),
        });
    }
    buf.put_bytes(&value.to_le_bytes()[..width.bytes()])
}

/// Read an integer at the declared width, little-endian.
pub fn get_uint<S: Read>(buf: &mut LogBuffer<S>, width: IntWidth) -> Result<u64, LogError> {
    let mut raw = [0u8; 8];
    buf.get_exact(&mut raw[..width.bytes()])?;
    Ok(u64::from_le_bytes(raw))
}

// ── Event records ───────────────────────────────────────────────

/// Encode a single event record.
pub fn put_event<S: Write>(buf: &mut LogBuffer<S>, event: &Event) -> Result<(), LogError> {
    match *event {
        Event::Keystroke { code, ctrl, shift } => {
            buf.put_byte(OP_KEYSTROKE)?;
            put_uint(buf, u64::from(code.0), IntWidth::W2)?;
            let mut flags = 0u8;
            if ctrl {
                flags |= FLAG_CTRL;
            }
            if shift {
                flags |= FLAG_SHIFT;
            }
            buf.put_byte(flags)
        }
        Event::MouseDown { x, y } => {
            buf.put_byte(OP_MOUSE_DOWN)?;
            put_uint(buf, u64::from(x as u16), IntWidth::W2)?;
            put_uint(buf, u64::from(y as u16), IntWidth::W2)
        }
        Event::MouseUp { x, y } => {
            buf.put_byte(OP_MOUSE_UP)?;
            put_uint(buf, u64::from(x as u16), IntWidth::W2)?;
            put_uint(buf, u64::from(y as u16), IntWidth::W2)
        }
        Event::SavedGameLoaded => buf.put_byte(OP_SAVED_GAME_LOADED),
        Event::SwitchedToLive => buf.put_byte(OP_SWITCHED_TO_LIVE),
    }
}

/// Encode a compressed run of `count` identical modifier-free keystrokes.
pub fn put_keystroke_run<S: Write>(
    buf: &mut LogBuffer<S>,
    code: KeyCode,
    count: u32,
) -> Result<(), LogError> {
    debug_assert!(count >= 2, "single keystrokes use OP_KEYSTROKE");
    buf.put_byte(OP_KEYSTROKE_RUN)?;
    put_uint(buf, u64::from(code.0), IntWidth::W2)?;
    put_uint(buf, u64::from(count), IntWidth::W4)
}

/// Encode a determinism checkpoint record.
pub fn put_rng_check<S: Write>(
    buf: &mut LogBuffer<S>,
    turn: TurnId,
    draws: DrawCount,
) -> Result<(), LogError> {
    buf.put_byte(OP_RNG_CHECK)?;
    put_uint(buf, u64::from(turn.0), IntWidth::W4)?;
    put_uint(buf, draws.0, IntWidth::W8)
}

/// Decode the next record from the stream.
///
/// The opcode set is closed: anything outside it is
/// [`LogError::UnknownOpcode`], and a flags byte with undeclared bits
/// set fails as [`LogError::MalformedRecord`]. Both mean the stream
/// and this build disagree about the format, which is terminal.
pub fn get_record<S: Read>(buf: &mut LogBuffer<S>) -> Result<Record, LogError> {
    let opcode = buf.get_byte()?;
    match opcode {
        OP_KEYSTROKE => {
            let code = KeyCode(get_uint(buf, IntWidth::W2)? as u16);
            let flags = buf.get_byte()?;
            if flags & !(FLAG_CTRL | FLAG_SHIFT) != 0 {
                return Err(LogError::MalformedRecord {
                    detail: format!("undeclared keystroke modifier bits {flags:#04x}"),
                });
            }
            Ok(Record::Event(Event::Keystroke {
                code,
                ctrl: flags & FLAG_CTRL != 0,
                shift: flags & FLAG_SHIFT != 0,
            }))
        }
        OP_KEYSTROKE_RUN => {
            let code = KeyCode(get_uint(buf, IntWidth::W2)? as u16);
            let count = get_uint(buf, IntWidth::W4)? as u32;
            if count == 0 {
                return Err(LogError::MalformedRecord {
                    detail: "keystroke run with zero count".into(),
                });
            }
            Ok(Record::KeystrokeRun { code, count })
        }
        OP_MOUSE_DOWN => {
            let x = get_uint(buf, IntWidth::W2)? as u16 as i16;
            let y = get_uint(buf, IntWidth::W2)? as u16 as i16;
            Ok(Record::Event(Event::MouseDown { x, y }))
        }
        OP_MOUSE_UP => {
            let x = get_uint(buf, IntWidth::W2)? as u16 as i16;
            let y = get_uint(buf, IntWidth::W2)? as u16 as i16;
            Ok(Record::Event(Event::MouseUp { x, y }))
        }
        OP_SAVED_GAME_LOADED => Ok(Record::Event(Event::SavedGameLoaded)),
        OP_SWITCHED_TO_LIVE => Ok(Record::Event(Event::SwitchedToLive)),
        OP_RNG_CHECK => {
            let turn = TurnId(get_uint(buf, IntWidth::W4)? as u32);
            let draws = DrawCount(get_uint(buf, IntWidth::W8)?);
            Ok(Record::RngCheck(DeterminismRecord { turn, draws }))
        }
        opcode => Err(LogError::UnknownOpcode { opcode }),
    }
}

// ── Header ──────────────────────────────────────────────────────

/// Lay out a header as its fixed 37-byte wire form.
///
/// Fails when the version string cannot fit the NUL-padded field.
pub fn encode_header(header: &SessionHeader) -> Result<[u8; HEADER_LEN], LogError> {
    let version = header.version.as_bytes();
    if version.len() >= VERSION_FIELD_LEN {
        return Err(LogError::HeaderMismatch {
            detail: format!(
                "version string is {} bytes, field holds at most {}",
                version.len(),
                VERSION_FIELD_LEN - 1
            ),
        });
    }
    if version.contains(&0) {
        return Err(LogError::HeaderMismatch {
            detail: "version string contains a NUL byte".into(),
        });
    }

    let mut out = [0u8; HEADER_LEN];
    out[..version.len()].copy_from_slice(version);
    let mut at = VERSION_FIELD_LEN;
    out[at] = header.mode.as_byte();
    at += 1;
    out[at..at + 8].copy_from_slice(&header.seed.to_le_bytes());
    at += 8;
    out[at..at + 4].copy_from_slice(&header.turn_count.to_le_bytes());
    at += 4;
    out[at..at + 4].copy_from_slice(&header.max_level_changes.to_le_bytes());
    at += 4;
    out[at..at + 4].copy_from_slice(&header.declared_length.to_le_bytes());
    Ok(out)
}

/// Parse a header from its fixed wire form.
///
/// Fails closed: any deviation from the expected layout — an
/// unterminated or non-UTF-8 version field, stray bytes in the NUL
/// padding, an unknown mode byte — is [`LogError::HeaderMismatch`],
/// which the session layer treats as a version incompatibility.
pub fn decode_header(bytes: &[u8; HEADER_LEN]) -> Result<SessionHeader, LogError> {
    let field = &bytes[..VERSION_FIELD_LEN];
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| LogError::HeaderMismatch {
            detail: "version field is not NUL-terminated".into(),
        })?;
    if field[end..].iter().any(|&b| b != 0) {
        return Err(LogError::HeaderMismatch {
            detail: "stray bytes after the version terminator".into(),
        });
    }
    let version = std::str::from_utf8(&field[..end])
        .map_err(|_| LogError::HeaderMismatch {
            detail: "version field is not UTF-8".into(),
        })?
        .to_string();

    let mut at = VERSION_FIELD_LEN;
    let mode_byte = bytes[at];
    let mode = GameMode::from_byte(mode_byte).ok_or_else(|| LogError::HeaderMismatch {
        detail: format!("unknown game mode byte {mode_byte:#04x}"),
    })?;
    at += 1;
    let seed = u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());
    at += 8;
    let turn_count = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
    at += 4;
    let max_level_changes = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
    at += 4;
    let declared_length = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());

    Ok(SessionHeader {
        version,
        mode,
        seed,
        turn_count,
        max_level_changes,
        declared_length,
    })
}
