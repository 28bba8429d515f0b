//! The input event sum type consumed and produced by the log.

use std::fmt;

/// Platform-independent key code.
///
/// The game layer maps physical keys to these codes before recording;
/// the engine never interprets them beyond equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for KeyCode {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// A single logical input event.
///
/// Events are values — no shared references — and are consumed exactly
/// once by the simulation layer. The set is closed: the log decodes
/// exhaustively into these variants, and an unrecognized opcode is a
/// declared error, never a silent skip.
///
/// # Examples
///
/// ```
/// use reel_core::{Event, KeyCode};
///
/// let e = Event::keystroke(KeyCode(b'a' as u16));
/// assert!(e.is_simple_keystroke());
///
/// let e = Event::Keystroke { code: KeyCode(b'a' as u16), ctrl: true, shift: false };
/// assert!(!e.is_simple_keystroke());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A key press with modifier state.
    Keystroke {
        /// The key that was pressed.
        code: KeyCode,
        /// Control modifier held.
        ctrl: bool,
        /// Shift modifier held.
        shift: bool,
    },
    /// Mouse button pressed at a cell coordinate.
    MouseDown {
        /// Column of the cell under the cursor.
        x: i16,
        /// Row of the cell under the cursor.
        y: i16,
    },
    /// Mouse button released at a cell coordinate.
    MouseUp {
        /// Column of the cell under the cursor.
        x: i16,
        /// Row of the cell under the cursor.
        y: i16,
    },
    /// Marker: a saved game was loaded at this point in the stream.
    SavedGameLoaded,
    /// Marker: playback ended here and the session continued as a live
    /// recording. Appears at most once per log.
    SwitchedToLive,
}

impl Event {
    /// Construct a keystroke with no modifiers.
    pub fn keystroke(code: KeyCode) -> Self {
        Self::Keystroke {
            code,
            ctrl: false,
            shift: false,
        }
    }

    /// Whether this is a modifier-free keystroke.
    ///
    /// Only simple keystrokes participate in run compression; a run of
    /// N identical simple keystrokes collapses to one `(code, N)` record.
    pub fn is_simple_keystroke(&self) -> bool {
        matches!(
            self,
            Self::Keystroke {
                ctrl: false,
                shift: false,
                ..
            }
        )
    }
}
