//! Lazy reader for the annotation sidecar file.
//!
//! Annotations are display-only commentary attached to turns of a
//! recording, stored next to the log as plain `turn<TAB>text` lines in
//! ascending turn order. They are consulted only during playback and
//! have no effect on the determinism contract.

use std::io::{self, BufRead};

use tracing::warn;

use reel_core::TurnId;

/// One line of the sidecar file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// Turn the annotation is attached to.
    pub turn: TurnId,
    /// The annotation text.
    pub text: String,
}

/// Pulls annotations from a sidecar stream as playback reaches them.
///
/// Reads one line ahead at most; the file is never loaded whole.
/// Malformed lines are skipped with a warning rather than failing the
/// playback they decorate.
pub struct AnnotationReader<R> {
    source: R,
    pending: Option<Annotation>,
    done: bool,
}

impl<R: BufRead> AnnotationReader<R> {
    /// Create a reader over a sidecar stream.
    pub fn new(source: R) -> Self {
        Self {
            source,
            pending: None,
            done: false,
        }
    }

    /// The next annotation whose turn is at or before `turn`, if any.
    ///
    /// Call once per displayed turn; repeated calls drain multiple
    /// annotations attached to the same turn one at a time.
    pub fn next_for_turn(&mut self, turn: TurnId) -> io::Result<Option<Annotation>> {
        if self.pending.is_none() {
            self.pending = self.read_next()?;
        }
        match &self.pending {
            Some(annotation) if annotation.turn <= turn => Ok(self.pending.take()),
            _ => Ok(None),
        }
    }

    /// Read lines until one parses or the stream ends.
    fn read_next(&mut self) -> io::Result<Option<Annotation>> {
        while !self.done {
            let mut line = String::new();
            if self.source.read_line(&mut line)? == 0 {
                self.done = true;
                break;
            }
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            match parse_line(trimmed) {
                Some(annotation) => return Ok(Some(annotation)),
                None => warn!(line = trimmed, "skipping malformed annotation line"),
            }
        }
        Ok(None)
    }
}

fn parse_line(line: &str) -> Option<Annotation> {
    let (turn, text) = line.split_once('\t')?;
    let turn = turn.parse().ok()?;
    Some(Annotation {
        turn: TurnId(turn),
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(s: &str) -> AnnotationReader<&[u8]> {
        AnnotationReader::new(s.as_bytes())
    }

    #[test]
    fn annotations_surface_at_their_turn() {
        let mut r = reader("3\tfound the sword\n10\tdied here\n");

        assert_eq!(r.next_for_turn(TurnId(1)).unwrap(), None);
        assert_eq!(
            r.next_for_turn(TurnId(3)).unwrap(),
            Some(Annotation {
                turn: TurnId(3),
                text: "found the sword".into()
            })
        );
        assert_eq!(r.next_for_turn(TurnId(5)).unwrap(), None);
        assert_eq!(
            r.next_for_turn(TurnId(12)).unwrap(),
            Some(Annotation {
                turn: TurnId(10),
                text: "died here".into()
            })
        );
        assert_eq!(r.next_for_turn(TurnId(100)).unwrap(), None);
    }

    #[test]
    fn same_turn_annotations_drain_one_at_a_time() {
        let mut r = reader("4\tfirst\n4\tsecond\n");
        assert_eq!(r.next_for_turn(TurnId(4)).unwrap().unwrap().text, "first");
        assert_eq!(r.next_for_turn(TurnId(4)).unwrap().unwrap().text, "second");
        assert_eq!(r.next_for_turn(TurnId(4)).unwrap(), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut r = reader("not a turn\n\n7\tok\n");
        assert_eq!(r.next_for_turn(TurnId(7)).unwrap().unwrap().text, "ok");
    }

    #[test]
    fn tab_in_text_is_preserved() {
        let mut r = reader("2\ta\tb\n");
        assert_eq!(r.next_for_turn(TurnId(2)).unwrap().unwrap().text, "a\tb");
    }
}
