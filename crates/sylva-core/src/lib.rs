//! Core data structures for the sylva parsing runtime.
//!
//! Two layers:
//! - **Raw layer**: serde-friendly descriptor structs, 1:1 with the
//!   on-disk descriptor layout (JSON or postcard binary)
//! - **Compiled layer**: validated [`Language`] with hash-indexed
//!   action/goto lookups for the parser driver
//!
//! The runtime crates never consume a raw descriptor directly; every
//! descriptor passes through [`Language::from_raw`] validation first.

pub mod language;
pub mod scanner;

pub use language::{
    ActionEntry, ActionKind, AliasInfo, CharacterSet, DecodeError, GotoEntry, Language,
    LanguageError, LexState, LexTransition, ParseAction, Production, RawLanguage, SymbolInfo,
};
pub use scanner::{ProgramError, RuneClass, ScannerInstr, ScannerOp, ScannerProgram};

use serde::{Deserialize, Serialize};

/// Grammar symbol identifier. Terminals occupy the low ids.
pub type Symbol = u16;

/// Parse-table state identifier. States are dense and 0-based.
pub type StateId = u16;

/// Field identifier naming a child slot within a production. 0 means
/// "no field".
pub type FieldId = u16;

/// Production (grammar rule) identifier.
pub type ProductionId = u16;

/// Symbol 0 is the end-of-input sentinel in every descriptor.
pub const EOF: Symbol = 0;

/// Emitted by lexers for bytes no rule accepts. Never present in a
/// parse table, so the driver's recovery path handles it.
pub const ERROR_SENTINEL: Symbol = u16::MAX;

/// A row/column position. Columns count bytes and reset at `\n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// One lexed token. `text` borrows the source buffer the token source
/// was built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub symbol: Symbol,
    pub start_byte: u32,
    pub end_byte: u32,
    pub start_point: Point,
    pub end_point: Point,
    pub text: &'s [u8],
}

impl<'s> Token<'s> {
    /// End-of-input token at `offset`/`point`.
    pub fn eof(offset: u32, point: Point) -> Self {
        Self {
            symbol: EOF,
            start_byte: offset,
            end_byte: offset,
            start_point: point,
            end_point: point,
            text: &[],
        }
    }

    pub fn is_eof(&self) -> bool {
        self.symbol == EOF
    }
}

/// A replacement of the byte range `[start_byte, old_end_byte)` with
/// `new_end_byte - start_byte` new bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEdit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// Signed byte delta applied to positions at or after `old_end_byte`.
    pub fn byte_delta(&self) -> i64 {
        i64::from(self.new_end_byte) - i64::from(self.old_end_byte)
    }

    /// Shift a byte offset at or after the replaced range.
    pub fn shift_byte(&self, byte: u32) -> u32 {
        (i64::from(byte) + self.byte_delta()).max(0) as u32
    }

    /// Shift a point at or after the replaced range. Points on the same
    /// row as the old end keep their column distance from the new end.
    pub fn shift_point(&self, point: Point) -> Point {
        if point.row == self.old_end_point.row {
            Point {
                row: self.new_end_point.row,
                column: self.new_end_point.column + (point.column - self.old_end_point.column),
            }
        } else {
            Point {
                row: self.new_end_point.row + (point.row - self.old_end_point.row),
                column: point.column,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_token_is_zero_width() {
        let tok = Token::eof(7, Point::new(1, 2));
        assert!(tok.is_eof());
        assert_eq!(tok.start_byte, tok.end_byte);
        assert_eq!(tok.start_point, tok.end_point);
        assert!(tok.text.is_empty());
    }

    #[test]
    fn edit_shifts_bytes_and_points() {
        // Replace bytes [4, 6) with 3 bytes spanning a newline.
        let edit = InputEdit {
            start_byte: 4,
            old_end_byte: 6,
            new_end_byte: 7,
            start_point: Point::new(0, 4),
            old_end_point: Point::new(0, 6),
            new_end_point: Point::new(1, 1),
        };
        assert_eq!(edit.byte_delta(), 1);
        assert_eq!(edit.shift_byte(6), 7);
        assert_eq!(edit.shift_byte(10), 11);
        // Same row as old end: column re-anchors to the new end.
        assert_eq!(edit.shift_point(Point::new(0, 9)), Point::new(1, 4));
        // Later row: only the row delta applies.
        assert_eq!(edit.shift_point(Point::new(2, 3)), Point::new(3, 3));
    }
}
