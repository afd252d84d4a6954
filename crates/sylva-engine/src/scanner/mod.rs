//! External scanner support.
//!
//! Languages whose lexical behavior cannot be expressed by the static
//! DFA carry a bytecode program ([`sylva_core::ScannerProgram`]) that
//! the [`VmScanner`] interprets against a [`ScannerLexer`] positioned in
//! the source. Scanner state is a single `u32` word with little-endian
//! serialization so incremental parsing checkpoints can carry it.

mod vm;


pub use vm::{VmPayload, VmScanner, SCANNER_STATE_LEN};

use sylva_core::{Symbol, Token};

use crate::token_source::LexPosition;

/// Lexer handle handed to a scanner during one scan attempt. Produces
/// at most one token.
pub struct ScannerLexer<'s> {
    src: &'s [u8],
    cursor: LexPosition,
    token_start: LexPosition,
    marked_end: Option<LexPosition>,
    result: Option<Symbol>,
}

impl<'s> ScannerLexer<'s> {
    pub fn new(src: &'s [u8], start: u32) -> Self {
        let mut pos = LexPosition::default();
        pos.seek(src, start);
        Self::at_position(src, pos)
    }

    pub(crate) fn at_position(src: &'s [u8], pos: LexPosition) -> Self {
        Self {
            src,
            cursor: pos,
            token_start: pos,
            marked_end: None,
            result: None,
        }
    }

    /// Code point at the cursor, or `None` at end-of-input.
    pub fn lookahead(&self) -> Option<char> {
        self.cursor.peek_char(self.src).map(|(c, _)| c)
    }

    /// Consume the lookahead. Skipped runes move the token start instead
    /// of extending the token.
    pub fn advance(&mut self, skip: bool) {
        self.cursor.advance_char(self.src);
        if skip {
            self.token_start = self.cursor;
        }
    }

    /// Record the current position as the token end.
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.cursor);
    }

    pub fn set_result_symbol(&mut self, symbol: Symbol) {
        self.result = Some(symbol);
    }

    /// Position the token ends at: the marked end, or the cursor when
    /// the scanner never called [`mark_end`](Self::mark_end).
    pub(crate) fn end_position(&self) -> LexPosition {
        self.marked_end.unwrap_or(self.cursor)
    }

    /// The scanned token, if the program emitted one.
    pub fn token(&self) -> Option<Token<'s>> {
        let symbol = self.result?;
        let end = self.end_position();
        Some(Token {
            symbol,
            start_byte: self.token_start.offset,
            end_byte: end.offset,
            start_point: self.token_start.point,
            end_point: end.point,
            text: &self.src[self.token_start.offset as usize..end.offset as usize],
        })
    }
}
