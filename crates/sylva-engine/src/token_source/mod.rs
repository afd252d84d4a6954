//! Token sources.
//!
//! The parser's only interface to the input is a pull-based token
//! sequence. The built-in [`DfaTokenSource`] interprets the grammar's
//! extracted lexer automaton; grammars with context-sensitive lexing
//! supply their own implementation of [`TokenSource`] instead.

mod dfa;


pub use dfa::DfaTokenSource;

use sylva_core::{Point, Token};

/// Pull-based sequence of tokens over a source buffer. Symbol 0 is the
/// EOF sentinel; sources keep returning it once exhausted.
pub trait TokenSource<'s> {
    fn next_token(&mut self) -> Token<'s>;

    /// Reposition the source so the next token begins at or after
    /// `offset`, returning that token. Sources without fast-forward
    /// support return `None`; the driver then discards tokens one by
    /// one instead.
    fn skip_to_byte(&mut self, offset: u32) -> Option<Token<'s>> {
        let _ = offset;
        None
    }
}

/// Sentinel source that only ever produces EOF. Returned by fallible
/// tokenizer constructors when required grammar symbols are missing.
pub struct EofTokenSource {
    source_len: u32,
}

impl EofTokenSource {
    pub fn new(source_len: u32) -> Self {
        Self { source_len }
    }
}

impl<'s> TokenSource<'s> for EofTokenSource {
    fn next_token(&mut self) -> Token<'s> {
        Token::eof(self.source_len, Point::ZERO)
    }

    fn skip_to_byte(&mut self, _offset: u32) -> Option<Token<'s>> {
        Some(Token::eof(self.source_len, Point::ZERO))
    }
}

/// A byte offset plus its row/column point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LexPosition {
    pub offset: u32,
    pub point: Point,
}

impl LexPosition {
    pub fn at_eof(self, src: &[u8]) -> bool {
        self.offset as usize >= src.len()
    }

    /// Decode the code point at the cursor. Invalid UTF-8 yields one
    /// replacement character per byte.
    pub fn peek_char(self, src: &[u8]) -> Option<(char, u32)> {
        let offset = self.offset as usize;
        if offset >= src.len() {
            return None;
        }
        let end = (offset + 4).min(src.len());
        match std::str::from_utf8(&src[offset..end]) {
            Ok(s) => {
                let c = s.chars().next()?;
                Some((c, c.len_utf8() as u32))
            }
            Err(e) if e.valid_up_to() > 0 => {
                let c = std::str::from_utf8(&src[offset..offset + e.valid_up_to()])
                    .ok()?
                    .chars()
                    .next()?;
                Some((c, c.len_utf8() as u32))
            }
            Err(_) => Some(('\u{FFFD}', 1)),
        }
    }

    /// Advance past one code point, maintaining the row/column point.
    pub fn advance_char(&mut self, src: &[u8]) {
        let Some((c, width)) = self.peek_char(src) else {
            return;
        };
        self.offset += width;
        if c == '\n' {
            self.point.row += 1;
            self.point.column = 0;
        } else {
            self.point.column += width;
        }
    }

    /// Advance to `target`, clamped to the buffer, re-scanning from the
    /// start when the target lies behind the cursor.
    pub fn seek(&mut self, src: &[u8], target: u32) -> bool {
        let target = target.min(src.len() as u32);
        let rewound = target < self.offset;
        if rewound {
            *self = LexPosition::default();
        }
        while self.offset < target {
            self.advance_char(src);
        }
        rewound
    }
}
