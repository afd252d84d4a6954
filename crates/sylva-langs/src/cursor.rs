//! Byte cursor shared by the hand-written tokenizers.

use sylva_core::{Point, Symbol, Token};

/// Position within a source buffer, tracking the row/column point.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SourceCursor {
    pub offset: usize,
    point: Point,
}

impl SourceCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn eof(&self, src: &[u8]) -> bool {
        self.offset >= src.len()
    }

    pub fn peek_byte(&self, src: &[u8]) -> u8 {
        src.get(self.offset).copied().unwrap_or(0)
    }

    /// Advance one byte. Only correct for ASCII; multi-byte input goes
    /// through [`advance_rune`](Self::advance_rune).
    pub fn advance_byte(&mut self, src: &[u8]) {
        if self.eof(src) {
            return;
        }
        if src[self.offset] == b'\n' {
            self.point.row += 1;
            self.point.column = 0;
        } else {
            self.point.column += 1;
        }
        self.offset += 1;
    }

    /// Advance one UTF-8 code point (one byte on invalid sequences).
    pub fn advance_rune(&mut self, src: &[u8]) {
        if self.eof(src) {
            return;
        }
        let first = src[self.offset];
        if first < 0x80 {
            self.advance_byte(src);
            return;
        }
        let width = match first {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        }
        .min(src.len() - self.offset);
        self.offset += width;
        self.point.column += width as u32;
    }

    /// Skip spaces, tabs, carriage returns, form feeds, and newlines.
    pub fn skip_whitespace(&mut self, src: &[u8]) {
        while !self.eof(src) {
            match src[self.offset] {
                b' ' | b'\t' | b'\r' | b'\x0c' | b'\n' => self.advance_byte(src),
                _ => return,
            }
        }
    }

    /// Advance to `target`, re-scanning from the start when the target
    /// lies behind the cursor. Returns true when a rewind happened.
    pub fn seek(&mut self, src: &[u8], target: usize) -> bool {
        let target = target.min(src.len());
        let rewound = target < self.offset;
        if rewound {
            *self = SourceCursor::new();
        }
        while self.offset < target {
            self.advance_rune(src);
        }
        rewound
    }
}

pub(crate) fn make_token<'s>(
    symbol: Symbol,
    src: &'s [u8],
    start: usize,
    end: usize,
    start_point: Point,
    end_point: Point,
) -> Token<'s> {
    Token {
        symbol,
        start_byte: start as u32,
        end_byte: end as u32,
        start_point,
        end_point,
        text: &src[start..end],
    }
}

/// EOF token at the end of `src`, with the cursor's current point.
pub(crate) fn eof_token<'s>(src: &'s [u8], cursor: &SourceCursor) -> Token<'s> {
    Token::eof(src.len() as u32, cursor.point())
}

pub(crate) fn is_ascii_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

pub(crate) fn is_ascii_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

pub(crate) fn is_ascii_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// First non-zero symbol, mirroring the "first present wins" fallback
/// chains the bridges use.
pub(crate) fn first_nonzero_symbol(candidates: &[Symbol]) -> Symbol {
    candidates.iter().copied().find(|&s| s != 0).unwrap_or(0)
}
