//! Lexer bridge for TOML grammars.
//!
//! Focuses on practical coverage for common editor workflows and
//! incremental parsing: the grammar's synthetic document-start and
//! line-ending tokens are emitted where the tables expect them.

use sylva_core::{Language, Symbol, Token};
use sylva_engine::{EofTokenSource, TokenSource};

use crate::cursor::{
    eof_token, first_nonzero_symbol, is_ascii_alpha, is_ascii_digit, is_ascii_hex, make_token,
    SourceCursor,
};
use crate::lookup::{LexerError, TokenLookup};

pub struct TomlTokenSource<'s> {
    src: &'s [u8],
    cur: SourceCursor,
    done: bool,

    eof_symbol: Symbol,

    doc_start_sym: Symbol,
    comment_sym: Symbol,
    bare_key_sym: Symbol,
    boolean_sym: Symbol,
    int_sym: Symbol,
    float_sym: Symbol,
    line_end_sym: Symbol,

    eq_sym: Symbol,
    dot_sym: Symbol,
    comma_sym: Symbol,
    lbrack_sym: Symbol,
    rbrack_sym: Symbol,
    lbrack2_sym: Symbol,
    rbrack2_sym: Symbol,
    lbrace_sym: Symbol,
    rbrace_sym: Symbol,

    basic_string_sym: Symbol,
    literal_string_sym: Symbol,

    emitted_eof_line_end: bool,
    emitted_doc_start: bool,
}

impl<'s> TomlTokenSource<'s> {
    pub fn new(src: &'s [u8], language: &Language) -> Result<Self, LexerError> {
        let mut lookup = TokenLookup::new(language, "toml");

        let ts = Self {
            src,
            cur: SourceCursor::new(),
            done: false,
            eof_symbol: 0,
            doc_start_sym: lookup.optional(&["document_token1"]),
            comment_sym: lookup.optional(&["comment"]),
            bare_key_sym: lookup.require("bare_key"),
            boolean_sym: lookup.optional(&["boolean"]),
            int_sym: lookup.optional(&[
                "integer_token1",
                "integer_token2",
                "integer_token3",
                "integer_token4",
            ]),
            float_sym: lookup.optional(&["float_token1", "float_token2"]),
            line_end_sym: lookup.optional(&["_line_ending_or_eof"]),
            eq_sym: lookup.optional(&["="]),
            dot_sym: lookup.optional(&["."]),
            comma_sym: lookup.optional(&[","]),
            lbrack_sym: lookup.optional(&["["]),
            rbrack_sym: lookup.optional(&["]"]),
            lbrack2_sym: lookup.optional(&["[["]),
            rbrack2_sym: lookup.optional(&["]]"]),
            lbrace_sym: lookup.optional(&["{"]),
            rbrace_sym: lookup.optional(&["}"]),
            basic_string_sym: lookup.optional(&["_basic_string_token1"]),
            literal_string_sym: lookup.optional(&["_literal_string_token1"]),
            emitted_eof_line_end: false,
            emitted_doc_start: false,
        };

        lookup.finish()?;
        if ts.int_sym == 0 && ts.float_sym == 0 {
            return Err(LexerError::MissingNumberSymbols { lang: "toml" });
        }
        Ok(ts)
    }

    /// Like [`new`](Self::new), but degrades to an EOF-only source when
    /// required symbols are missing.
    pub fn new_or_eof(src: &'s [u8], language: &Language) -> Box<dyn TokenSource<'s> + 's> {
        match Self::new(src, language) {
            Ok(ts) => Box::new(ts),
            Err(_) => Box::new(EofTokenSource::new(src.len() as u32)),
        }
    }

    fn eof_token(&self) -> Token<'s> {
        let mut tok = eof_token(self.src, &self.cur);
        tok.symbol = self.eof_symbol;
        tok
    }

    fn match_literal(&self, lexeme: &[u8]) -> bool {
        self.src[self.cur.offset.min(self.src.len())..].starts_with(lexeme)
    }

    fn literal_token(&mut self, symbol: Symbol, len: usize) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        for _ in 0..len {
            if self.cur.eof(self.src) {
                break;
            }
            self.cur.advance_byte(self.src);
        }
        make_token(
            symbol,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        )
    }

    fn punct_token(&mut self) -> Option<Token<'s>> {
        if self.match_literal(b"[[") && self.lbrack2_sym != 0 {
            return Some(self.literal_token(self.lbrack2_sym, 2));
        }
        if self.match_literal(b"]]") && self.rbrack2_sym != 0 {
            return Some(self.literal_token(self.rbrack2_sym, 2));
        }

        let symbol = match self.cur.peek_byte(self.src) {
            b'=' => self.eq_sym,
            b'.' => self.dot_sym,
            b',' => self.comma_sym,
            b'[' => self.lbrack_sym,
            b']' => self.rbrack_sym,
            b'{' => self.lbrace_sym,
            b'}' => self.rbrace_sym,
            _ => 0,
        };
        if symbol == 0 {
            return None;
        }
        Some(self.literal_token(symbol, 1))
    }

    fn quoted_string_token(&mut self, quote: u8, symbol: Symbol) -> Option<Token<'s>> {
        if symbol == 0 || self.cur.peek_byte(self.src) != quote {
            return None;
        }
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) {
            let ch = self.cur.peek_byte(self.src);
            if quote == b'"' && ch == b'\\' {
                self.cur.advance_byte(self.src);
                if !self.cur.eof(self.src) {
                    self.cur.advance_rune(self.src);
                }
                continue;
            }
            if ch == quote {
                self.cur.advance_byte(self.src);
                break;
            }
            self.cur.advance_rune(self.src);
        }
        Some(make_token(
            symbol,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        ))
    }

    fn bare_key_or_boolean_token(&mut self) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) && is_bare_key_part(self.cur.peek_byte(self.src)) {
            self.cur.advance_byte(self.src);
        }

        let text = &self.src[start..self.cur.offset];
        let symbol = if self.boolean_sym != 0 && (text == b"true" || text == b"false") {
            self.boolean_sym
        } else {
            self.bare_key_sym
        };
        make_token(
            symbol,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        )
    }

    fn number_token(&mut self) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();

        if !self.cur.eof(self.src)
            && matches!(self.cur.peek_byte(self.src), b'+' | b'-')
        {
            self.cur.advance_byte(self.src);
        }

        let mut is_float = false;

        let radix_prefix = [b"0x", b"0X", b"0o", b"0O", b"0b", b"0B"]
            .iter()
            .any(|p| self.match_literal(*p));
        if radix_prefix {
            self.cur.advance_byte(self.src);
            self.cur.advance_byte(self.src);
            while !self.cur.eof(self.src)
                && (is_ascii_hex(self.cur.peek_byte(self.src))
                    || self.cur.peek_byte(self.src) == b'_')
            {
                self.cur.advance_byte(self.src);
            }
        } else {
            self.digits_and_underscores();

            if !self.cur.eof(self.src) && self.cur.peek_byte(self.src) == b'.' {
                is_float = true;
                self.cur.advance_byte(self.src);
                self.digits_and_underscores();
            }

            if !self.cur.eof(self.src)
                && matches!(self.cur.peek_byte(self.src), b'e' | b'E')
            {
                is_float = true;
                self.cur.advance_byte(self.src);
                if !self.cur.eof(self.src)
                    && matches!(self.cur.peek_byte(self.src), b'+' | b'-')
                {
                    self.cur.advance_byte(self.src);
                }
                self.digits_and_underscores();
            }
        }

        let symbol = if is_float {
            first_nonzero_symbol(&[self.float_sym, self.int_sym])
        } else {
            self.int_sym
        };
        make_token(
            symbol,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        )
    }

    fn digits_and_underscores(&mut self) {
        while !self.cur.eof(self.src)
            && (is_ascii_digit(self.cur.peek_byte(self.src))
                || self.cur.peek_byte(self.src) == b'_')
        {
            self.cur.advance_byte(self.src);
        }
    }
}

impl<'s> TokenSource<'s> for TomlTokenSource<'s> {
    fn next_token(&mut self) -> Token<'s> {
        if self.done {
            return self.eof_token();
        }

        loop {
            if !self.emitted_doc_start && self.doc_start_sym != 0 {
                self.emitted_doc_start = true;
                let point = self.cur.point();
                return Token {
                    symbol: self.doc_start_sym,
                    start_byte: self.cur.offset as u32,
                    end_byte: self.cur.offset as u32,
                    start_point: point,
                    end_point: point,
                    text: &[],
                };
            }

            if self.cur.eof(self.src) {
                if self.line_end_sym != 0 && !self.emitted_eof_line_end {
                    self.emitted_eof_line_end = true;
                    let point = self.cur.point();
                    let n = self.src.len() as u32;
                    return Token {
                        symbol: self.line_end_sym,
                        start_byte: n,
                        end_byte: n,
                        start_point: point,
                        end_point: point,
                        text: &[],
                    };
                }
                self.done = true;
                return self.eof_token();
            }

            let ch = self.cur.peek_byte(self.src);
            if matches!(ch, b' ' | b'\t' | b'\r' | b'\x0c') {
                self.cur.advance_byte(self.src);
                continue;
            }

            if ch == b'\n' {
                let start = self.cur.offset;
                let start_point = self.cur.point();
                self.cur.advance_byte(self.src);
                if self.line_end_sym != 0 {
                    if self.cur.eof(self.src) {
                        self.emitted_eof_line_end = true;
                    }
                    return make_token(
                        self.line_end_sym,
                        self.src,
                        start,
                        self.cur.offset,
                        start_point,
                        self.cur.point(),
                    );
                }
                continue;
            }

            if ch == b'#' {
                let start = self.cur.offset;
                let start_point = self.cur.point();
                while !self.cur.eof(self.src) && self.cur.peek_byte(self.src) != b'\n' {
                    self.cur.advance_rune(self.src);
                }
                if self.comment_sym != 0 {
                    return make_token(
                        self.comment_sym,
                        self.src,
                        start,
                        self.cur.offset,
                        start_point,
                        self.cur.point(),
                    );
                }
                continue;
            }

            if let Some(tok) = self.punct_token() {
                return tok;
            }

            if ch == b'"' {
                if let Some(tok) = self.quoted_string_token(b'"', self.basic_string_sym) {
                    return tok;
                }
            }
            if ch == b'\'' {
                if let Some(tok) = self.quoted_string_token(b'\'', self.literal_string_sym) {
                    return tok;
                }
            }

            if is_ascii_digit(ch) || ch == b'+' || ch == b'-' {
                return self.number_token();
            }

            if is_bare_key_start(ch) {
                return self.bare_key_or_boolean_token();
            }

            // Unknown byte: consume and continue.
            self.cur.advance_rune(self.src);
        }
    }

    fn skip_to_byte(&mut self, offset: u32) -> Option<Token<'s>> {
        let target = (offset as usize).min(self.src.len());

        self.done = false;
        self.emitted_eof_line_end = false;
        self.emitted_doc_start = self.doc_start_sym == 0 || target > 0;

        self.cur.seek(self.src, target);
        if self.cur.eof(self.src) {
            self.done = true;
            return Some(self.eof_token());
        }
        Some(self.next_token())
    }
}

fn is_bare_key_start(b: u8) -> bool {
    is_ascii_alpha(b) || is_ascii_digit(b) || b == b'_' || b == b'-'
}

fn is_bare_key_part(b: u8) -> bool {
    is_bare_key_start(b)
}
