//! Lexer bridge for HTML grammars.
//!
//! Targets standard tag/text/comment flows. The bridge mirrors the
//! grammar's context sensitivity with three flags: inside a tag, inside
//! an end tag, and expecting a tag name; rewinding via `skip_to_byte`
//! clears them so re-lexing starts from text context.

use sylva_core::{Language, Symbol, Token};
use sylva_engine::{EofTokenSource, TokenSource};

use crate::cursor::{eof_token, is_ascii_alpha, is_ascii_digit, make_token, SourceCursor};
use crate::lookup::{LexerError, TokenLookup};

pub struct HtmlTokenSource<'s> {
    src: &'s [u8],
    cur: SourceCursor,
    done: bool,

    in_tag: bool,
    in_end_tag: bool,
    expect_tag_name: bool,

    eof_symbol: Symbol,

    lt_sym: Symbol,
    lt_slash_sym: Symbol,
    gt_sym: Symbol,
    slash_gt_sym: Symbol,
    eq_sym: Symbol,

    open_tag_name_sym: Symbol,
    end_tag_name_sym: Symbol,
    attr_name_sym: Symbol,
    attr_value_sym: Symbol,
    text_sym: Symbol,
    comment_sym: Symbol,
}

impl<'s> HtmlTokenSource<'s> {
    pub fn new(src: &'s [u8], language: &Language) -> Result<Self, LexerError> {
        let mut lookup = TokenLookup::new(language, "html");

        let mut ts = Self {
            src,
            cur: SourceCursor::new(),
            done: false,
            in_tag: false,
            in_end_tag: false,
            expect_tag_name: false,
            eof_symbol: 0,
            lt_sym: lookup.require("<"),
            lt_slash_sym: lookup.require("</"),
            gt_sym: lookup.require(">"),
            slash_gt_sym: lookup.optional(&["/>"]),
            eq_sym: lookup.optional(&["="]),
            open_tag_name_sym: 0,
            end_tag_name_sym: 0,
            attr_name_sym: lookup.optional(&["attribute_name"]),
            attr_value_sym: lookup.optional(&["attribute_value"]),
            text_sym: lookup.optional(&["text"]),
            comment_sym: lookup.optional(&["comment"]),
        };

        // Several HTML grammars define separate start- and end-tag name
        // tokens under the one visible name.
        let tag_names = language.token_symbols_by_name("tag_name");
        match (tag_names.first(), tag_names.last()) {
            (Some(&first), Some(&last)) => {
                ts.open_tag_name_sym = first;
                ts.end_tag_name_sym = last;
            }
            _ => {
                lookup.require("tag_name");
            }
        }

        lookup.finish()?;
        if ts.text_sym == 0 {
            return Err(LexerError::MissingSymbol {
                lang: "html",
                name: "text".to_owned(),
            });
        }
        if ts.attr_name_sym == 0 {
            ts.attr_name_sym = ts.open_tag_name_sym;
        }
        if ts.attr_value_sym == 0 {
            ts.attr_value_sym = ts.text_sym;
        }
        if ts.end_tag_name_sym == 0 {
            ts.end_tag_name_sym = ts.open_tag_name_sym;
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

    fn comment_token(&mut self) -> Option<Token<'s>> {
        if self.comment_sym == 0 || !self.match_literal(b"<!--") {
            return None;
        }
        let start = self.cur.offset;
        let start_point = self.cur.point();
        for _ in 0..4 {
            self.cur.advance_byte(self.src);
        }
        while !self.cur.eof(self.src) {
            if self.match_literal(b"-->") {
                for _ in 0..3 {
                    self.cur.advance_byte(self.src);
                }
                break;
            }
            self.cur.advance_rune(self.src);
        }
        Some(make_token(
            self.comment_sym,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        ))
    }

    fn text_token(&mut self) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        while !self.cur.eof(self.src) && self.cur.peek_byte(self.src) != b'<' {
            self.cur.advance_rune(self.src);
        }
        make_token(
            self.text_sym,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        )
    }

    fn quoted_attribute_value(&mut self) -> Token<'s> {
        let quote = self.cur.peek_byte(self.src);
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) {
            if self.cur.peek_byte(self.src) == quote {
                self.cur.advance_byte(self.src);
                break;
            }
            self.cur.advance_rune(self.src);
        }
        make_token(
            self.attr_value_sym,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        )
    }

    fn name_token(&mut self) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) && is_html_name_part(self.cur.peek_byte(self.src)) {
            self.cur.advance_byte(self.src);
        }

        let mut symbol = self.attr_name_sym;
        if self.expect_tag_name {
            symbol = if self.in_end_tag {
                self.end_tag_name_sym
            } else {
                self.open_tag_name_sym
            };
            self.expect_tag_name = false;
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
}

impl<'s> TokenSource<'s> for HtmlTokenSource<'s> {
    fn next_token(&mut self) -> Token<'s> {
        if self.done {
            return self.eof_token();
        }

        loop {
            if self.cur.eof(self.src) {
                self.done = true;
                return self.eof_token();
            }

            if !self.in_tag {
                if let Some(tok) = self.comment_token() {
                    return tok;
                }
                if self.match_literal(b"</") {
                    self.in_tag = true;
                    self.in_end_tag = true;
                    self.expect_tag_name = true;
                    return self.literal_token(self.lt_slash_sym, 2);
                }
                if self.match_literal(b"<") {
                    self.in_tag = true;
                    self.in_end_tag = false;
                    self.expect_tag_name = true;
                    return self.literal_token(self.lt_sym, 1);
                }
                return self.text_token();
            }

            // In tag mode.
            if matches!(
                self.cur.peek_byte(self.src),
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c'
            ) {
                self.cur.advance_byte(self.src);
                continue;
            }

            if self.match_literal(b"/>") && self.slash_gt_sym != 0 {
                self.in_tag = false;
                self.in_end_tag = false;
                self.expect_tag_name = false;
                return self.literal_token(self.slash_gt_sym, 2);
            }
            if self.match_literal(b">") {
                self.in_tag = false;
                self.in_end_tag = false;
                self.expect_tag_name = false;
                return self.literal_token(self.gt_sym, 1);
            }
            if self.match_literal(b"=") && self.eq_sym != 0 {
                return self.literal_token(self.eq_sym, 1);
            }
            if matches!(self.cur.peek_byte(self.src), b'"' | b'\'') {
                return self.quoted_attribute_value();
            }
            if is_html_name_start(self.cur.peek_byte(self.src)) {
                return self.name_token();
            }

            // Skip unexpected bytes inside tags.
            self.cur.advance_rune(self.src);
        }
    }

    fn skip_to_byte(&mut self, offset: u32) -> Option<Token<'s>> {
        let target = (offset as usize).min(self.src.len());

        self.done = false;
        if self.cur.seek(self.src, target) {
            self.in_tag = false;
            self.in_end_tag = false;
            self.expect_tag_name = false;
        }
        if self.cur.eof(self.src) {
            self.done = true;
            return Some(self.eof_token());
        }
        Some(self.next_token())
    }
}

fn is_html_name_start(b: u8) -> bool {
    is_ascii_alpha(b) || b == b'_' || b == b':'
}

fn is_html_name_part(b: u8) -> bool {
    is_html_name_start(b) || is_ascii_digit(b) || b == b'-' || b == b'.'
}
