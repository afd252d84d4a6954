//! Best-effort heuristic tokenizer.
//!
//! Maps source text to grammar token symbols using token-name
//! heuristics: word-shaped token names become keywords, punctuation
//! names become a literal-lexeme table with longest-match-first lookup,
//! and identifier/number/string/comment shapes are classified from the
//! symbol names present in the grammar. Intended as a rollout bridge
//! for grammars without DFA tables; its output is explicitly
//! best-effort and is not expected to match a reference parser.

use std::collections::HashMap;

use sylva_core::{Language, Symbol, Token};
use sylva_engine::{EofTokenSource, TokenSource};

use crate::cursor::{
    eof_token, first_nonzero_symbol, is_ascii_alpha, is_ascii_digit, is_ascii_hex, make_token,
    SourceCursor,
};
use crate::lookup::LexerError;

pub struct GenericTokenSource<'s> {
    src: &'s [u8],
    cur: SourceCursor,
    done: bool,
    pending: Vec<Token<'s>>,

    eof_symbol: Symbol,

    identifier_sym: Symbol,
    primitive_type_sym: Symbol,
    int_sym: Symbol,
    float_sym: Symbol,
    number_sym: Symbol,
    char_sym: Symbol,
    string_sym: Symbol,
    string_content_sym: Symbol,
    escape_sym: Symbol,

    double_quote_sym: Symbol,
    single_quote_sym: Symbol,
    backtick_sym: Symbol,
    triple_quote_sym: Symbol,

    line_comment_sym: Symbol,
    block_comment_sym: Symbol,
    comment_sym: Symbol,
    shebang_sym: Symbol,

    keyword_symbols: HashMap<String, Symbol>,
    literal_symbols: HashMap<String, Symbol>,
    max_literal_len: usize,
}

impl<'s> GenericTokenSource<'s> {
    pub fn new(src: &'s [u8], language: &Language) -> Result<Self, LexerError> {
        let mut ts = Self {
            src,
            cur: SourceCursor::new(),
            done: false,
            pending: Vec::new(),
            eof_symbol: 0,
            identifier_sym: 0,
            primitive_type_sym: 0,
            int_sym: 0,
            float_sym: 0,
            number_sym: 0,
            char_sym: 0,
            string_sym: 0,
            string_content_sym: 0,
            escape_sym: 0,
            double_quote_sym: 0,
            single_quote_sym: 0,
            backtick_sym: 0,
            triple_quote_sym: 0,
            line_comment_sym: 0,
            block_comment_sym: 0,
            comment_sym: 0,
            shebang_sym: 0,
            keyword_symbols: HashMap::new(),
            literal_symbols: HashMap::new(),
            max_literal_len: 0,
        };

        ts.build_symbol_tables(language);

        if ts.identifier_sym == 0 {
            return Err(LexerError::MissingIdentifier { lang: "generic" });
        }
        if ts.number_sym == 0 {
            return Err(LexerError::MissingNumberSymbols { lang: "generic" });
        }
        Ok(ts)
    }

    /// Like [`new`](Self::new), but degrades to an EOF-only source when
    /// no identifier- or number-like symbols exist.
    pub fn new_or_eof(src: &'s [u8], language: &Language) -> Box<dyn TokenSource<'s> + 's> {
        match Self::new(src, language) {
            Ok(ts) => Box::new(ts),
            Err(_) => Box::new(EofTokenSource::new(src.len() as u32)),
        }
    }

    fn build_symbol_tables(&mut self, language: &Language) {
        let limit = language.token_count();
        let mut literal_escapes: HashMap<String, usize> = HashMap::new();

        for id in 1..limit {
            let Some(name) = language.symbol_name(id) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let symbol = id;
            let lname = name.to_ascii_lowercase();

            self.capture_named_special(name, &lname, symbol);

            if is_synthetic_token_name(name) {
                continue;
            }

            if is_token_name_word(name) {
                self.keyword_symbols
                    .entry(name.to_owned())
                    .or_insert(symbol);
                continue;
            }

            let lexeme = normalize_token_lexeme(name);
            if lexeme.is_empty() {
                continue;
            }
            if matches!(lexeme.as_str(), "()" | "[]" | "{}") {
                // Several grammars define bracket-pair aliases, but
                // parser states commonly expect the individual
                // open/close tokens.
                continue;
            }

            let escapes = token_name_escape_count(name);
            // Prefer lower escape-count representations. For equal
            // counts prefer later token ids: grammars encode
            // context-sensitive punctuation as duplicate visible
            // lexemes where the parser expects the later symbol.
            if let Some(&prev) = literal_escapes.get(&lexeme) {
                if prev < escapes {
                    continue;
                }
            }
            self.max_literal_len = self.max_literal_len.max(lexeme.len());
            literal_escapes.insert(lexeme.clone(), escapes);
            self.literal_symbols.insert(lexeme, symbol);
        }

        self.number_sym = first_nonzero_symbol(&[self.number_sym, self.int_sym, self.float_sym]);
    }

    fn capture_named_special(&mut self, name: &str, lname: &str, symbol: Symbol) {
        if self.identifier_sym == 0
            && (name == "identifier"
                || name == "ident"
                || name.ends_with("_identifier")
                || name.ends_with("_ident")
                || name == "bare_key")
        {
            self.identifier_sym = symbol;
        } else if self.primitive_type_sym == 0 && name == "primitive_type" {
            self.primitive_type_sym = symbol;
        } else if self.int_sym == 0
            && (lname.contains("integer")
                || lname.starts_with("int_")
                || lname.ends_with("_int")
                || name == "number")
        {
            self.int_sym = symbol;
        } else if self.float_sym == 0 && (lname.contains("float") || lname.contains("real_")) {
            self.float_sym = symbol;
        } else if self.number_sym == 0
            && (name == "number" || lname.contains("number_literal") || lname.contains("numeric"))
        {
            self.number_sym = symbol;
        } else if self.char_sym == 0 && (lname.contains("char_literal") || name == "character") {
            self.char_sym = symbol;
        } else if self.string_sym == 0 && (lname.contains("string_literal") || name == "string") {
            self.string_sym = symbol;
        } else if self.string_content_sym == 0
            && (name == "string_content"
                || lname.contains("string_fragment")
                || lname.contains("string_content"))
        {
            self.string_content_sym = symbol;
        } else if self.escape_sym == 0 && lname.contains("escape_sequence") {
            self.escape_sym = symbol;
        } else if self.double_quote_sym == 0 && name == "\"" {
            self.double_quote_sym = symbol;
        } else if self.single_quote_sym == 0 && name == "'" {
            self.single_quote_sym = symbol;
        } else if self.backtick_sym == 0 && name == "`" {
            self.backtick_sym = symbol;
        } else if self.triple_quote_sym == 0 && name == "\"\"\"" {
            self.triple_quote_sym = symbol;
        } else if self.shebang_sym == 0 && (name == "hash_bang_line" || name == "shebang") {
            self.shebang_sym = symbol;
        } else if self.line_comment_sym == 0
            && (name == "line_comment"
                || name.starts_with("line_comment_token")
                || name == "doc_comment"
                || name == "inner_doc_comment_marker"
                || name == "outer_doc_comment_marker")
        {
            self.line_comment_sym = symbol;
        } else if self.block_comment_sym == 0
            && (name == "block_comment" || name == "multiline_comment")
        {
            self.block_comment_sym = symbol;
        } else if self.comment_sym == 0 && lname.contains("comment") {
            self.comment_sym = symbol;
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

    fn advance_bytes(&mut self, n: usize) {
        for _ in 0..n {
            if self.cur.eof(self.src) {
                return;
            }
            self.cur.advance_byte(self.src);
        }
    }

    fn shebang_token(&mut self) -> Option<Token<'s>> {
        if self.shebang_sym == 0 || !self.src.starts_with(b"#!") {
            return None;
        }
        let start = self.cur.offset;
        let start_point = self.cur.point();
        while !self.cur.eof(self.src) && self.cur.peek_byte(self.src) != b'\n' {
            self.cur.advance_rune(self.src);
        }
        Some(make_token(
            self.shebang_sym,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        ))
    }

    /// `Some(None)` means "consumed as trivia, emit nothing".
    fn comment_token(&mut self) -> Option<Option<Token<'s>>> {
        if self.match_literal(b"//") {
            let symbol = first_nonzero_symbol(&[
                self.line_comment_sym,
                self.comment_sym,
                self.literal_symbols.get("//").copied().unwrap_or(0),
            ]);
            return Some(self.line_comment_with_prefix(2, symbol));
        }
        if self.match_literal(b"/*") {
            let symbol = first_nonzero_symbol(&[self.block_comment_sym, self.comment_sym]);
            return Some(self.block_comment(symbol));
        }
        if self.match_literal(b"--") {
            let dash_literal = self.literal_symbols.get("--").copied().unwrap_or(0);
            let symbol =
                first_nonzero_symbol(&[self.line_comment_sym, self.comment_sym, dash_literal]);
            // When `--` only names an operator, it is not a comment.
            if symbol != dash_literal {
                return Some(self.line_comment_with_prefix(2, symbol));
            }
        }
        if self.cur.peek_byte(self.src) == b'#' && self.comment_sym != 0 {
            // Avoid consuming preprocessor directives as comments for
            // C-like languages.
            let at_line_start = self.cur.offset == 0 || self.src[self.cur.offset - 1] == b'\n';
            if at_line_start
                && (self.literal_symbols.contains_key("#")
                    || self.literal_symbols.contains_key("#include")
                    || self.literal_symbols.contains_key("#define"))
            {
                return None;
            }
            return Some(self.line_comment_with_prefix(1, self.comment_sym));
        }
        None
    }

    fn line_comment_with_prefix(&mut self, prefix: usize, symbol: Symbol) -> Option<Token<'s>> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.advance_bytes(prefix);
        while !self.cur.eof(self.src) && self.cur.peek_byte(self.src) != b'\n' {
            self.cur.advance_rune(self.src);
        }
        (symbol != 0).then(|| {
            make_token(
                symbol,
                self.src,
                start,
                self.cur.offset,
                start_point,
                self.cur.point(),
            )
        })
    }

    fn block_comment(&mut self, symbol: Symbol) -> Option<Token<'s>> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.advance_bytes(2);
        while !self.cur.eof(self.src) {
            if self.match_literal(b"*/") {
                self.advance_bytes(2);
                break;
            }
            self.cur.advance_rune(self.src);
        }
        (symbol != 0).then(|| {
            make_token(
                symbol,
                self.src,
                start,
                self.cur.offset,
                start_point,
                self.cur.point(),
            )
        })
    }

    fn string_token(&mut self) -> Option<Token<'s>> {
        if self.triple_quote_sym != 0 && self.match_literal(b"\"\"\"") {
            return self.scan_split_string(b"\"\"\"", self.triple_quote_sym, self.string_content_sym, self.escape_sym);
        }
        if self.double_quote_sym != 0 && self.cur.peek_byte(self.src) == b'"' {
            if self.string_sym != 0 && self.string_content_sym == 0 {
                return self.scan_whole_string(b'"', self.string_sym);
            }
            let content = first_nonzero_symbol(&[self.string_content_sym, self.string_sym]);
            return self.scan_split_string(b"\"", self.double_quote_sym, content, self.escape_sym);
        }
        if self.backtick_sym != 0 && self.cur.peek_byte(self.src) == b'`' {
            if self.string_sym != 0 && self.string_content_sym == 0 {
                return self.scan_whole_string(b'`', self.string_sym);
            }
            let content = first_nonzero_symbol(&[self.string_content_sym, self.string_sym]);
            return self.scan_split_string(b"`", self.backtick_sym, content, 0);
        }
        None
    }

    fn char_token(&mut self) -> Option<Token<'s>> {
        if self.cur.peek_byte(self.src) != b'\'' {
            return None;
        }
        if self.char_sym != 0 {
            return self.scan_whole_string(b'\'', self.char_sym);
        }
        if self.single_quote_sym == 0 {
            return None;
        }
        let content = first_nonzero_symbol(&[self.string_content_sym, self.string_sym]);
        self.scan_split_string(b"'", self.single_quote_sym, content, self.escape_sym)
    }

    fn scan_whole_string(&mut self, close: u8, symbol: Symbol) -> Option<Token<'s>> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) {
            let ch = self.cur.peek_byte(self.src);
            if ch == b'\\' {
                self.cur.advance_byte(self.src);
                if !self.cur.eof(self.src) {
                    self.cur.advance_rune(self.src);
                }
                continue;
            }
            if ch == close {
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

    /// Open quote now; content, escapes, and the close quote land in
    /// the pending queue.
    fn scan_split_string(
        &mut self,
        quote: &[u8],
        quote_sym: Symbol,
        content_sym: Symbol,
        escape_sym: Symbol,
    ) -> Option<Token<'s>> {
        if quote_sym == 0 || !self.match_literal(quote) {
            return None;
        }

        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.advance_bytes(quote.len());
        let open = make_token(
            quote_sym,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        );

        let mut seg_start = self.cur.offset;
        let mut seg_point = self.cur.point();
        while !self.cur.eof(self.src) {
            if self.match_literal(quote) {
                if content_sym != 0 && seg_start < self.cur.offset {
                    self.pending.push(make_token(
                        content_sym,
                        self.src,
                        seg_start,
                        self.cur.offset,
                        seg_point,
                        self.cur.point(),
                    ));
                }
                let close_start = self.cur.offset;
                let close_point = self.cur.point();
                self.advance_bytes(quote.len());
                self.pending.push(make_token(
                    quote_sym,
                    self.src,
                    close_start,
                    self.cur.offset,
                    close_point,
                    self.cur.point(),
                ));
                return Some(open);
            }
            if self.cur.peek_byte(self.src) == b'\\' {
                if content_sym != 0 && seg_start < self.cur.offset {
                    self.pending.push(make_token(
                        content_sym,
                        self.src,
                        seg_start,
                        self.cur.offset,
                        seg_point,
                        self.cur.point(),
                    ));
                }
                let esc_start = self.cur.offset;
                let esc_point = self.cur.point();
                self.cur.advance_byte(self.src);
                if !self.cur.eof(self.src) {
                    self.cur.advance_rune(self.src);
                }
                if escape_sym != 0 {
                    self.pending.push(make_token(
                        escape_sym,
                        self.src,
                        esc_start,
                        self.cur.offset,
                        esc_point,
                        self.cur.point(),
                    ));
                }
                seg_start = self.cur.offset;
                seg_point = self.cur.point();
                continue;
            }
            self.cur.advance_rune(self.src);
        }

        if content_sym != 0 && seg_start < self.cur.offset {
            self.pending.push(make_token(
                content_sym,
                self.src,
                seg_start,
                self.cur.offset,
                seg_point,
                self.cur.point(),
            ));
        }
        Some(open)
    }

    fn identifier_or_keyword_token(&mut self) -> Token<'s> {
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.cur.advance_byte(self.src);
        while !self.cur.eof(self.src) && is_ident_part(self.cur.peek_byte(self.src)) {
            self.cur.advance_byte(self.src);
        }

        let text = std::str::from_utf8(&self.src[start..self.cur.offset]).unwrap_or("");
        let symbol = if let Some(&keyword) = self.keyword_symbols.get(text) {
            keyword
        } else if self.primitive_type_sym != 0 && is_c_primitive_type(text) {
            self.primitive_type_sym
        } else {
            self.identifier_sym
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

        let mut is_float = false;
        if self.cur.peek_byte(self.src) == b'0'
            && matches!(
                self.src.get(self.cur.offset + 1),
                Some(&b'x') | Some(&b'X')
            )
        {
            self.advance_bytes(2);
            while !self.cur.eof(self.src)
                && (is_ascii_hex(self.cur.peek_byte(self.src))
                    || self.cur.peek_byte(self.src) == b'_')
            {
                self.cur.advance_byte(self.src);
            }
        } else {
            self.digits_and_underscores();
        }

        if !self.cur.eof(self.src) && self.cur.peek_byte(self.src) == b'.' {
            // Leave range operators like `1..2` alone.
            if self.src.get(self.cur.offset + 1) != Some(&b'.') {
                is_float = true;
                self.cur.advance_byte(self.src);
                self.digits_and_underscores();
            }
        }

        if !self.cur.eof(self.src)
            && matches!(self.cur.peek_byte(self.src), b'e' | b'E' | b'p' | b'P')
        {
            is_float = true;
            self.cur.advance_byte(self.src);
            if !self.cur.eof(self.src) && matches!(self.cur.peek_byte(self.src), b'+' | b'-') {
                self.cur.advance_byte(self.src);
            }
            self.digits_and_underscores();
        }

        let symbol = if is_float {
            first_nonzero_symbol(&[self.float_sym, self.number_sym, self.int_sym])
        } else {
            first_nonzero_symbol(&[self.int_sym, self.number_sym, self.float_sym])
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

    fn literal_token(&mut self) -> Option<Token<'s>> {
        let (symbol, len) = self.match_longest_literal()?;
        let start = self.cur.offset;
        let start_point = self.cur.point();
        self.advance_bytes(len);
        Some(make_token(
            symbol,
            self.src,
            start,
            self.cur.offset,
            start_point,
            self.cur.point(),
        ))
    }

    fn match_longest_literal(&self) -> Option<(Symbol, usize)> {
        let remaining = self.src.len() - self.cur.offset;
        let max = self.max_literal_len.min(remaining);
        for n in (1..=max).rev() {
            let lexeme = &self.src[self.cur.offset..self.cur.offset + n];
            let Ok(lexeme) = std::str::from_utf8(lexeme) else {
                continue;
            };
            let Some(&symbol) = self.literal_symbols.get(lexeme) else {
                continue;
            };
            if lexeme_needs_boundary(lexeme)
                && !has_word_boundary_after(self.src, self.cur.offset + n)
            {
                continue;
            }
            return Some((symbol, n));
        }
        None
    }
}

impl<'s> TokenSource<'s> for GenericTokenSource<'s> {
    fn next_token(&mut self) -> Token<'s> {
        if !self.pending.is_empty() {
            return self.pending.remove(0);
        }
        if self.done {
            return self.eof_token();
        }

        loop {
            if self.cur.offset == 0 {
                if let Some(tok) = self.shebang_token() {
                    return tok;
                }
            }

            self.cur.skip_whitespace(self.src);
            if self.cur.eof(self.src) {
                self.done = true;
                return self.eof_token();
            }

            if let Some(comment) = self.comment_token() {
                match comment {
                    Some(tok) => return tok,
                    None => continue,
                }
            }

            if let Some(tok) = self.string_token() {
                return tok;
            }
            if let Some(tok) = self.char_token() {
                return tok;
            }

            let b = self.cur.peek_byte(self.src);
            if is_ident_start(b) {
                return self.identifier_or_keyword_token();
            }
            if is_ascii_digit(b) {
                return self.number_token();
            }
            if let Some(tok) = self.literal_token() {
                return tok;
            }

            // Unknown byte: consume one rune and continue.
            self.cur.advance_rune(self.src);
        }
    }

    fn skip_to_byte(&mut self, offset: u32) -> Option<Token<'s>> {
        let target = (offset as usize).min(self.src.len());

        self.pending.clear();
        self.done = false;

        self.cur.seek(self.src, target);
        if self.cur.eof(self.src) {
            self.done = true;
            return Some(self.eof_token());
        }
        Some(self.next_token())
    }
}

fn is_ident_start(b: u8) -> bool {
    is_ascii_alpha(b) || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || is_ascii_digit(b) || b == b'-'
}

/// Internal rule names and split-token aliases never correspond to
/// surface lexemes.
fn is_synthetic_token_name(name: &str) -> bool {
    if name.starts_with('_') {
        return true;
    }
    if let Some(pos) = name.rfind("_token") {
        let suffix = &name[pos + "_token".len()..];
        return !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit());
    }
    false
}

/// Word-shaped token names (`return`, `fn`, `else`) become keyword
/// table entries.
fn is_token_name_word(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Resolve backslash escapes in a token name to its surface lexeme.
fn normalize_token_lexeme(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn token_name_escape_count(name: &str) -> usize {
    name.matches('\\').count()
}

/// Word-shaped literal lexemes (`and`, `not`) must not match inside a
/// longer identifier.
fn lexeme_needs_boundary(lexeme: &str) -> bool {
    lexeme
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn has_word_boundary_after(src: &[u8], offset: usize) -> bool {
    match src.get(offset) {
        None => true,
        Some(&b) => !is_ident_part(b),
    }
}

fn is_c_primitive_type(text: &str) -> bool {
    matches!(
        text,
        "bool"
            | "char"
            | "double"
            | "float"
            | "int"
            | "long"
            | "short"
            | "signed"
            | "size_t"
            | "ssize_t"
            | "unsigned"
            | "void"
            | "wchar_t"
    )
}
