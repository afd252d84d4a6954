//! Token source interpreting the grammar's extracted lexer automaton.

use sylva_core::{Language, Symbol, Token, ERROR_SENTINEL};

use super::{LexPosition, TokenSource};
use crate::scanner::{ScannerLexer, VmPayload, VmScanner};

struct ScannerHook {
    vm: VmScanner,
    payload: VmPayload,
    valid: Vec<bool>,
    /// Offset of a zero-width scanner token, to stop the program from
    /// re-emitting it at the same position forever.
    zero_width_at: Option<u32>,
}

/// Lexes by interpreting the main (and optional keyword) DFA from the
/// language descriptor. When the language embeds an external scanner
/// program, the scanner is consulted before the DFA at every position.
pub struct DfaTokenSource<'l, 's> {
    language: &'l Language,
    src: &'s [u8],
    pos: LexPosition,
    scanner: Option<ScannerHook>,
    /// Offset of the last zero-width DFA token (EOF-target states can
    /// accept without consuming); re-accepting there degrades to EOF so
    /// the stream always makes progress.
    last_zero_width: Option<u32>,
}

impl<'l, 's> DfaTokenSource<'l, 's> {
    pub fn new(language: &'l Language, src: &'s [u8]) -> Self {
        let scanner = language.scanner_program().and_then(|program| {
            let vm = VmScanner::new(program.clone()).ok()?;
            let payload = vm.create();
            Some(ScannerHook {
                vm,
                payload,
                valid: vec![true; language.external_tokens().len()],
                zero_width_at: None,
            })
        });
        Self {
            language,
            src,
            pos: LexPosition::default(),
            scanner,
            last_zero_width: None,
        }
    }

    /// Serialized scanner payload, when a scanner is attached.
    pub fn scanner_state(&self) -> Option<Vec<u8>> {
        let hook = self.scanner.as_ref()?;
        let mut buf = vec![0u8; crate::scanner::SCANNER_STATE_LEN];
        let n = hook.vm.serialize(&hook.payload, &mut buf);
        buf.truncate(n);
        Some(buf)
    }

    /// Restore scanner state from a blob captured by a previous parse.
    pub fn restore_scanner_state(&mut self, blob: &[u8]) {
        if let Some(hook) = self.scanner.as_mut() {
            hook.vm.deserialize(&mut hook.payload, blob);
        }
    }

    fn make_token(&self, symbol: Symbol, start: LexPosition, end: LexPosition) -> Token<'s> {
        Token {
            symbol,
            start_byte: start.offset,
            end_byte: end.offset,
            start_point: start.point,
            end_point: end.point,
            text: &self.src[start.offset as usize..end.offset as usize],
        }
    }

    fn scan_external(&mut self) -> Option<Token<'s>> {
        let hook = self.scanner.as_mut()?;
        if hook.zero_width_at == Some(self.pos.offset) {
            return None;
        }
        let mut lexer = ScannerLexer::at_position(self.src, self.pos);
        if !hook.vm.scan(&mut hook.payload, &mut lexer, &hook.valid) {
            return None;
        }
        let token = lexer.token()?;
        hook.zero_width_at = (token.start_byte == token.end_byte).then_some(token.start_byte);
        self.pos = lexer.end_position();
        Some(token)
    }

    /// Re-lex the accepted slice against the keyword DFA; a keyword
    /// match spanning the whole token overrides the capture symbol.
    fn keyword_relex(&self, start: LexPosition, end: LexPosition) -> Option<Symbol> {
        let states = self.language.keyword_lex_states();
        if states.is_empty() {
            return None;
        }
        let mut state = 0usize;
        let mut pos = start;
        let mut matched = None;
        while pos.offset < end.offset {
            let (c, _) = pos.peek_char(self.src)?;
            let transition = states[state].transitions.iter().find(|t| t.contains(c))?;
            pos.advance_char(self.src);
            state = transition.next as usize;
            if pos.offset == end.offset {
                matched = states[state].accept;
            }
        }
        matched
    }
}

impl<'s> TokenSource<'s> for DfaTokenSource<'_, 's> {
    fn next_token(&mut self) -> Token<'s> {
        if let Some(token) = self.scan_external() {
            return token;
        }

        let states = self.language.lex_states();
        if states.is_empty() {
            // Hand-lexed grammar driven through the DFA source by
            // mistake: degrade to EOF / error-sentinel tokens.
            if self.pos.at_eof(self.src) {
                return Token::eof(self.src.len() as u32, self.pos.point);
            }
            let start = self.pos;
            self.pos.advance_char(self.src);
            return self.make_token(ERROR_SENTINEL, start, self.pos);
        }

        let mut token_start = self.pos;
        let mut cursor = self.pos;
        let mut state = 0usize;
        let mut accepted: Option<(Symbol, LexPosition, bool)> = None;
        let mut followed_eof = false;

        loop {
            let lex_state = &states[state];
            let Some((c, _)) = cursor.peek_char(self.src) else {
                match lex_state.eof_target {
                    Some(target) if !followed_eof => {
                        followed_eof = true;
                        state = target as usize;
                        if let Some(symbol) = states[state].accept {
                            accepted = Some((symbol, cursor, states[state].is_keyword));
                        }
                        continue;
                    }
                    _ => break,
                }
            };

            let Some(transition) = lex_state.transitions.iter().find(|t| t.contains(c)) else {
                break;
            };
            cursor.advance_char(self.src);
            if transition.skip && accepted.is_none() {
                token_start = cursor;
            }
            state = transition.next as usize;
            if let Some(symbol) = states[state].accept {
                accepted = Some((symbol, cursor, states[state].is_keyword));
            }
        }

        if let Some((_, end, _)) = accepted {
            if end.offset == token_start.offset {
                if self.last_zero_width == Some(token_start.offset) {
                    accepted = None;
                } else {
                    self.last_zero_width = Some(token_start.offset);
                }
            }
        }

        match accepted {
            Some((mut symbol, end, is_keyword)) => {
                self.pos = end;
                if is_keyword && Some(symbol) == self.language.keyword_capture() {
                    if let Some(keyword) = self.keyword_relex(token_start, end) {
                        symbol = keyword;
                    }
                }
                self.make_token(symbol, token_start, end)
            }
            None => {
                if token_start.at_eof(self.src) {
                    self.pos = token_start;
                    return Token::eof(self.src.len() as u32, token_start.point);
                }
                // Lexical error: consume one code point and let the
                // parse table reject it.
                let mut end = token_start;
                end.advance_char(self.src);
                self.pos = end;
                self.make_token(ERROR_SENTINEL, token_start, end)
            }
        }
    }

    fn skip_to_byte(&mut self, offset: u32) -> Option<Token<'s>> {
        self.pos.seek(self.src, offset);
        self.last_zero_width = None;
        if let Some(hook) = self.scanner.as_mut() {
            hook.zero_width_at = None;
        }
        Some(self.next_token())
    }
}
