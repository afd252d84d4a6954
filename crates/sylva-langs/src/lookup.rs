//! Name-indexed token symbol resolution.
//!
//! Grammar symbol ids are looked up by their grammar-defined names
//! (e.g. `"="`, `"bare_key"`, `"_line_ending_or_eof"`). Symbol 0 is the
//! EOF sentinel, so the bridges treat 0 as "absent".

use sylva_core::{Language, Symbol};

/// Tokenizer construction failure.
#[derive(Debug, thiserror::Error)]
pub enum LexerError {
    #[error("{lang} lexer: token symbol {name:?} not found")]
    MissingSymbol { lang: &'static str, name: String },

    #[error("{lang} lexer: missing number token symbols")]
    MissingNumberSymbols { lang: &'static str },

    #[error("{lang} lexer: no identifier-like token symbol found")]
    MissingIdentifier { lang: &'static str },
}

/// Records the first missing required name while resolving a batch of
/// symbols, so constructors can report one descriptive error.
pub struct TokenLookup<'l> {
    language: &'l Language,
    lang: &'static str,
    missing: Option<String>,
}

impl<'l> TokenLookup<'l> {
    pub fn new(language: &'l Language, lang: &'static str) -> Self {
        Self {
            language,
            lang,
            missing: None,
        }
    }

    /// Resolve a required name; absence is recorded and surfaced by
    /// [`finish`](Self::finish).
    pub fn require(&mut self, name: &str) -> Symbol {
        match self.language.symbol_by_name(name) {
            Some(symbol) if symbol != 0 => symbol,
            _ => {
                if self.missing.is_none() {
                    self.missing = Some(name.to_owned());
                }
                0
            }
        }
    }

    /// Resolve the first present name from a list of alternatives, or 0.
    pub fn optional(&self, names: &[&str]) -> Symbol {
        for name in names {
            if let Some(symbol) = self.language.symbol_by_name(name) {
                if symbol != 0 {
                    return symbol;
                }
            }
        }
        0
    }

    pub fn finish(self) -> Result<(), LexerError> {
        match self.missing {
            Some(name) => Err(LexerError::MissingSymbol {
                lang: self.lang,
                name,
            }),
            None => Ok(()),
        }
    }
}
