//! Language registry and parse-backend audit.
//!
//! Grammar vendoring is out of scope for the runtime crates; callers
//! register the descriptors they ship. The audit classifies each entry
//! by the lexing backend it will actually use and surfaces degraded
//! (`DfaPartial`) status instead of guessing at missing behavior.

use std::fmt;
use std::sync::Arc;

use sylva_core::Language;
use sylva_engine::TokenSource;

/// How a language's tokens are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseBackend {
    /// Full lexer DFA extracted from the grammar.
    Dfa,
    /// Lexer DFA present, but external-scanner tokens are knowingly
    /// approximated.
    DfaPartial,
    /// Hand-written token source.
    TokenSource,
    Unsupported,
}

impl fmt::Display for ParseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseBackend::Dfa => "dfa",
            ParseBackend::DfaPartial => "dfa-partial",
            ParseBackend::TokenSource => "token-source",
            ParseBackend::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Builds a token source over a buffer for one registered language.
pub type TokenSourceFactory =
    for<'s> fn(&'s [u8], &Language) -> Box<dyn TokenSource<'s> + 's>;

/// One registered language.
pub struct LangEntry {
    pub name: String,
    pub language: Arc<Language>,
    pub token_source: Option<TokenSourceFactory>,
}

impl LangEntry {
    pub fn new(name: impl Into<String>, language: Arc<Language>) -> Self {
        Self {
            name: name.into(),
            language,
            token_source: None,
        }
    }

    pub fn with_token_source(mut self, factory: TokenSourceFactory) -> Self {
        self.token_source = Some(factory);
        self
    }
}

/// Audit result for one language.
#[derive(Debug, Clone)]
pub struct SupportReport {
    pub name: String,
    pub backend: ParseBackend,
    pub reason: String,
}

/// Registered languages, ordered by registration.
#[derive(Default)]
pub struct Registry {
    entries: Vec<LangEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: LangEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, name: &str) -> Option<&LangEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn all(&self) -> &[LangEntry] {
        &self.entries
    }

    /// Classify every registered language by its effective backend.
    pub fn audit_parse_support(&self) -> Vec<SupportReport> {
        self.entries
            .iter()
            .map(|entry| {
                let (backend, reason) = classify(entry);
                SupportReport {
                    name: entry.name.clone(),
                    backend,
                    reason,
                }
            })
            .collect()
    }
}

fn classify(entry: &LangEntry) -> (ParseBackend, String) {
    if entry.token_source.is_some() {
        return (
            ParseBackend::TokenSource,
            "hand-written token source".to_owned(),
        );
    }

    let language = &entry.language;
    if language.lex_states().is_empty() {
        return (
            ParseBackend::Unsupported,
            "no lexer DFA and no token source".to_owned(),
        );
    }

    if !language.external_tokens().is_empty() && language.scanner_program().is_none() {
        return (
            ParseBackend::DfaPartial,
            format!(
                "{} external token(s) approximated without a scanner program",
                language.external_tokens().len()
            ),
        );
    }

    (ParseBackend::Dfa, "lexer DFA".to_owned())
}
