//! Language descriptors.
//!
//! A [`RawLanguage`] is the serde-visible form of one grammar: symbol
//! metadata, the sparse action/goto tables, the extracted lexer DFA, and
//! optional external-scanner data. [`Language::from_raw`] validates every
//! table index and compiles hash lookups for the driver. No partially
//! valid descriptor is ever returned.

mod binary;
mod json;
mod types;

#[cfg(test)]
mod binary_tests;
#[cfg(test)]
mod json_tests;

pub use json::DecodeError;
pub use types::{
    ActionEntry, ActionKind, AliasInfo, CharacterSet, GotoEntry, LexState, LexTransition,
    ParseAction, Production, SymbolInfo,
};

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::scanner::{ProgramError, ScannerProgram};
use crate::{FieldId, ProductionId, StateId, Symbol};

/// Raw descriptor, 1:1 with the serialized layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLanguage {
    pub name: String,
    /// Terminal symbols occupy ids `0..token_count`; symbol 0 is EOF.
    pub token_count: u16,
    pub state_count: u16,
    /// States below this id use the dense action layout in the upstream
    /// encoding. Metadata only; lookups here are uniform.
    #[serde(default)]
    pub large_state_count: u16,
    pub symbols: Vec<SymbolInfo>,
    /// Symbol produced by the grammar's start rule, used when error
    /// recovery has to synthesize a root.
    #[serde(default)]
    pub root_symbol: Option<Symbol>,
    #[serde(default)]
    pub aliases: Vec<AliasInfo>,
    /// Field names for ids `1..=fields.len()`.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub productions: Vec<Production>,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
    #[serde(default)]
    pub gotos: Vec<GotoEntry>,
    #[serde(default)]
    pub lex_states: Vec<LexState>,
    #[serde(default)]
    pub keyword_lex_states: Vec<LexState>,
    #[serde(default)]
    pub keyword_capture: Option<Symbol>,
    #[serde(default)]
    pub char_sets: IndexMap<String, CharacterSet>,
    #[serde(default)]
    pub external_tokens: Vec<String>,
    #[serde(default)]
    pub scanner_program: Option<ScannerProgram>,
}

/// Descriptor validation failure. Construction is strict: the first
/// violation aborts with no partial parser state.
#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    #[error("descriptor has no symbols")]
    NoSymbols,

    #[error("token count {token_count} exceeds symbol count {symbol_count}")]
    TokenCount { token_count: u16, symbol_count: u16 },

    #[error("descriptor has no states")]
    NoStates,

    #[error("{table} entry references state {state} (state count {state_count})")]
    StateOutOfRange {
        table: &'static str,
        state: StateId,
        state_count: u16,
    },

    #[error("{table} entry references symbol {symbol} (symbol count {symbol_count})")]
    SymbolOutOfRange {
        table: &'static str,
        symbol: Symbol,
        symbol_count: u16,
    },

    #[error("duplicate {table} entry for state {state}, symbol {symbol}")]
    DuplicateEntry {
        table: &'static str,
        state: StateId,
        symbol: Symbol,
    },

    #[error("action for state {state}, symbol {symbol} has no alternatives")]
    EmptyActionList { state: StateId, symbol: Symbol },

    #[error("reduce action references production {production} (production count {count})")]
    ProductionOutOfRange { production: ProductionId, count: u16 },

    #[error("production {index} has {field_count} field ids for {child_count} children")]
    FieldArity {
        index: usize,
        field_count: usize,
        child_count: u16,
    },

    #[error("production {index} references field id {field} (field count {count})")]
    FieldOutOfRange {
        index: usize,
        field: FieldId,
        count: u16,
    },

    #[error("alias {index} references symbol {symbol} (symbol count {symbol_count})")]
    AliasOutOfRange {
        index: usize,
        symbol: Symbol,
        symbol_count: u16,
    },

    #[error("{dfa} state {state} transition targets state {target} (state count {count})")]
    LexTargetOutOfRange {
        dfa: &'static str,
        state: usize,
        target: u16,
        count: usize,
    },

    #[error("{dfa} state {state} has inverted range {lo:?}..={hi:?}")]
    LexInvertedRange {
        dfa: &'static str,
        state: usize,
        lo: char,
        hi: char,
    },

    #[error("{dfa} state {state} accepts symbol {symbol} (token count {token_count})")]
    LexAcceptOutOfRange {
        dfa: &'static str,
        state: usize,
        symbol: Symbol,
        token_count: u16,
    },

    #[error("keyword capture symbol {symbol} is not a token (token count {token_count})")]
    KeywordCaptureOutOfRange { symbol: Symbol, token_count: u16 },

    #[error("character set {name:?} has inverted range {lo:?}..={hi:?}")]
    CharSetInvertedRange { name: String, lo: char, hi: char },

    #[error("scanner program: {0}")]
    Scanner(#[from] ProgramError),
}

/// Immutable, validated description of one grammar. Freely shareable
/// across threads; parsers borrow it for their whole lifetime.
#[derive(Debug, Clone)]
pub struct Language {
    name: String,
    token_count: u16,
    state_count: u16,
    large_state_count: u16,
    symbols: Vec<SymbolInfo>,
    root_symbol: Option<Symbol>,
    aliases: Vec<AliasInfo>,
    /// Index 0 is the "no field" slot.
    field_names: Vec<String>,
    productions: Vec<Production>,
    actions: HashMap<(StateId, Symbol), Vec<ParseAction>>,
    gotos: HashMap<(StateId, Symbol), StateId>,
    lex_states: Vec<LexState>,
    keyword_lex_states: Vec<LexState>,
    keyword_capture: Option<Symbol>,
    char_sets: IndexMap<String, CharacterSet>,
    external_tokens: Vec<String>,
    scanner_program: Option<ScannerProgram>,
    symbols_by_name: IndexMap<String, Vec<Symbol>>,
}

impl Language {
    /// Validate and compile a raw descriptor.
    pub fn from_raw(raw: RawLanguage) -> Result<Self, LanguageError> {
        validate(&raw)?;

        let mut actions = HashMap::with_capacity(raw.actions.len());
        for entry in &raw.actions {
            actions.insert((entry.state, entry.symbol), entry.actions.clone());
        }
        let mut gotos = HashMap::with_capacity(raw.gotos.len());
        for entry in &raw.gotos {
            gotos.insert((entry.state, entry.symbol), entry.target);
        }

        let mut symbols_by_name: IndexMap<String, Vec<Symbol>> = IndexMap::new();
        for (id, info) in raw.symbols.iter().enumerate() {
            symbols_by_name
                .entry(info.name.clone())
                .or_default()
                .push(id as Symbol);
        }

        let mut field_names = Vec::with_capacity(raw.fields.len() + 1);
        field_names.push(String::new());
        field_names.extend(raw.fields);

        Ok(Self {
            name: raw.name,
            token_count: raw.token_count,
            state_count: raw.state_count,
            large_state_count: raw.large_state_count,
            symbols: raw.symbols,
            root_symbol: raw.root_symbol,
            aliases: raw.aliases,
            field_names,
            productions: raw.productions,
            actions,
            gotos,
            lex_states: raw.lex_states,
            keyword_lex_states: raw.keyword_lex_states,
            keyword_capture: raw.keyword_capture,
            char_sets: raw.char_sets,
            external_tokens: raw.external_tokens,
            scanner_program: raw.scanner_program,
            symbols_by_name,
        })
    }

    /// Reconstruct the raw form, with table entries in `(state, symbol)`
    /// order so serialization is deterministic.
    pub fn to_raw(&self) -> RawLanguage {
        let mut actions: Vec<ActionEntry> = self
            .actions
            .iter()
            .map(|(&(state, symbol), list)| ActionEntry {
                state,
                symbol,
                actions: list.clone(),
            })
            .collect();
        actions.sort_by_key(|e| (e.state, e.symbol));

        let mut gotos: Vec<GotoEntry> = self
            .gotos
            .iter()
            .map(|(&(state, symbol), &target)| GotoEntry {
                state,
                symbol,
                target,
            })
            .collect();
        gotos.sort_by_key(|e| (e.state, e.symbol));

        RawLanguage {
            name: self.name.clone(),
            token_count: self.token_count,
            state_count: self.state_count,
            large_state_count: self.large_state_count,
            symbols: self.symbols.clone(),
            root_symbol: self.root_symbol,
            aliases: self.aliases.clone(),
            fields: self.field_names[1..].to_vec(),
            productions: self.productions.clone(),
            actions,
            gotos,
            lex_states: self.lex_states.clone(),
            keyword_lex_states: self.keyword_lex_states.clone(),
            keyword_capture: self.keyword_capture,
            char_sets: self.char_sets.clone(),
            external_tokens: self.external_tokens.clone(),
            scanner_program: self.scanner_program.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol_count(&self) -> u16 {
        self.symbols.len() as u16
    }

    pub fn alias_count(&self) -> u16 {
        self.aliases.len() as u16
    }

    pub fn token_count(&self) -> u16 {
        self.token_count
    }

    pub fn field_count(&self) -> u16 {
        (self.field_names.len() - 1) as u16
    }

    pub fn state_count(&self) -> u16 {
        self.state_count
    }

    pub fn large_state_count(&self) -> u16 {
        self.large_state_count
    }

    pub fn production_count(&self) -> u16 {
        self.productions.len() as u16
    }

    pub fn symbol_name(&self, symbol: Symbol) -> Option<&str> {
        self.symbols.get(symbol as usize).map(|s| s.name.as_str())
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol as usize)
            .is_some_and(|s| s.named)
    }

    pub fn is_visible(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol as usize)
            .is_some_and(|s| s.visible)
    }

    /// Symbol produced by the grammar's start rule, when declared.
    pub fn root_symbol(&self) -> Option<Symbol> {
        self.root_symbol
    }

    /// First symbol with this grammar-defined name, if any.
    pub fn symbol_by_name(&self, name: &str) -> Option<Symbol> {
        self.symbols_by_name.get(name)?.first().copied()
    }

    /// All *token* symbols sharing this name, in id order. Grammars with
    /// context-sensitive lexing commonly define several tokens with the
    /// same visible name.
    pub fn token_symbols_by_name(&self, name: &str) -> Vec<Symbol> {
        match self.symbols_by_name.get(name) {
            Some(ids) => ids
                .iter()
                .copied()
                .filter(|&s| s < self.token_count)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.field_names[1..]
            .iter()
            .position(|f| f == name)
            .map(|i| (i + 1) as FieldId)
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        if field == 0 {
            return None;
        }
        self.field_names.get(field as usize).map(|s| s.as_str())
    }

    /// Action alternatives for `(state, symbol)`; empty when the table
    /// has no entry.
    pub fn lookup_actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        self.actions
            .get(&(state, symbol))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup_goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.gotos.get(&(state, symbol)).copied()
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id as usize]
    }

    pub fn lex_states(&self) -> &[LexState] {
        &self.lex_states
    }

    pub fn keyword_lex_states(&self) -> &[LexState] {
        &self.keyword_lex_states
    }

    pub fn keyword_capture(&self) -> Option<Symbol> {
        self.keyword_capture
    }

    pub fn char_set(&self, name: &str) -> Option<&CharacterSet> {
        self.char_sets.get(name)
    }

    /// Membership in a named character-set table.
    pub fn set_contains(&self, name: &str, c: char) -> bool {
        self.char_sets.get(name).is_some_and(|set| set.contains(c))
    }

    pub fn external_tokens(&self) -> &[String] {
        &self.external_tokens
    }

    pub fn scanner_program(&self) -> Option<&ScannerProgram> {
        self.scanner_program.as_ref()
    }
}

fn validate(raw: &RawLanguage) -> Result<(), LanguageError> {
    if raw.symbols.is_empty() {
        return Err(LanguageError::NoSymbols);
    }
    let symbol_count = raw.symbols.len() as u16;
    if raw.token_count == 0 || raw.token_count > symbol_count {
        return Err(LanguageError::TokenCount {
            token_count: raw.token_count,
            symbol_count,
        });
    }
    if raw.state_count == 0 {
        return Err(LanguageError::NoStates);
    }

    let production_count = raw.productions.len() as u16;
    let field_count = raw.fields.len() as u16;

    if let Some(root) = raw.root_symbol {
        if root >= symbol_count {
            return Err(LanguageError::SymbolOutOfRange {
                table: "root",
                symbol: root,
                symbol_count,
            });
        }
    }

    for (index, prod) in raw.productions.iter().enumerate() {
        if prod.symbol >= symbol_count {
            return Err(LanguageError::SymbolOutOfRange {
                table: "production",
                symbol: prod.symbol,
                symbol_count,
            });
        }
        if !prod.field_ids.is_empty() && prod.field_ids.len() != prod.child_count as usize {
            return Err(LanguageError::FieldArity {
                index,
                field_count: prod.field_ids.len(),
                child_count: prod.child_count,
            });
        }
        for &field in &prod.field_ids {
            if field > field_count {
                return Err(LanguageError::FieldOutOfRange {
                    index,
                    field,
                    count: field_count,
                });
            }
        }
    }

    for (index, alias) in raw.aliases.iter().enumerate() {
        if alias.symbol >= symbol_count {
            return Err(LanguageError::AliasOutOfRange {
                index,
                symbol: alias.symbol,
                symbol_count,
            });
        }
    }

    let mut seen_actions = std::collections::HashSet::new();
    for entry in &raw.actions {
        if entry.state >= raw.state_count {
            return Err(LanguageError::StateOutOfRange {
                table: "action",
                state: entry.state,
                state_count: raw.state_count,
            });
        }
        if entry.symbol >= symbol_count {
            return Err(LanguageError::SymbolOutOfRange {
                table: "action",
                symbol: entry.symbol,
                symbol_count,
            });
        }
        if !seen_actions.insert((entry.state, entry.symbol)) {
            return Err(LanguageError::DuplicateEntry {
                table: "action",
                state: entry.state,
                symbol: entry.symbol,
            });
        }
        if entry.actions.is_empty() {
            return Err(LanguageError::EmptyActionList {
                state: entry.state,
                symbol: entry.symbol,
            });
        }
        for action in &entry.actions {
            match action.kind {
                ActionKind::Shift { state } => {
                    if state >= raw.state_count {
                        return Err(LanguageError::StateOutOfRange {
                            table: "shift",
                            state,
                            state_count: raw.state_count,
                        });
                    }
                }
                ActionKind::Reduce { production } => {
                    if production >= production_count {
                        return Err(LanguageError::ProductionOutOfRange {
                            production,
                            count: production_count,
                        });
                    }
                }
                ActionKind::Accept | ActionKind::Recover => {}
            }
        }
    }

    let mut seen_gotos = std::collections::HashSet::new();
    for entry in &raw.gotos {
        if entry.state >= raw.state_count || entry.target >= raw.state_count {
            let state = if entry.state >= raw.state_count {
                entry.state
            } else {
                entry.target
            };
            return Err(LanguageError::StateOutOfRange {
                table: "goto",
                state,
                state_count: raw.state_count,
            });
        }
        if entry.symbol >= symbol_count {
            return Err(LanguageError::SymbolOutOfRange {
                table: "goto",
                symbol: entry.symbol,
                symbol_count,
            });
        }
        if !seen_gotos.insert((entry.state, entry.symbol)) {
            return Err(LanguageError::DuplicateEntry {
                table: "goto",
                state: entry.state,
                symbol: entry.symbol,
            });
        }
    }

    validate_dfa("lex dfa", &raw.lex_states, raw.token_count)?;
    validate_dfa("keyword dfa", &raw.keyword_lex_states, raw.token_count)?;

    if let Some(capture) = raw.keyword_capture {
        if capture >= raw.token_count {
            return Err(LanguageError::KeywordCaptureOutOfRange {
                symbol: capture,
                token_count: raw.token_count,
            });
        }
    }

    for (name, set) in &raw.char_sets {
        for &(lo, hi) in &set.ranges {
            if lo > hi {
                return Err(LanguageError::CharSetInvertedRange {
                    name: name.clone(),
                    lo,
                    hi,
                });
            }
        }
    }

    if let Some(program) = &raw.scanner_program {
        program.validate()?;
    }

    Ok(())
}

fn validate_dfa(
    dfa: &'static str,
    states: &[LexState],
    token_count: u16,
) -> Result<(), LanguageError> {
    let count = states.len();
    for (index, state) in states.iter().enumerate() {
        for transition in &state.transitions {
            if transition.lo > transition.hi {
                return Err(LanguageError::LexInvertedRange {
                    dfa,
                    state: index,
                    lo: transition.lo,
                    hi: transition.hi,
                });
            }
            if transition.next as usize >= count {
                return Err(LanguageError::LexTargetOutOfRange {
                    dfa,
                    state: index,
                    target: transition.next,
                    count,
                });
            }
        }
        if let Some(target) = state.eof_target {
            if target as usize >= count {
                return Err(LanguageError::LexTargetOutOfRange {
                    dfa,
                    state: index,
                    target,
                    count,
                });
            }
        }
        if let Some(symbol) = state.accept {
            if symbol >= token_count {
                return Err(LanguageError::LexAcceptOutOfRange {
                    dfa,
                    state: index,
                    symbol,
                    token_count,
                });
            }
        }
    }
    Ok(())
}
