//! Descriptor type definitions.
//!
//! These are the serde-visible raw structs. [`crate::Language`] compiles
//! them into lookup-friendly form.

use serde::{Deserialize, Serialize};

use crate::{FieldId, ProductionId, StateId, Symbol};

/// Metadata for one grammar symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    /// Named nodes appear in queries by type name; anonymous nodes are
    /// literal lexemes.
    pub named: bool,
    /// Hidden symbols (rule names starting with `_` in the grammar) do
    /// not surface in the tree.
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

impl SymbolInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: true,
            visible: true,
        }
    }

    pub fn anonymous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: false,
            visible: true,
        }
    }

    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: true,
            visible: false,
        }
    }
}

/// A node rename applied in specific productions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasInfo {
    pub symbol: Symbol,
    pub value: String,
    pub named: bool,
}

/// One grammar rule expansion, used by reduce actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Production {
    /// Symbol produced by the reduction.
    pub symbol: Symbol,
    /// Number of stack entries popped.
    pub child_count: u16,
    /// Field id per child position. Either empty (no fields) or exactly
    /// `child_count` entries, 0 meaning "no field".
    #[serde(default)]
    pub field_ids: Vec<FieldId>,
}

impl Production {
    pub fn new(symbol: Symbol, child_count: u16) -> Self {
        Self {
            symbol,
            child_count,
            field_ids: Vec::new(),
        }
    }

    pub fn with_fields(symbol: Symbol, field_ids: Vec<FieldId>) -> Self {
        Self {
            symbol,
            child_count: field_ids.len() as u16,
            field_ids,
        }
    }
}

/// What the driver does for one `(state, symbol)` alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Shift { state: StateId },
    Reduce { production: ProductionId },
    Accept,
    Recover,
}

/// One parse-table action with its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseAction {
    pub kind: ActionKind,
    /// Extra tokens are shifted without changing the LR state.
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub repeat: bool,
    /// Accumulated into the stack score on reduce; breaks ambiguity at
    /// merge points.
    #[serde(default)]
    pub dynamic_precedence: i32,
}

impl ParseAction {
    pub fn shift(state: StateId) -> Self {
        Self {
            kind: ActionKind::Shift { state },
            extra: false,
            repeat: false,
            dynamic_precedence: 0,
        }
    }

    pub fn shift_extra() -> Self {
        Self {
            // The target state is ignored for extra shifts; the driver
            // keeps the current state.
            kind: ActionKind::Shift { state: 0 },
            extra: true,
            repeat: false,
            dynamic_precedence: 0,
        }
    }

    pub fn reduce(production: ProductionId) -> Self {
        Self {
            kind: ActionKind::Reduce { production },
            extra: false,
            repeat: false,
            dynamic_precedence: 0,
        }
    }

    pub fn reduce_prec(production: ProductionId, dynamic_precedence: i32) -> Self {
        Self {
            kind: ActionKind::Reduce { production },
            extra: false,
            repeat: false,
            dynamic_precedence,
        }
    }

    pub fn accept() -> Self {
        Self {
            kind: ActionKind::Accept,
            extra: false,
            repeat: false,
            dynamic_precedence: 0,
        }
    }
}

/// Sparse parse-table row: the action alternatives for one
/// `(state, symbol)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    pub state: StateId,
    pub symbol: Symbol,
    pub actions: Vec<ParseAction>,
}

/// Sparse goto-table row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GotoEntry {
    pub state: StateId,
    pub symbol: Symbol,
    pub target: StateId,
}

/// One DFA edge: code points in `[lo, hi]` move to `next`. Skip edges
/// advance the cursor without extending the token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LexTransition {
    pub lo: char,
    pub hi: char,
    pub next: u16,
    #[serde(default)]
    pub skip: bool,
}

impl LexTransition {
    pub fn new(lo: char, hi: char, next: u16) -> Self {
        Self {
            lo,
            hi,
            next,
            skip: false,
        }
    }

    pub fn skip(lo: char, hi: char, next: u16) -> Self {
        Self {
            lo,
            hi,
            next,
            skip: true,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.lo <= c && c <= self.hi
    }
}

/// One node in the lexer automaton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexState {
    #[serde(default)]
    pub transitions: Vec<LexTransition>,
    /// Symbol accepted on entering this state, if any.
    #[serde(default)]
    pub accept: Option<Symbol>,
    /// Accepting states for the keyword-capture token are re-lexed
    /// against the keyword DFA.
    #[serde(default)]
    pub is_keyword: bool,
    /// State entered when the cursor sits at end-of-input.
    #[serde(default)]
    pub eof_target: Option<u16>,
}

/// A union of inclusive code-point ranges, used by `set_contains`
/// conditions in extracted lexer tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterSet {
    pub ranges: Vec<(char, char)>,
}

impl CharacterSet {
    pub fn new(ranges: Vec<(char, char)>) -> Self {
        Self { ranges }
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }
}
