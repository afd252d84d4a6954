//! Hand-built language descriptors for engine tests.
//!
//! Real grammars ship vendored tables; these fixtures are small enough
//! to verify by hand while still exercising shifts, reduces, gotos,
//! extras, fields, forking, and recovery.

use std::sync::Arc;

use sylva_core::{
    ActionEntry, GotoEntry, Language, LexState, LexTransition, ParseAction, Production,
    RawLanguage, SymbolInfo,
};

/// Flat word lists with whitespace extras.
///
/// ```text
/// program   := item_list
/// item_list := item_list item | item
/// item      := word            (field 1 "content")
/// ```
///
/// Tokens: 0 end, 1 word (`[a-z]+`), 2 ws (`' '+`, extra). Newlines are
/// skipped by the DFA.
pub fn words() -> Arc<Language> {
    let raw = RawLanguage {
        name: "words".to_owned(),
        token_count: 3,
        state_count: 6,
        root_symbol: Some(5),
        symbols: vec![
            SymbolInfo::named("end"),
            SymbolInfo::named("word"),
            SymbolInfo::anonymous("ws"),
            SymbolInfo::named("item"),
            SymbolInfo::named("item_list"),
            SymbolInfo::named("program"),
        ],
        fields: vec!["content".to_owned()],
        productions: vec![
            Production::with_fields(3, vec![1]),
            Production::new(4, 1),
            Production::new(4, 2),
            Production::new(5, 1),
        ],
        actions: vec![
            entry(0, 1, vec![ParseAction::shift(1)]),
            entry(0, 2, vec![ParseAction::shift_extra()]),
            entry(1, 0, vec![ParseAction::reduce(0)]),
            entry(1, 1, vec![ParseAction::reduce(0)]),
            entry(1, 2, vec![ParseAction::shift_extra()]),
            entry(2, 0, vec![ParseAction::reduce(1)]),
            entry(2, 1, vec![ParseAction::reduce(1)]),
            entry(2, 2, vec![ParseAction::shift_extra()]),
            entry(3, 0, vec![ParseAction::reduce(3)]),
            entry(3, 1, vec![ParseAction::shift(1)]),
            entry(3, 2, vec![ParseAction::shift_extra()]),
            entry(4, 0, vec![ParseAction::reduce(2)]),
            entry(4, 1, vec![ParseAction::reduce(2)]),
            entry(4, 2, vec![ParseAction::shift_extra()]),
            entry(5, 0, vec![ParseAction::accept()]),
            entry(5, 2, vec![ParseAction::shift_extra()]),
        ],
        gotos: vec![
            GotoEntry {
                state: 0,
                symbol: 3,
                target: 2,
            },
            GotoEntry {
                state: 0,
                symbol: 4,
                target: 3,
            },
            GotoEntry {
                state: 0,
                symbol: 5,
                target: 5,
            },
            GotoEntry {
                state: 3,
                symbol: 3,
                target: 4,
            },
        ],
        lex_states: vec![
            LexState {
                transitions: vec![
                    LexTransition::new('a', 'z', 1),
                    LexTransition::new(' ', ' ', 2),
                    LexTransition::skip('\n', '\n', 0),
                ],
                ..Default::default()
            },
            LexState {
                transitions: vec![LexTransition::new('a', 'z', 1)],
                accept: Some(1),
                ..Default::default()
            },
            LexState {
                transitions: vec![LexTransition::new(' ', ' ', 2)],
                accept: Some(2),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    Arc::new(Language::from_raw(raw).expect("words fixture is valid"))
}

/// One-token grammar whose only action set is ambiguous: the token
/// reduces to `noun` (dynamic precedence 5) or `verb` (0), and both
/// paths converge on `root`.
pub fn ambiguous() -> Arc<Language> {
    let raw = RawLanguage {
        name: "ambiguous".to_owned(),
        token_count: 2,
        state_count: 5,
        root_symbol: Some(4),
        symbols: vec![
            SymbolInfo::named("end"),
            SymbolInfo::named("tok"),
            SymbolInfo::named("noun"),
            SymbolInfo::named("verb"),
            SymbolInfo::named("root"),
        ],
        productions: vec![
            Production::new(2, 1),
            Production::new(3, 1),
            Production::new(4, 1),
            Production::new(4, 1),
        ],
        actions: vec![
            entry(0, 1, vec![ParseAction::shift(1)]),
            entry(
                1,
                0,
                vec![ParseAction::reduce_prec(0, 5), ParseAction::reduce_prec(1, 0)],
            ),
            entry(2, 0, vec![ParseAction::reduce(2)]),
            entry(3, 0, vec![ParseAction::reduce(3)]),
            entry(4, 0, vec![ParseAction::accept()]),
        ],
        gotos: vec![
            GotoEntry {
                state: 0,
                symbol: 2,
                target: 2,
            },
            GotoEntry {
                state: 0,
                symbol: 3,
                target: 3,
            },
            GotoEntry {
                state: 0,
                symbol: 4,
                target: 4,
            },
        ],
        lex_states: vec![
            LexState {
                transitions: vec![LexTransition::new('a', 'z', 1)],
                ..Default::default()
            },
            LexState {
                transitions: vec![LexTransition::new('a', 'z', 1)],
                accept: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    Arc::new(Language::from_raw(raw).expect("ambiguous fixture is valid"))
}

/// Single `key = value` pair with labeled children, for recovery tests.
pub fn pairs() -> Arc<Language> {
    let raw = RawLanguage {
        name: "pairs".to_owned(),
        token_count: 4,
        state_count: 5,
        root_symbol: Some(4),
        symbols: vec![
            SymbolInfo::named("end"),
            SymbolInfo::named("key"),
            SymbolInfo::anonymous("="),
            SymbolInfo::named("value"),
            SymbolInfo::named("pair"),
        ],
        fields: vec!["name".to_owned(), "value".to_owned()],
        productions: vec![Production::with_fields(4, vec![1, 0, 2])],
        actions: vec![
            entry(0, 1, vec![ParseAction::shift(1)]),
            entry(1, 2, vec![ParseAction::shift(2)]),
            entry(2, 3, vec![ParseAction::shift(3)]),
            entry(3, 0, vec![ParseAction::reduce(0)]),
            entry(4, 0, vec![ParseAction::accept()]),
        ],
        gotos: vec![GotoEntry {
            state: 0,
            symbol: 4,
            target: 4,
        }],
        lex_states: vec![
            LexState {
                transitions: vec![
                    LexTransition::new('a', 'z', 1),
                    LexTransition::new('=', '=', 2),
                    LexTransition::new('0', '9', 3),
                    LexTransition::skip(' ', ' ', 0),
                ],
                ..Default::default()
            },
            LexState {
                transitions: vec![LexTransition::new('a', 'z', 1)],
                accept: Some(1),
                ..Default::default()
            },
            LexState {
                accept: Some(2),
                ..Default::default()
            },
            LexState {
                transitions: vec![LexTransition::new('0', '9', 3)],
                accept: Some(3),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    Arc::new(Language::from_raw(raw).expect("pairs fixture is valid"))
}

fn entry(state: u16, symbol: u16, actions: Vec<ParseAction>) -> ActionEntry {
    ActionEntry {
        state,
        symbol,
        actions,
    }
}

/// Structural tree equality: symbols, spans, flags, fields, and shape.
pub fn trees_equal(a: crate::Node<'_>, b: crate::Node<'_>) -> bool {
    if a.symbol() != b.symbol()
        || a.start_byte() != b.start_byte()
        || a.end_byte() != b.end_byte()
        || a.is_named() != b.is_named()
        || a.is_missing() != b.is_missing()
        || a.is_extra() != b.is_extra()
        || a.has_error() != b.has_error()
        || a.child_count() != b.child_count()
    {
        return false;
    }
    for i in 0..a.child_count() {
        if a.field_id_for_child(i) != b.field_id_for_child(i) {
            return false;
        }
        let (Some(ca), Some(cb)) = (a.child(i), b.child(i)) else {
            return false;
        };
        if !trees_equal(ca, cb) {
            return false;
        }
    }
    true
}
