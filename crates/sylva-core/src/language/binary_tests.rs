use super::*;
use crate::scanner::{self, ScannerProgram};

fn sample_language() -> Language {
    let raw = RawLanguage {
        name: "pairs".to_owned(),
        token_count: 3,
        state_count: 2,
        symbols: vec![
            SymbolInfo::named("end"),
            SymbolInfo::named("bare_key"),
            SymbolInfo::anonymous("="),
            SymbolInfo::named("pair"),
        ],
        fields: vec!["key".to_owned()],
        productions: vec![Production::with_fields(3, vec![1, 0])],
        actions: vec![
            ActionEntry {
                state: 0,
                symbol: 1,
                actions: vec![ParseAction::shift(1)],
            },
            ActionEntry {
                state: 1,
                symbol: 0,
                actions: vec![ParseAction::accept()],
            },
        ],
        gotos: vec![GotoEntry {
            state: 0,
            symbol: 3,
            target: 1,
        }],
        external_tokens: vec!["raw_text".to_owned()],
        scanner_program: Some(ScannerProgram::new(vec![
            scanner::if_rune_eq('#', 2),
            scanner::emit(1),
            scanner::fail(),
        ])),
        ..Default::default()
    };
    Language::from_raw(raw).unwrap()
}

#[test]
fn binary_round_trip() {
    let lang = sample_language();
    let bytes = lang.to_binary();
    let rebuilt = Language::from_binary(&bytes).unwrap();
    assert_eq!(rebuilt.name(), lang.name());
    assert_eq!(rebuilt.symbol_count(), lang.symbol_count());
    assert_eq!(rebuilt.lookup_actions(0, 1), lang.lookup_actions(0, 1));
    assert_eq!(rebuilt.lookup_goto(0, 3), lang.lookup_goto(0, 3));
    assert_eq!(rebuilt.external_tokens(), lang.external_tokens());
    assert_eq!(
        rebuilt.scanner_program().unwrap().code,
        lang.scanner_program().unwrap().code
    );
}

#[test]
fn binary_is_smaller_than_json() {
    let lang = sample_language();
    assert!(lang.to_binary().len() < lang.to_json().len());
}

#[test]
fn binary_rejects_garbage() {
    assert!(matches!(
        Language::from_binary(&[0xff, 0xfe, 0xfd]),
        Err(DecodeError::Binary(_))
    ));
}
