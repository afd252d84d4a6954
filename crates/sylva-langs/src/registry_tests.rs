use std::sync::Arc;

use sylva_core::{scanner, Language, LexState, LexTransition, RawLanguage, SymbolInfo};

use sylva_engine::TokenSource;

use crate::test_support::names_language;
use crate::{GenericTokenSource, LangEntry, ParseBackend, Registry};

fn generic_new_or_eof<'s>(src: &'s [u8], language: &Language) -> Box<dyn TokenSource<'s> + 's> {
    GenericTokenSource::new_or_eof(src, language)
}

fn dfa_language(external_tokens: Vec<String>, with_scanner: bool) -> Arc<Language> {
    let raw = RawLanguage {
        name: "fixture".to_owned(),
        token_count: 2,
        state_count: 1,
        symbols: vec![SymbolInfo::named("end"), SymbolInfo::named("word")],
        lex_states: vec![LexState {
            transitions: vec![LexTransition::new('a', 'z', 0)],
            accept: Some(1),
            ..Default::default()
        }],
        external_tokens,
        scanner_program: with_scanner.then(|| {
            sylva_core::ScannerProgram::new(vec![scanner::fail()])
        }),
        ..Default::default()
    };
    Arc::new(Language::from_raw(raw).expect("fixture is valid"))
}

#[test]
fn token_source_entries_report_token_source_backend() {
    let mut registry = Registry::new();
    registry.register(
        LangEntry::new("c-like", names_language("c-like", &[("end", true)]))
            .with_token_source(generic_new_or_eof),
    );

    let reports = registry.audit_parse_support();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].backend, ParseBackend::TokenSource);
}

#[test]
fn dfa_with_unscanned_external_tokens_is_partial() {
    let mut registry = Registry::new();
    registry.register(LangEntry::new(
        "partial",
        dfa_language(vec!["raw_text".to_owned()], false),
    ));

    let reports = registry.audit_parse_support();
    assert_eq!(reports[0].backend, ParseBackend::DfaPartial);
    assert!(reports[0].reason.contains("external token"));
}

#[test]
fn dfa_with_scanner_program_is_full() {
    let mut registry = Registry::new();
    registry.register(LangEntry::new(
        "full",
        dfa_language(vec!["raw_text".to_owned()], true),
    ));

    let reports = registry.audit_parse_support();
    assert_eq!(reports[0].backend, ParseBackend::Dfa);
}

#[test]
fn no_lexer_at_all_is_unsupported() {
    let mut registry = Registry::new();
    registry.register(LangEntry::new(
        "bare",
        names_language("bare", &[("end", true)]),
    ));

    let reports = registry.audit_parse_support();
    assert_eq!(reports[0].backend, ParseBackend::Unsupported);
}

#[test]
fn lookup_by_name_and_order() {
    let mut registry = Registry::new();
    registry.register(LangEntry::new("one", names_language("one", &[("end", true)])));
    registry.register(LangEntry::new("two", names_language("two", &[("end", true)])));

    assert!(registry.get("one").is_some());
    assert!(registry.get("missing").is_none());
    let names: Vec<&str> = registry.all().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn backend_display_names() {
    assert_eq!(ParseBackend::Dfa.to_string(), "dfa");
    assert_eq!(ParseBackend::DfaPartial.to_string(), "dfa-partial");
    assert_eq!(ParseBackend::TokenSource.to_string(), "token-source");
    assert_eq!(ParseBackend::Unsupported.to_string(), "unsupported");
}
