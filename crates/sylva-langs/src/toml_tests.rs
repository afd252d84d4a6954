use sylva_engine::TokenSource;

use crate::test_support::names_language;
use crate::TomlTokenSource;

fn toml_language() -> std::sync::Arc<sylva_core::Language> {
    names_language(
        "toml",
        &[
            ("end", true),
            ("document_token1", true),
            ("comment", true),
            ("bare_key", true),
            ("boolean", true),
            ("integer_token1", true),
            ("float_token1", true),
            ("_line_ending_or_eof", true),
            ("=", false),
            (".", false),
            (",", false),
            ("[", false),
            ("]", false),
            ("[[", false),
            ("]]", false),
            ("{", false),
            ("}", false),
            ("_basic_string_token1", true),
            ("_literal_string_token1", true),
        ],
    )
}

fn symbol(name: &str) -> u16 {
    toml_language().symbol_by_name(name).unwrap()
}

#[test]
fn construction_fails_without_required_symbols() {
    let lang = names_language("toml", &[("end", true)]);
    assert!(TomlTokenSource::new(b"a = 1\n", &lang).is_err());
}

#[test]
fn construction_fails_without_number_symbols() {
    let lang = names_language("toml", &[("end", true), ("bare_key", true)]);
    assert!(TomlTokenSource::new(b"a = 1\n", &lang).is_err());
}

#[test]
fn fallback_source_only_emits_eof() {
    let lang = names_language("toml", &[("end", true)]);
    let mut ts = TomlTokenSource::new_or_eof(b"a = 1\n", &lang);
    let tok = ts.next_token();
    assert!(tok.is_eof());
    assert_eq!(tok.start_byte, 6);
}

#[test]
fn lexes_key_value_lines() {
    let lang = toml_language();
    let src = b"a = true\n# note\n";
    let mut ts = TomlTokenSource::new(src, &lang).unwrap();

    let doc_start = ts.next_token();
    assert_eq!(doc_start.symbol, symbol("document_token1"));
    assert_eq!(doc_start.start_byte, doc_start.end_byte);

    let key = ts.next_token();
    assert_eq!(key.symbol, symbol("bare_key"));
    assert_eq!(key.text, b"a");

    assert_eq!(ts.next_token().symbol, symbol("="));

    let boolean = ts.next_token();
    assert_eq!(boolean.symbol, symbol("boolean"));
    assert_eq!(boolean.text, b"true");

    let line_end = ts.next_token();
    assert_eq!(line_end.symbol, symbol("_line_ending_or_eof"));
    assert_eq!(line_end.text, b"\n");

    let comment = ts.next_token();
    assert_eq!(comment.symbol, symbol("comment"));
    assert_eq!(comment.text, b"# note");

    assert_eq!(ts.next_token().symbol, symbol("_line_ending_or_eof"));
    assert!(ts.next_token().is_eof());
}

#[test]
fn classifies_numbers_and_punctuation() {
    let lang = toml_language();
    let src = b"x = [1, 2.5, 0xff]\n";
    let mut ts = TomlTokenSource::new(src, &lang).unwrap();

    let mut symbols = Vec::new();
    loop {
        let tok = ts.next_token();
        if tok.is_eof() {
            break;
        }
        symbols.push(tok.symbol);
    }
    assert_eq!(
        symbols,
        vec![
            symbol("document_token1"),
            symbol("bare_key"),
            symbol("="),
            symbol("["),
            symbol("integer_token1"),
            symbol(","),
            symbol("float_token1"),
            symbol(","),
            symbol("integer_token1"),
            symbol("]"),
            symbol("_line_ending_or_eof"),
        ]
    );
}

#[test]
fn table_headers_use_double_brackets() {
    let lang = toml_language();
    let src = b"[[servers]]\n";
    let mut ts = TomlTokenSource::new(src, &lang).unwrap();

    ts.next_token(); // document start
    assert_eq!(ts.next_token().symbol, symbol("[["));
    assert_eq!(ts.next_token().symbol, symbol("bare_key"));
    assert_eq!(ts.next_token().symbol, symbol("]]"));
}

#[test]
fn skip_to_byte_repositions_the_source() {
    let lang = toml_language();
    let src = b"a = 1\nb = 2\n";
    let target = src.iter().position(|&b| b == b'b').unwrap() as u32;

    let mut ts = TomlTokenSource::new(src, &lang).unwrap();
    let tok = ts.skip_to_byte(target).expect("toml source supports skipping");
    assert!(!tok.is_eof());
    assert!(tok.start_byte >= target);
    assert_eq!(tok.text, b"b");

    // Rewinding re-emits the synthetic document start.
    let tok = ts.skip_to_byte(0).expect("toml source supports skipping");
    assert_eq!(tok.symbol, symbol("document_token1"));
}

#[test]
fn strings_keep_escapes_intact() {
    let lang = toml_language();
    let src = br#"k = "a \" b" 'lit'"#;
    let mut ts = TomlTokenSource::new(src, &lang).unwrap();

    ts.next_token(); // document start
    ts.next_token(); // bare_key
    ts.next_token(); // =

    let basic = ts.next_token();
    assert_eq!(basic.symbol, symbol("_basic_string_token1"));
    assert_eq!(basic.text, br#""a \" b""#);

    let literal = ts.next_token();
    assert_eq!(literal.symbol, symbol("_literal_string_token1"));
    assert_eq!(literal.text, b"'lit'");
}
