use indoc::indoc;

use super::*;

const SAMPLE_JSON: &str = indoc! {r#"
    {
        "name": "pairs",
        "token_count": 3,
        "state_count": 2,
        "symbols": [
            {"name": "end", "named": true},
            {"name": "bare_key", "named": true},
            {"name": "=", "named": false},
            {"name": "pair", "named": true}
        ],
        "fields": ["key"],
        "productions": [
            {"symbol": 3, "child_count": 2, "field_ids": [1, 0]}
        ],
        "actions": [
            {
                "state": 0,
                "symbol": 1,
                "actions": [{"kind": {"Shift": {"state": 1}}}]
            },
            {
                "state": 1,
                "symbol": 0,
                "actions": [{"kind": "Accept"}]
            }
        ],
        "gotos": [
            {"state": 0, "symbol": 3, "target": 1}
        ],
        "lex_states": [
            {
                "transitions": [
                    {"lo": "a", "hi": "z", "next": 1},
                    {"lo": " ", "hi": " ", "next": 0, "skip": true}
                ]
            },
            {
                "transitions": [{"lo": "a", "hi": "z", "next": 1}],
                "accept": 1
            }
        ],
        "char_sets": {
            "key_chars": {"ranges": [["a", "z"], ["_", "_"]]}
        }
    }
"#};

#[test]
fn parses_sample_descriptor() {
    let lang = Language::from_json(SAMPLE_JSON).unwrap();
    assert_eq!(lang.name(), "pairs");
    assert_eq!(lang.symbol_count(), 4);
    assert_eq!(lang.token_count(), 3);
    assert_eq!(lang.field_id_for_name("key"), Some(1));
    assert_eq!(lang.symbol_by_name("="), Some(2));
    assert_eq!(lang.lookup_goto(0, 3), Some(1));
    assert_eq!(lang.lex_states().len(), 2);
    assert_eq!(lang.lex_states()[1].accept, Some(1));
    assert!(lang.lex_states()[0].transitions[1].skip);
    assert!(lang.set_contains("key_chars", '_'));
    assert!(!lang.set_contains("key_chars", '9'));
}

#[test]
fn json_round_trip_preserves_tables() {
    let lang = Language::from_json(SAMPLE_JSON).unwrap();
    let rebuilt = Language::from_json(&lang.to_json()).unwrap();
    assert_eq!(rebuilt.symbol_count(), lang.symbol_count());
    assert_eq!(rebuilt.lookup_actions(0, 1), lang.lookup_actions(0, 1));
    assert_eq!(rebuilt.lookup_goto(0, 3), lang.lookup_goto(0, 3));
    assert_eq!(rebuilt.lex_states().len(), lang.lex_states().len());
}

#[test]
fn decode_rejects_malformed_json() {
    assert!(matches!(
        Language::from_json("{not json"),
        Err(DecodeError::Json(_))
    ));
}

#[test]
fn decode_rejects_invalid_descriptor() {
    // Well-formed JSON, but the shift target is out of range.
    let json = SAMPLE_JSON.replace("\"state\": 1}", "\"state\": 9}");
    assert!(matches!(
        Language::from_json(&json),
        Err(DecodeError::Language(_))
    ));
}
