use std::time::Duration;

use crate::test_language::{ambiguous, pairs, trees_equal, words};
use crate::Parser;

#[test]
fn cold_parse_builds_expected_structure() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"aa bb\n");

    let root = tree.root_node();
    assert_eq!(root.kind(), "program");
    assert!(!root.has_error());
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), 6, "root covers trailing skipped bytes");

    let list = root.child(0).unwrap();
    assert_eq!(list.kind(), "item_list");
    assert_eq!(list.child_count(), 2);

    let first_item = list.child(0).unwrap().child(0).unwrap();
    assert_eq!(first_item.kind(), "item");
    assert_eq!(first_item.start_byte(), 0);
    // The trailing whitespace extra rides inside the item.
    assert_eq!(first_item.end_byte(), 3);
    assert_eq!(first_item.child_count(), 2);
    assert!(first_item.child(1).unwrap().is_extra());

    let word = first_item.child(0).unwrap();
    assert_eq!(word.kind(), "word");
    assert_eq!(word.text(), b"aa");
    assert_eq!(first_item.field_name_for_child(0), Some("content"));
    assert_eq!(first_item.field_name_for_child(1), None);

    let second_item = list.child(1).unwrap();
    assert_eq!(second_item.start_byte(), 3);
    assert_eq!(second_item.end_byte(), 5);
}

#[test]
fn parse_is_idempotent() {
    let mut parser = Parser::new(words());
    let a = parser.parse(b"aa bb cc\n");
    let b = parser.parse(b"aa bb cc\n");
    assert!(trees_equal(a.root_node(), b.root_node()));
}

#[test]
fn node_spans_nest_and_fields_align() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"aa bb cc dd ee\n");
    let source_len = tree.source().len() as u32;

    // Walk the whole tree checking the span/field invariants.
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        assert!(node.start_byte() <= node.end_byte());
        assert!(node.end_byte() <= source_len);
        let mut prev_start = node.start_byte();
        for i in 0..node.child_count() {
            let child = node.child(i).unwrap();
            assert!(child.start_byte() >= prev_start, "children are ordered");
            assert!(child.start_byte() >= node.start_byte());
            assert!(child.end_byte() <= node.end_byte());
            prev_start = child.start_byte();
            stack.push(child);
        }
    }
}

#[test]
fn labeled_children_resolve_by_field() {
    let mut parser = Parser::new(pairs());
    let tree = parser.parse(b"key = 1");

    let pair = tree.root_node();
    assert_eq!(pair.kind(), "pair");
    assert!(!pair.has_error());
    assert_eq!(pair.child_count(), 3);

    let name = pair.child_by_field_name("name").unwrap();
    assert_eq!(name.text(), b"key");
    let value = pair.child_by_field_name("value").unwrap();
    assert_eq!(value.kind(), "value");
    assert_eq!(value.text(), b"1");
    assert!(!pair.child(1).unwrap().is_named());
}

#[test]
fn ambiguity_resolves_by_dynamic_precedence() {
    let mut parser = Parser::new(ambiguous());
    let tree = parser.parse(b"x");

    let root = tree.root_node();
    assert_eq!(root.kind(), "root");
    assert!(!root.has_error());
    // The noun reduction carries dynamic precedence 5 and wins the
    // merge against the verb fork.
    assert_eq!(root.child(0).unwrap().kind(), "noun");
}

#[test]
fn merges_are_deterministic() {
    let mut parser = Parser::new(ambiguous());
    let first = parser.parse(b"x");
    for _ in 0..10 {
        let again = parser.parse(b"x");
        assert!(trees_equal(first.root_node(), again.root_node()));
    }
}

#[test]
fn missing_node_repairs_incomplete_input() {
    let mut parser = Parser::new(pairs());
    let tree = parser.parse(b"key =");

    let pair = tree.root_node();
    assert_eq!(pair.kind(), "pair");
    assert!(pair.has_error());
    assert_eq!(pair.child_count(), 3);

    let missing = pair.child(2).unwrap();
    assert!(missing.is_missing());
    assert_eq!(missing.kind(), "value");
    assert_eq!(missing.start_byte(), missing.end_byte());

    // Intact children keep their original spans.
    assert_eq!(pair.child(0).unwrap().text(), b"key");
    assert_eq!(pair.child(1).unwrap().text(), b"=");
}

#[test]
fn surplus_tokens_are_skipped_as_extras() {
    let mut parser = Parser::new(pairs());
    let tree = parser.parse(b"key = = 1");

    let root = tree.root_node();
    assert!(root.has_error());
    assert_eq!(root.end_byte(), 9);

    // The repaired pair carries the skipped tokens as flagged extras.
    let extras: Vec<_> = (0..root.child_count())
        .filter_map(|i| root.child(i))
        .filter(|c| c.is_extra())
        .collect();
    assert!(!extras.is_empty());
    assert!(extras.iter().all(|c| c.has_error()));
}

#[test]
fn lexically_invalid_bytes_recover() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"aa ! bb\n");

    let root = tree.root_node();
    assert_eq!(root.kind(), "program");
    assert!(root.has_error());
    assert_eq!(root.end_byte(), 8);
}

#[test]
fn empty_input_produces_error_tree() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"");

    let root = tree.root_node();
    assert_eq!(root.kind(), "program");
    assert!(root.has_error());
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), 0);
}

#[test]
fn deadline_returns_incomplete_tree() {
    let mut parser = Parser::new(words());
    parser.set_timeout(Duration::ZERO);
    let tree = parser.parse(b"aa bb\n");
    assert!(tree.is_incomplete());

    parser.clear_timeout();
    let full = parser.parse(b"aa bb\n");
    assert!(!full.is_incomplete());
    assert_eq!(full.root_node().end_byte(), 6);
}

#[test]
fn parse_with_token_source_accepts_custom_lexer() {
    use sylva_core::{Point, Token};

    // A fixed script of tokens covering "aa bb".
    struct Scripted {
        tokens: Vec<(u16, u32, u32)>,
        at: usize,
    }
    impl<'s> crate::TokenSource<'s> for Scripted {
        fn next_token(&mut self) -> Token<'s> {
            let Some(&(symbol, start, end)) = self.tokens.get(self.at) else {
                return Token::eof(5, Point::new(0, 5));
            };
            self.at += 1;
            Token {
                symbol,
                start_byte: start,
                end_byte: end,
                start_point: Point::new(0, start),
                end_point: Point::new(0, end),
                text: &[],
            }
        }
    }

    let mut parser = Parser::new(words());
    let mut ts = Scripted {
        tokens: vec![(1, 0, 2), (2, 2, 3), (1, 3, 5)],
        at: 0,
    };
    let tree = parser.parse_with_token_source(b"aa bb", &mut ts);
    let root = tree.root_node();
    assert_eq!(root.kind(), "program");
    assert!(!root.has_error());
    assert_eq!(root.end_byte(), 5);
}
