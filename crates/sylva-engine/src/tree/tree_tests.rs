use std::time::Duration;

use sylva_core::{InputEdit, Point};

use crate::test_language::words;
use crate::Parser;

fn edit_insert(at: u32, len: u32, point: Point, new_end_point: Point) -> InputEdit {
    InputEdit {
        start_byte: at,
        old_end_byte: at,
        new_end_byte: at + len,
        start_point: point,
        old_end_point: point,
        new_end_point,
    }
}

#[test]
fn edit_shifts_nodes_after_the_range() {
    let mut parser = Parser::new(words());
    let mut tree = parser.parse(b"aa bb\n");
    assert_eq!(tree.root_node().end_byte(), 6);

    // Insert one space before "bb".
    tree.edit(&edit_insert(3, 1, Point::new(0, 3), Point::new(0, 4)));

    let root = tree.root_node();
    assert_eq!(root.end_byte(), 7);
    // program -> item_list -> [item_list, item]
    let list = root.child(0).unwrap();
    let second_item = list.child(1).unwrap();
    assert_eq!(second_item.start_byte(), 4);
    assert_eq!(second_item.end_byte(), 6);
    assert_eq!(second_item.start_point(), Point::new(0, 4));

    // The first word sits entirely before the edit and is untouched.
    let first_word = list
        .child(0)
        .unwrap()
        .child(0)
        .unwrap()
        .child(0)
        .unwrap();
    assert_eq!(first_word.start_byte(), 0);
    assert_eq!(first_word.end_byte(), 2);
}

#[test]
fn edit_marks_touching_nodes_dirty() {
    let mut parser = Parser::new(words());
    let mut tree = parser.parse(b"aa bb\n");
    tree.edit(&edit_insert(3, 1, Point::new(0, 3), Point::new(0, 4)));

    let root = tree.root_node();
    assert!(tree.node_data(root.raw()).is_dirty());

    let inner_list = root.child(0).unwrap().child(0).unwrap();
    // item "aa" ends exactly at the edit start: adjacency dirties it.
    let first_item = inner_list.child(0).unwrap();
    assert!(tree.node_data(first_item.raw()).is_dirty());
    // Its word leaf ends before the edit and stays clean.
    let first_word = first_item.child(0).unwrap();
    assert!(!tree.node_data(first_word.raw()).is_dirty());
}

#[test]
fn edits_accumulate_and_min_start_tracks() {
    let mut parser = Parser::new(words());
    let mut tree = parser.parse(b"aa bb cc\n");
    tree.edit(&edit_insert(6, 1, Point::new(0, 6), Point::new(0, 7)));
    tree.edit(&edit_insert(3, 1, Point::new(0, 3), Point::new(0, 4)));
    assert!(tree.has_edits());
    assert_eq!(tree.edits().len(), 2);
    assert_eq!(tree.min_edit_start(), 3);
}

#[test]
fn incomplete_trees_refuse_edits() {
    let mut parser = Parser::new(words());
    parser.set_timeout(Duration::ZERO);
    let mut tree = parser.parse(b"aa bb\n");
    assert!(tree.is_incomplete());
    tree.edit(&edit_insert(0, 1, Point::ZERO, Point::new(0, 1)));
    assert!(!tree.has_edits());
}

#[test]
fn clone_and_drop_track_arena_refs() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"aa\n");
    assert_eq!(tree.arenas().len(), 1);
    assert_eq!(tree.arenas()[0].refs(), 1);

    let copy = tree.clone();
    assert_eq!(tree.arenas()[0].refs(), 2);
    drop(copy);
    assert_eq!(tree.arenas()[0].refs(), 1);
}

#[test]
fn node_text_slices_snapshot() {
    let mut parser = Parser::new(words());
    let tree = parser.parse(b"aa bb\n");
    let list = tree.root_node().child(0).unwrap();
    let second_word = list.child(1).unwrap().child(0).unwrap();
    assert_eq!(second_word.text(), b"bb");
    assert_eq!(second_word.kind(), "word");
    assert!(second_word.is_named());
}
