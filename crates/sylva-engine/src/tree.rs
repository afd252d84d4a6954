//! Parse trees.
//!
//! A tree owns a root reference, the set of arenas its nodes live in
//! (more than one when subtrees were grafted from a previous tree), a
//! snapshot of the source bytes, and the edits applied since the last
//! parse. Dropping or cloning a tree releases or retains every arena.

#[cfg(test)]
mod tree_tests;

use std::sync::Arc;

use sylva_core::{FieldId, InputEdit, Language};

use crate::arena::{Arena, NodeData, NodeFlags, NodeRef};
use crate::node::Node;

pub struct Tree {
    language: Arc<Language>,
    arenas: Vec<Arc<Arena>>,
    root: NodeRef,
    source: Arc<[u8]>,
    edits: Vec<InputEdit>,
    /// Set when a deadline expired mid-parse. Such a tree cannot seed an
    /// incremental reparse.
    incomplete: bool,
    scanner_state: Option<Vec<u8>>,
}

impl Tree {
    pub(crate) fn new(
        language: Arc<Language>,
        arenas: Vec<Arc<Arena>>,
        root: NodeRef,
        source: Arc<[u8]>,
        incomplete: bool,
        scanner_state: Option<Vec<u8>>,
    ) -> Self {
        Self {
            language,
            arenas,
            root,
            source,
            edits: Vec::new(),
            incomplete,
            scanner_state,
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// The source bytes this tree was parsed from.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, self.root)
    }

    pub(crate) fn root_ref(&self) -> NodeRef {
        self.root
    }

    /// True when a deadline expired before the parse finished.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Serialized external scanner payload captured at the end of the
    /// parse, when the language carries a scanner program.
    pub fn scanner_state(&self) -> Option<&[u8]> {
        self.scanner_state.as_deref()
    }

    pub(crate) fn set_scanner_state(&mut self, state: Option<Vec<u8>>) {
        self.scanner_state = state;
    }

    pub(crate) fn arenas(&self) -> &[Arc<Arena>] {
        &self.arenas
    }

    pub(crate) fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    pub(crate) fn node_data(&self, raw: NodeRef) -> &NodeData {
        self.arena(raw.arena).node(raw.index)
    }

    pub(crate) fn arena(&self, serial: u32) -> &Arena {
        self.arenas
            .iter()
            .find(|a| a.serial() == serial)
            .unwrap_or_else(|| panic!("tree does not retain arena {serial}"))
    }

    pub(crate) fn child_refs(&self, raw: NodeRef) -> &[NodeRef] {
        let arena = self.arena(raw.arena);
        arena.child_slice(arena.node(raw.index).children)
    }

    pub(crate) fn field_ids(&self, raw: NodeRef) -> &[FieldId] {
        let arena = self.arena(raw.arena);
        arena.field_slice(arena.node(raw.index).fields)
    }

    /// Apply an edit in place: shift byte offsets and points of nodes at
    /// or after the replaced range, clamp positions inside it, and mark
    /// every node whose span touches it dirty. Ignored on incomplete
    /// trees, which cannot seed a reparse.
    pub fn edit(&mut self, edit: &InputEdit) {
        if self.incomplete {
            return;
        }
        self.edits.push(*edit);

        let mut stack = vec![self.root];
        while let Some(raw) = stack.pop() {
            let node = self.node_data(raw);
            let start = node.start_byte.get();
            let end = node.end_byte.get();

            // Entirely before the edit: this node and its subtree are
            // untouched.
            if end < edit.start_byte {
                continue;
            }

            if start <= edit.old_end_byte && end >= edit.start_byte {
                node.set_flag(NodeFlags::DIRTY);
            }

            if start >= edit.old_end_byte {
                node.start_byte.set(edit.shift_byte(start));
                node.start_point
                    .set(edit.shift_point(node.start_point.get()));
            } else if start > edit.start_byte {
                // Start fell inside the replaced range.
                node.start_byte.set(edit.new_end_byte);
                node.start_point.set(edit.new_end_point);
            }

            if end >= edit.old_end_byte {
                node.end_byte.set(edit.shift_byte(end));
                node.end_point.set(edit.shift_point(node.end_point.get()));
            } else if end > edit.start_byte {
                node.end_byte.set(edit.new_end_byte);
                node.end_point.set(edit.new_end_point);
            }

            // Keep zero-width consistency when the whole span collapsed.
            if node.end_byte.get() < node.start_byte.get() {
                node.end_byte.set(node.start_byte.get());
                node.end_point.set(node.start_point.get());
            }

            stack.extend(self.child_refs(raw).iter().copied());
        }
    }

    /// Smallest start byte across the applied edits.
    pub(crate) fn min_edit_start(&self) -> u32 {
        self.edits
            .iter()
            .map(|e| e.start_byte)
            .min()
            .unwrap_or(0)
    }
}

impl Clone for Tree {
    fn clone(&self) -> Self {
        for arena in &self.arenas {
            arena.retain();
        }
        Self {
            language: Arc::clone(&self.language),
            arenas: self.arenas.clone(),
            root: self.root,
            source: Arc::clone(&self.source),
            edits: self.edits.clone(),
            incomplete: self.incomplete,
            scanner_state: self.scanner_state.clone(),
        }
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        for arena in self.arenas.drain(..) {
            Arena::release(arena);
        }
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language.name())
            .field("root", &self.root_node())
            .field("arenas", &self.arenas.len())
            .field("incomplete", &self.incomplete)
            .finish()
    }
}
