//! Public node handles.
//!
//! A [`Node`] borrows its tree; the underlying storage lives in one of
//! the tree's arenas. Nodes reference children only; upward traversal
//! is the caller's business (keep a path of indices).

use sylva_core::{FieldId, Point, Symbol};

use crate::arena::{NodeData, NodeFlags, NodeRef};
use crate::tree::Tree;

/// One concrete-tree element.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    raw: NodeRef,
}

impl<'t> Node<'t> {
    pub(crate) fn new(tree: &'t Tree, raw: NodeRef) -> Self {
        Self { tree, raw }
    }

    pub(crate) fn raw(&self) -> NodeRef {
        self.raw
    }

    fn data(&self) -> &'t NodeData {
        self.tree.node_data(self.raw)
    }

    pub fn symbol(&self) -> Symbol {
        self.data().symbol
    }

    /// Grammar-defined type name of this node.
    pub fn kind(&self) -> &'t str {
        let symbol = self.data().symbol;
        if symbol == sylva_core::ERROR_SENTINEL {
            return "ERROR";
        }
        self.tree.language().symbol_name(symbol).unwrap_or("")
    }

    pub fn start_byte(&self) -> u32 {
        self.data().start_byte.get()
    }

    pub fn end_byte(&self) -> u32 {
        self.data().end_byte.get()
    }

    pub fn start_point(&self) -> Point {
        self.data().start_point.get()
    }

    pub fn end_point(&self) -> Point {
        self.data().end_point.get()
    }

    pub fn is_named(&self) -> bool {
        self.data().flags.get().contains(NodeFlags::NAMED)
    }

    /// True for zero-width nodes inserted during error recovery.
    pub fn is_missing(&self) -> bool {
        self.data().flags.get().contains(NodeFlags::MISSING)
    }

    pub fn is_extra(&self) -> bool {
        self.data().flags.get().contains(NodeFlags::EXTRA)
    }

    /// True when this node or any descendant was produced by an error
    /// repair.
    pub fn has_error(&self) -> bool {
        self.data().flags.get().contains(NodeFlags::HAS_ERROR)
    }

    pub fn child_count(&self) -> usize {
        self.data().child_count() as usize
    }

    pub fn child(&self, i: usize) -> Option<Node<'t>> {
        let raw = *self.tree.child_refs(self.raw).get(i)?;
        Some(Node::new(self.tree, raw))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + '_ {
        let tree = self.tree;
        self.tree
            .child_refs(self.raw)
            .iter()
            .map(move |&raw| Node::new(tree, raw))
    }

    /// Field label for child position `i`, if the production assigned one.
    pub fn field_id_for_child(&self, i: usize) -> Option<FieldId> {
        match self.tree.field_ids(self.raw).get(i).copied() {
            None | Some(0) => None,
            Some(id) => Some(id),
        }
    }

    pub fn field_name_for_child(&self, i: usize) -> Option<&'t str> {
        self.tree
            .language()
            .field_name(self.field_id_for_child(i)?)
    }

    /// First child labeled with `field`.
    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'t>> {
        if field == 0 {
            return None;
        }
        let fields = self.tree.field_ids(self.raw);
        let i = fields.iter().position(|&f| f == field)?;
        self.child(i)
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'t>> {
        self.child_by_field_id(self.tree.language().field_id_for_name(name)?)
    }

    /// Source bytes covered by this node, sliced from the tree's
    /// captured snapshot.
    pub fn text(&self) -> &'t [u8] {
        let data = self.data();
        let start = data.start_byte.get() as usize;
        let end = data.end_byte.get() as usize;
        &self.tree.source()[start.min(self.tree.source().len())..end.min(self.tree.source().len())]
    }

    /// S-expression rendering of the subtree, named nodes only.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        use std::fmt::Write;

        if self.is_missing() {
            let _ = write!(out, "(MISSING {})", self.kind());
            return;
        }
        if self.child_count() == 0 {
            if self.is_named() {
                let _ = write!(out, "({})", self.kind());
            } else {
                let _ = write!(out, "{:?}", String::from_utf8_lossy(self.text()));
            }
            return;
        }
        let _ = write!(out, "({}", self.kind());
        for child in self.children() {
            out.push(' ');
            child.write_sexp(out);
        }
        out.push(')');
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{Node {} {}..{}}}",
            self.kind(),
            self.start_byte(),
            self.end_byte()
        )
    }
}
