//! Incremental reuse: walking the previous tree for graftable subtrees.
//!
//! The cursor walks reusable nodes from the old tree in pre-order,
//! ordered by start byte, and caches the candidate set for the current
//! token start. A node qualifies only if it is clean (or its bytes are
//! provably unchanged, the "undo" path), error-free, non-empty, and
//! still inside the new source.

use std::sync::Arc;

use crate::arena::{Arena, NodeData, NodeFlags, NodeRef};
use crate::tree::Tree;

#[derive(Debug, Clone, Copy)]
struct ReuseFrame {
    node: NodeRef,
    under_dirty: bool,
}

pub(crate) struct ReuseCursor<'t> {
    arenas: &'t [Arc<Arena>],
    old_source: &'t [u8],
    new_source: &'t [u8],
    source_len: u32,
    min_edit_at: u32,
    has_edits: bool,

    stack: Vec<ReuseFrame>,
    next: Option<NodeRef>,

    cached_start: u32,
    cached_valid: bool,
    cached: Vec<NodeRef>,
}

impl<'t> ReuseCursor<'t> {
    pub fn new(old_tree: &'t Tree, new_source: &'t [u8]) -> Self {
        Self {
            arenas: old_tree.arenas(),
            old_source: old_tree.source(),
            new_source,
            source_len: new_source.len() as u32,
            min_edit_at: old_tree.min_edit_start(),
            has_edits: old_tree.has_edits(),
            stack: vec![ReuseFrame {
                node: old_tree.root_ref(),
                under_dirty: false,
            }],
            next: None,
            cached_start: 0,
            cached_valid: false,
            cached: Vec::new(),
        }
    }

    fn arena_of(&self, raw: NodeRef) -> &'t Arena {
        let arenas: &'t [Arc<Arena>] = self.arenas;
        arenas
            .iter()
            .find(|a| a.serial() == raw.arena)
            .unwrap_or_else(|| panic!("old tree does not retain arena {}", raw.arena))
    }

    pub fn node(&self, raw: NodeRef) -> &'t NodeData {
        self.arena_of(raw).node(raw.index)
    }

    fn children_of(&self, raw: NodeRef) -> &'t [NodeRef] {
        let arena = self.arena_of(raw);
        arena.child_slice(arena.node(raw.index).children)
    }

    /// Non-yielded candidates whose start byte equals `start`. The
    /// cursor is monotonic: a query before the cached offset is empty.
    pub fn candidates(&mut self, start: u32) -> &[NodeRef] {
        if self.cached_valid {
            if start == self.cached_start {
                return &self.cached;
            }
            if start < self.cached_start {
                return &[];
            }
        }

        self.cached.clear();
        self.cached_start = start;
        self.cached_valid = true;

        loop {
            let Some(n) = self.peek() else {
                return &self.cached;
            };
            let node_start = self.node(n).start_byte.get();

            if node_start < start {
                self.pop();
                continue;
            }
            if node_start > start {
                return &self.cached;
            }

            loop {
                match self.peek() {
                    Some(n) if self.node(n).start_byte.get() == start => {
                        let n = self.pop().expect("peeked node");
                        self.cached.push(n);
                    }
                    _ => return &self.cached,
                }
            }
        }
    }

    fn peek(&mut self) -> Option<NodeRef> {
        if self.next.is_none() {
            self.next = self.advance();
        }
        self.next
    }

    fn pop(&mut self) -> Option<NodeRef> {
        let n = self.peek();
        self.next = None;
        n
    }

    fn advance(&mut self) -> Option<NodeRef> {
        while let Some(frame) = self.stack.pop() {
            let cur = frame.node;
            let data = self.node(cur);

            let mut dirty_here = data.is_dirty();
            if dirty_here
                && node_bytes_equal(
                    data.start_byte.get(),
                    data.end_byte.get(),
                    self.old_source,
                    self.new_source,
                )
            {
                // Undo edit path: unchanged bytes can be reused safely.
                data.clear_flag(NodeFlags::DIRTY);
                dirty_here = false;
            }

            let end_byte = data.end_byte.get();
            let start_byte = data.start_byte.get();
            let has_error = data.has_error();

            // A dirty ancestor that itself ends before the earliest edit
            // was invalidated by boundary adjacency; its descendants'
            // trailing tokens are suspect and must not be grafted.
            let child_under_dirty = frame.under_dirty
                || (dirty_here && self.has_edits && end_byte <= self.min_edit_at);

            let children = self.children_of(cur);
            for &child in children.iter().rev() {
                self.stack.push(ReuseFrame {
                    node: child,
                    under_dirty: child_under_dirty,
                });
            }

            if frame.under_dirty {
                continue;
            }
            if has_error || end_byte <= start_byte || end_byte > self.source_len {
                continue;
            }
            if dirty_here {
                continue;
            }
            return Some(cur);
        }
        None
    }
}

fn node_bytes_equal(start: u32, end: u32, old_source: &[u8], new_source: &[u8]) -> bool {
    if end < start {
        return false;
    }
    let (start, end) = (start as usize, end as usize);
    if end > old_source.len() || end > new_source.len() {
        return false;
    }
    old_source[start..end] == new_source[start..end]
}
