//! Public parser surface.

mod driver;
mod reuse;
mod stack;

#[cfg(test)]
mod driver_tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sylva_core::Language;

use crate::arena::{Arena, ArenaClass};
use crate::parser::driver::{DriverScratch, ParseSession};
use crate::parser::reuse::ReuseCursor;
use crate::token_source::{DfaTokenSource, TokenSource};
use crate::tree::Tree;

/// A reusable parser bound to one immutable language descriptor.
///
/// Parsers keep scratch structures (stack storage, merge buffers) warm
/// across parses; one parser instance is not safe for concurrent use,
/// but the language descriptor is freely shareable.
pub struct Parser {
    language: Arc<Language>,
    timeout: Option<Duration>,
    scratch: DriverScratch,
}

impl Parser {
    pub fn new(language: Arc<Language>) -> Self {
        Self {
            language,
            timeout: None,
            scratch: DriverScratch::default(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Bound wall-clock time for subsequent parses. On expiry the parse
    /// returns a tree flagged incomplete; see [`Tree::is_incomplete`].
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// Cold parse using the grammar's lexer DFA.
    pub fn parse(&mut self, source: &[u8]) -> Tree {
        let language = Arc::clone(&self.language);
        let mut ts = DfaTokenSource::new(&language, source);
        let mut tree = self.run(source, &mut ts, None, ArenaClass::Full);
        tree.set_scanner_state(ts.scanner_state());
        tree
    }

    /// Reuse-aware parse. Requires edits to have been applied to
    /// `old_tree`; with no pending edits the old tree is returned
    /// unchanged in constant time.
    pub fn parse_incremental(&mut self, source: &[u8], old_tree: Tree) -> Tree {
        if old_tree.is_incomplete() {
            return self.parse(source);
        }
        if !old_tree.has_edits() {
            return old_tree;
        }
        let language = Arc::clone(&self.language);
        let mut ts = DfaTokenSource::new(&language, source);
        if let Some(state) = old_tree.scanner_state() {
            ts.restore_scanner_state(state);
        }
        let mut tree = self.run(source, &mut ts, Some(&old_tree), ArenaClass::Incremental);
        tree.set_scanner_state(ts.scanner_state());
        tree
    }

    /// Cold parse with a caller-supplied token source.
    pub fn parse_with_token_source<'s>(
        &mut self,
        source: &'s [u8],
        ts: &mut dyn TokenSource<'s>,
    ) -> Tree {
        self.run(source, ts, None, ArenaClass::Full)
    }

    /// Reuse-aware parse with a caller-supplied token source.
    pub fn parse_incremental_with_token_source<'s>(
        &mut self,
        source: &'s [u8],
        ts: &mut dyn TokenSource<'s>,
        old_tree: Tree,
    ) -> Tree {
        if old_tree.is_incomplete() {
            return self.run(source, ts, None, ArenaClass::Full);
        }
        if !old_tree.has_edits() {
            return old_tree;
        }
        self.run(source, ts, Some(&old_tree), ArenaClass::Incremental)
    }

    fn run<'s>(
        &mut self,
        source: &'s [u8],
        ts: &mut dyn TokenSource<'s>,
        old_tree: Option<&Tree>,
        class: ArenaClass,
    ) -> Tree {
        let language = Arc::clone(&self.language);
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let arena = Arena::acquire(class);

        let (old_arenas, reuse) = match old_tree {
            Some(tree) => (tree.arenas(), Some(ReuseCursor::new(tree, source))),
            None => (&[][..], None),
        };

        let session = ParseSession {
            language,
            source,
            ts,
            arena,
            old_arenas,
            reuse,
            stacks: Vec::new(),
            scratch: &mut self.scratch,
            deadline,
            saw_error: false,
            grafted: false,
        };
        session.run()
    }
}
