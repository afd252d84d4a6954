//! The GLR parse loop: action dispatch, forking, subtree grafting,
//! error recovery, and tree construction.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use sylva_core::{
    ActionKind, Language, ParseAction, Point, ProductionId, StateId, Symbol, Token, EOF,
};

use crate::arena::{Arena, NodeFlags, NodeRef};
use crate::parser::reuse::ReuseCursor;
use crate::parser::stack::{merge_stacks, GlrStack, MergeScratch, StackEntry, StackScratch};
use crate::token_source::TokenSource;
use crate::tree::Tree;

/// Bound on repairs between two successfully consumed tokens, so
/// pathological inputs terminate.
const MAX_CONSECUTIVE_REPAIRS: u32 = 32;
/// Bound on reduce applications while processing one lookahead, across
/// all stack versions. Valid tables stay far below this.
const MAX_REDUCTIONS_PER_TOKEN: usize = 4096;
/// Deadline checks happen every this many reductions.
const DEADLINE_CHECK_STRIDE: usize = 64;

/// Scratch retained across parses to avoid per-parse allocation.
#[derive(Debug, Default)]
pub(crate) struct DriverScratch {
    pub stacks: StackScratch,
    pub merge: MergeScratch,
}

/// Copy of the node fields the driver consults. Reading by value keeps
/// arena borrows short.
#[derive(Debug, Clone, Copy)]
struct NodeSummary {
    symbol: Symbol,
    parse_state: StateId,
    start_byte: u32,
    end_byte: u32,
    start_point: Point,
    end_point: Point,
    flags: NodeFlags,
    child_count: u32,
}

enum Applied {
    /// The stack reduced and must re-consult the table for the same
    /// lookahead.
    Reduced(GlrStack),
    /// The stack consumed the lookahead, accepted, or died.
    Done(GlrStack),
}

pub(crate) struct ParseSession<'a, 's> {
    pub language: Arc<Language>,
    pub source: &'s [u8],
    pub ts: &'a mut (dyn TokenSource<'s> + 'a),
    pub arena: Arena,
    pub old_arenas: &'a [Arc<Arena>],
    pub reuse: Option<ReuseCursor<'a>>,
    pub stacks: Vec<GlrStack>,
    pub scratch: &'a mut DriverScratch,
    pub deadline: Option<Instant>,
    pub saw_error: bool,
    pub grafted: bool,
}

impl<'a, 's: 'a> ParseSession<'a, 's> {
    pub fn run(mut self) -> Tree {
        let lang = Arc::clone(&self.language);
        self.stacks
            .push(GlrStack::new(0, &mut self.scratch.stacks));

        let mut lookahead = self.ts.next_token();
        let mut repairs: u32 = 0;

        loop {
            if self.deadline_expired() {
                return self.finish(true);
            }

            if self.stacks.len() == 1
                && !self.stacks[0].accepted
                && self.try_reuse(&lang, &mut lookahead)
            {
                continue;
            }

            // Process the lookahead against every version. Reduces loop
            // back into the queue; shifts, accepts, and deaths land in
            // `next`.
            let mut queue: VecDeque<GlrStack> = self.stacks.drain(..).collect();
            let mut next: Vec<GlrStack> = Vec::with_capacity(queue.len());
            let mut reductions = 0usize;
            let mut expired = false;

            while let Some(mut stack) = queue.pop_front() {
                if stack.dead || stack.accepted {
                    next.push(stack);
                    continue;
                }
                let actions = lang.lookup_actions(stack.top_state(), lookahead.symbol);
                if actions.is_empty() {
                    stack.dead = true;
                    next.push(stack);
                    continue;
                }

                for action in &actions[1..] {
                    let fork = stack.fork(&mut self.scratch.stacks);
                    match self.apply_action(&lang, fork, *action, &lookahead) {
                        Applied::Reduced(s) => {
                            reductions += 1;
                            queue.push_back(s);
                        }
                        Applied::Done(s) => next.push(s),
                    }
                }
                match self.apply_action(&lang, stack, actions[0], &lookahead) {
                    Applied::Reduced(s) => {
                        reductions += 1;
                        queue.push_back(s);
                    }
                    Applied::Done(s) => next.push(s),
                }

                if reductions >= MAX_REDUCTIONS_PER_TOKEN {
                    for mut s in queue.drain(..) {
                        s.dead = true;
                        next.push(s);
                    }
                    break;
                }
                if reductions % DEADLINE_CHECK_STRIDE == 0
                    && reductions > 0
                    && self.deadline_expired()
                {
                    for s in queue.drain(..) {
                        next.push(s);
                    }
                    expired = true;
                    break;
                }
            }

            if expired {
                self.stacks = next;
                return self.finish(true);
            }

            let alive = next.iter().filter(|s| !s.dead).count();
            if alive == 0 {
                if self.recover(&lang, &mut next, &mut lookahead, &mut repairs) {
                    self.stacks = next;
                    merge_stacks(
                        &mut self.stacks,
                        &mut self.scratch.merge,
                        &mut self.scratch.stacks,
                    );
                    continue;
                }
                // Repair budget exhausted, or nothing left to repair at
                // EOF: finish with what we have.
                self.stacks = next;
                self.revive_first();
                self.saw_error = true;
                return self.finish(false);
            }

            repairs = 0;
            self.stacks = next;
            merge_stacks(
                &mut self.stacks,
                &mut self.scratch.merge,
                &mut self.scratch.stacks,
            );

            if !self.stacks.is_empty() && self.stacks.iter().all(|s| s.accepted) {
                return self.finish(false);
            }

            lookahead = self.ts.next_token();
        }
    }

    fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn summarize(&self, raw: NodeRef) -> NodeSummary {
        let data = if raw.arena == self.arena.serial() {
            self.arena.node(raw.index)
        } else {
            self.old_arenas
                .iter()
                .find(|a| a.serial() == raw.arena)
                .unwrap_or_else(|| panic!("parse does not reach arena {}", raw.arena))
                .node(raw.index)
        };
        NodeSummary {
            symbol: data.symbol,
            parse_state: data.parse_state,
            start_byte: data.start_byte.get(),
            end_byte: data.end_byte.get(),
            start_point: data.start_point.get(),
            end_point: data.end_point.get(),
            flags: data.flags.get(),
            child_count: data.child_count(),
        }
    }

    fn apply_action(
        &mut self,
        lang: &Language,
        mut stack: GlrStack,
        action: ParseAction,
        lookahead: &Token<'s>,
    ) -> Applied {
        match action.kind {
            ActionKind::Shift { state } => {
                // Extra tokens sit under the reduction in progress
                // without altering the LR state.
                let target = if action.extra {
                    stack.top_state()
                } else {
                    state
                };
                let node = self.new_token_leaf(lookahead, target, action.extra, false);
                stack.push(target, Some(node));
                Applied::Done(stack)
            }
            ActionKind::Reduce { production } => {
                self.reduce(lang, &mut stack, production, action.dynamic_precedence, lookahead);
                if stack.dead {
                    Applied::Done(stack)
                } else {
                    Applied::Reduced(stack)
                }
            }
            ActionKind::Accept => {
                stack.accepted = true;
                Applied::Done(stack)
            }
            ActionKind::Recover => {
                stack.dead = true;
                Applied::Done(stack)
            }
        }
    }

    fn reduce(
        &mut self,
        lang: &Language,
        stack: &mut GlrStack,
        production: ProductionId,
        dynamic_precedence: i32,
        lookahead: &Token<'s>,
    ) {
        let prod = lang.production(production);
        let child_count = prod.child_count as usize;

        // Pop until `child_count` non-extra entries are gathered;
        // interleaved extras ride along into the new node's children.
        let mut popped: Vec<StackEntry> = Vec::with_capacity(child_count);
        let mut non_extra = 0usize;
        while non_extra < child_count && stack.entries.len() > 1 {
            let entry = stack.entries.pop().expect("stack bottom is guarded");
            match entry.node {
                Some(node) => {
                    if !self.summarize(node).flags.contains(NodeFlags::EXTRA) {
                        non_extra += 1;
                    }
                }
                None => non_extra += 1,
            }
            popped.push(entry);
        }
        popped.reverse();

        let Some(goto_state) = lang.lookup_goto(stack.top_state(), prod.symbol) else {
            stack.dead = true;
            return;
        };

        let children: Vec<NodeRef> = popped.iter().filter_map(|e| e.node).collect();
        let (start_byte, start_point, end_byte, end_point) = match (children.first(), children.last())
        {
            (Some(&first), Some(&last)) => {
                let first = self.summarize(first);
                let last = self.summarize(last);
                (
                    first.start_byte,
                    first.start_point,
                    last.end_byte,
                    last.end_point,
                )
            }
            _ => (
                lookahead.start_byte,
                lookahead.start_point,
                lookahead.start_byte,
                lookahead.start_point,
            ),
        };

        let mut flags = NodeFlags::default();
        if lang.is_named(prod.symbol) {
            flags = flags.with(NodeFlags::NAMED);
        }
        if children
            .iter()
            .any(|&c| self.summarize(c).flags.contains(NodeFlags::HAS_ERROR))
        {
            flags = flags.with(NodeFlags::HAS_ERROR);
        }

        // Field ids map production child positions; extras get no field.
        let mut field_ids = Vec::with_capacity(children.len());
        let mut production_child = 0usize;
        for &child in &children {
            if self.summarize(child).flags.contains(NodeFlags::EXTRA) {
                field_ids.push(0);
            } else {
                field_ids.push(prod.field_ids.get(production_child).copied().unwrap_or(0));
                production_child += 1;
            }
        }

        let node_ref = self.arena.alloc_node();
        let child_slice = self.arena.alloc_child_slice(children.len());
        let field_slice = self.arena.alloc_field_slice(children.len());
        self.arena
            .child_slice_mut(child_slice)
            .copy_from_slice(&children);
        self.arena
            .field_slice_mut(field_slice)
            .copy_from_slice(&field_ids);

        let node = self.arena.node_mut(node_ref.index);
        node.symbol = prod.symbol;
        node.parse_state = goto_state;
        node.start_byte.set(start_byte);
        node.end_byte.set(end_byte);
        node.start_point.set(start_point);
        node.end_point.set(end_point);
        node.flags.set(flags);
        node.children = child_slice;
        node.fields = field_slice;

        stack.score += i64::from(dynamic_precedence);
        stack.push(goto_state, Some(node_ref));
    }

    fn new_token_leaf(
        &mut self,
        token: &Token<'s>,
        parse_state: StateId,
        extra: bool,
        error: bool,
    ) -> NodeRef {
        let mut flags = NodeFlags::default();
        if self.language.is_named(token.symbol) {
            flags = flags.with(NodeFlags::NAMED);
        }
        if extra {
            flags = flags.with(NodeFlags::EXTRA);
        }
        if error {
            flags = flags.with(NodeFlags::HAS_ERROR);
        }

        let node_ref = self.arena.alloc_node();
        let node = self.arena.node_mut(node_ref.index);
        node.symbol = token.symbol;
        node.parse_state = parse_state;
        node.start_byte.set(token.start_byte);
        node.end_byte.set(token.end_byte);
        node.start_point.set(token.start_point);
        node.end_point.set(token.end_point);
        node.flags.set(flags);
        node_ref
    }

    fn new_missing(&mut self, symbol: Symbol, at: &Token<'s>, parse_state: StateId) -> NodeRef {
        let mut flags = NodeFlags::MISSING
            .with(NodeFlags::HAS_ERROR);
        if self.language.is_named(symbol) {
            flags = flags.with(NodeFlags::NAMED);
        }
        let node_ref = self.arena.alloc_node();
        let node = self.arena.node_mut(node_ref.index);
        node.symbol = symbol;
        node.parse_state = parse_state;
        node.start_byte.set(at.start_byte);
        node.end_byte.set(at.start_byte);
        node.start_point.set(at.start_point);
        node.end_point.set(at.start_point);
        node.flags.set(flags);
        node_ref
    }

    /// Try to splice an old subtree at the current lookahead offset. On
    /// success the token stream is fast-forwarded past the reused node.
    fn try_reuse(&mut self, lang: &Language, lookahead: &mut Token<'s>) -> bool {
        if self.reuse.is_none() {
            return false;
        }

        let state = self.stacks[0].top_state();
        let mut chosen: Option<(NodeRef, StateId, u32, Point)> = None;
        {
            let cursor = self.reuse.as_mut().expect("reuse cursor present");
            let candidates: Vec<NodeRef> = cursor.candidates(lookahead.start_byte).to_vec();
            for n in candidates {
                let data = cursor.node(n);
                let summary = NodeSummary {
                    symbol: data.symbol,
                    parse_state: data.parse_state,
                    start_byte: data.start_byte.get(),
                    end_byte: data.end_byte.get(),
                    start_point: data.start_point.get(),
                    end_point: data.end_point.get(),
                    flags: data.flags.get(),
                    child_count: data.child_count(),
                };
                if let Some(target) = reuse_target_state(lang, state, &summary, lookahead) {
                    chosen = Some((n, target, summary.end_byte, summary.end_point));
                    break;
                }
            }
        }

        let Some((node, target, end_byte, end_point)) = chosen else {
            return false;
        };
        self.stacks[0].push(target, Some(node));
        self.grafted = true;

        let source_len = self.source.len() as u32;
        if end_byte >= source_len {
            // The reused node reaches EOF: synthesize it directly
            // instead of consuming every trailing token.
            *lookahead = Token::eof(source_len, end_point);
            return true;
        }
        match self.ts.skip_to_byte(end_byte) {
            Some(token) => *lookahead = token,
            None => {
                while lookahead.symbol != EOF && lookahead.start_byte < end_byte {
                    *lookahead = self.ts.next_token();
                }
            }
        }
        true
    }

    /// Revive exactly one dead version with a deterministic repair, or
    /// report that no repair is sanctioned.
    fn recover(
        &mut self,
        lang: &Language,
        next: &mut Vec<GlrStack>,
        lookahead: &mut Token<'s>,
        repairs: &mut u32,
    ) -> bool {
        *repairs += 1;
        if *repairs > MAX_CONSECUTIVE_REPAIRS {
            return false;
        }

        // Prefer inserting a missing token for the lowest-numbered
        // expected symbol at any dead predecessor state.
        for idx in 0..next.len() {
            if !next[idx].dead {
                continue;
            }
            let state = next[idx].top_state();
            for symbol in 1..lang.token_count() {
                let target = lang.lookup_actions(state, symbol).iter().find_map(|a| {
                    match a.kind {
                        ActionKind::Shift { state } if !a.extra => Some(state),
                        _ => None,
                    }
                });
                let Some(target) = target else { continue };
                let node = self.new_missing(symbol, lookahead, target);
                let stack = &mut next[idx];
                stack.push(target, Some(node));
                stack.dead = false;
                self.saw_error = true;
                return true;
            }
        }

        // Otherwise skip the lookahead as an extra marked node.
        if lookahead.symbol != EOF && !next.is_empty() {
            let state = next[0].top_state();
            let node = self.new_token_leaf(lookahead, state, true, true);
            let stack = &mut next[0];
            stack.push(state, Some(node));
            stack.dead = false;
            self.saw_error = true;
            *lookahead = self.ts.next_token();
            return true;
        }

        false
    }

    fn revive_first(&mut self) {
        if let Some(stack) = self.stacks.first_mut() {
            stack.dead = false;
        }
    }

    /// Package the winning stack into a tree. The root is extended to
    /// cover leading and trailing skipped bytes; when the winner left
    /// several nodes (trailing extras, forced stops) they are wrapped
    /// under a synthesized root.
    fn finish(mut self, incomplete: bool) -> Tree {
        let lang = Arc::clone(&self.language);
        let source_len = self.source.len() as u32;

        let winner = self
            .stacks
            .iter()
            .enumerate()
            .max_by(|(ai, a), (bi, b)| {
                (a.accepted, a.score, std::cmp::Reverse(*ai))
                    .cmp(&(b.accepted, b.score, std::cmp::Reverse(*bi)))
            })
            .map(|(i, _)| i);

        let nodes: Vec<NodeRef> = match winner {
            Some(i) => self.stacks[i]
                .entries
                .iter()
                .filter_map(|e| e.node)
                .collect(),
            None => Vec::new(),
        };

        let mut root = match nodes.len() {
            1 => nodes[0],
            _ => self.wrap_nodes(&lang, &nodes),
        };

        // A shared (grafted) root cannot be retouched in place.
        let root_summary = self.summarize(root);
        let needs_extend = !incomplete
            && (root_summary.start_byte > 0 || root_summary.end_byte < source_len);
        let needs_error_mark = self.saw_error && !root_summary.flags.contains(NodeFlags::HAS_ERROR);
        if (needs_extend || needs_error_mark) && root.arena != self.arena.serial() {
            root = self.wrap_nodes(&lang, &[root]);
        }

        if root.arena == self.arena.serial() {
            let end_byte = self.arena.node(root.index).end_byte.get();
            if !incomplete && end_byte < source_len {
                let end_point = advance_point(
                    self.source,
                    end_byte,
                    self.arena.node(root.index).end_point.get(),
                    source_len,
                );
                let node = self.arena.node(root.index);
                node.end_byte.set(source_len);
                node.end_point.set(end_point);
            }
            if !incomplete && self.arena.node(root.index).start_byte.get() > 0 {
                let node = self.arena.node(root.index);
                node.start_byte.set(0);
                node.start_point.set(Point::ZERO);
            }
            if self.saw_error {
                self.arena.node(root.index).set_flag(NodeFlags::HAS_ERROR);
            }
        }

        for stack in self.stacks.drain(..) {
            self.scratch.stacks.give(stack.entries);
        }
        self.scratch.stacks.reset();

        let mut arenas = vec![Arc::new(self.arena)];
        if self.grafted {
            for arena in self.old_arenas {
                arena.retain();
                arenas.push(Arc::clone(arena));
            }
        }

        Tree::new(
            lang,
            arenas,
            root,
            Arc::from(self.source),
            incomplete,
            None,
        )
    }

    /// Build a root node over `nodes` (possibly empty) in the new arena.
    fn wrap_nodes(&mut self, lang: &Language, nodes: &[NodeRef]) -> NodeRef {
        let symbol = lang
            .root_symbol()
            .or_else(|| nodes.first().map(|&n| self.summarize(n).symbol))
            .unwrap_or(EOF);

        let (start_byte, start_point, end_byte, end_point) = match (nodes.first(), nodes.last()) {
            (Some(&first), Some(&last)) => {
                let first = self.summarize(first);
                let last = self.summarize(last);
                (
                    first.start_byte,
                    first.start_point,
                    last.end_byte,
                    last.end_point,
                )
            }
            _ => (0, Point::ZERO, 0, Point::ZERO),
        };

        let mut flags = NodeFlags::default();
        if lang.is_named(symbol) {
            flags = flags.with(NodeFlags::NAMED);
        }
        if nodes
            .iter()
            .any(|&n| self.summarize(n).flags.contains(NodeFlags::HAS_ERROR))
        {
            flags = flags.with(NodeFlags::HAS_ERROR);
        }

        let node_ref = self.arena.alloc_node();
        let child_slice = self.arena.alloc_child_slice(nodes.len());
        let field_slice = self.arena.alloc_field_slice(nodes.len());
        self.arena.child_slice_mut(child_slice).copy_from_slice(nodes);

        let node = self.arena.node_mut(node_ref.index);
        node.symbol = symbol;
        node.parse_state = 0;
        node.start_byte.set(start_byte);
        node.end_byte.set(end_byte);
        node.start_point.set(start_point);
        node.end_point.set(end_point);
        node.flags.set(flags);
        node.children = child_slice;
        node.fields = field_slice;
        node_ref
    }
}

fn reuse_target_state(
    lang: &Language,
    state: StateId,
    n: &NodeSummary,
    lookahead: &Token<'_>,
) -> Option<StateId> {
    // Leaf reuse must match the current lookahead token symbol.
    if n.child_count == 0 {
        if n.symbol != lookahead.symbol {
            return None;
        }
        let actions = lang.lookup_actions(state, n.symbol);
        if actions.is_empty() {
            return None;
        }
        // Extra-token shifts keep the parser state unchanged.
        if let ActionKind::Shift { .. } = actions[0].kind {
            if actions[0].extra {
                return Some(state);
            }
        }
        return actions.iter().find_map(|a| match a.kind {
            ActionKind::Shift { state } if !a.extra => Some(state),
            _ => None,
        });
    }

    // Inner reuse replays the LR invariant: the node must have been
    // produced in the same state context.
    let goto_state = lang.lookup_goto(state, n.symbol)?;
    (goto_state == n.parse_state).then_some(goto_state)
}

/// Walk `source` from `from_byte` to `to_byte`, advancing `point` per
/// byte (rows split at `\n`).
fn advance_point(source: &[u8], from_byte: u32, from_point: Point, to_byte: u32) -> Point {
    let mut point = from_point;
    for &b in &source[from_byte as usize..(to_byte as usize).min(source.len())] {
        if b == b'\n' {
            point.row += 1;
            point.column = 0;
        } else {
            point.column += 1;
        }
    }
    point
}
