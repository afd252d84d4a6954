//! GLR parse-stack versions and merging.
//!
//! When the parse table has multiple actions for a `(state, symbol)`
//! pair the driver forks: one [`GlrStack`] per alternative. Stacks that
//! hit errors are marked dead and dropped at the next merge point;
//! survivors converging on the same top state are merged, keeping the
//! highest dynamic-precedence score.

use std::collections::HashMap;

use sylva_core::StateId;

use crate::arena::NodeRef;

/// Entry vectors below this capacity are recycled as-is.
const DEFAULT_STACK_ENTRY_CAP: usize = 4 * 1024;
/// Reset keeps at most this much recycled entry capacity.
const MAX_RETAINED_STACK_ENTRY_CAP: usize = 256 * 1024;

/// Survivor counts up to this use the linear merge scan; larger sets
/// switch to a hashed by-top-state index.
const LINEAR_MERGE_LIMIT: usize = 64;

/// One parse-stack slot. The bottom slot of every stack carries the
/// initial state and no node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackEntry {
    pub state: StateId,
    pub node: Option<NodeRef>,
}

/// One version of the parse stack.
#[derive(Debug)]
pub(crate) struct GlrStack {
    pub entries: Vec<StackEntry>,
    /// Dynamic precedence accumulated through reduce actions. The
    /// highest score wins when ambiguous stacks merge.
    pub score: i64,
    /// Marks a version that encountered an error and should be removed
    /// at the next merge point.
    pub dead: bool,
    /// Set when the stack reaches an accept action.
    pub accepted: bool,
}

impl GlrStack {
    pub fn new(initial: StateId, scratch: &mut StackScratch) -> Self {
        let mut entries = scratch.take(1);
        entries.push(StackEntry {
            state: initial,
            node: None,
        });
        Self {
            entries,
            score: 0,
            dead: false,
            accepted: false,
        }
    }

    pub fn top_state(&self) -> StateId {
        self.entries
            .last()
            .map(|e| e.state)
            .unwrap_or(0)
    }

    pub fn push(&mut self, state: StateId, node: Option<NodeRef>) {
        self.entries.push(StackEntry { state, node });
    }

    /// Fork this version. Entries are copied; nodes are shared, which is
    /// safe because nodes never mutate structurally after construction.
    pub fn fork(&self, scratch: &mut StackScratch) -> GlrStack {
        let mut entries = scratch.take(self.entries.len());
        entries.extend_from_slice(&self.entries);
        GlrStack {
            entries,
            score: self.score,
            dead: false,
            accepted: self.accepted,
        }
    }
}

/// Recycled entry-vector pool, retained across parses so steady-state
/// parsing allocates no stack storage.
#[derive(Debug, Default)]
pub(crate) struct StackScratch {
    free: Vec<Vec<StackEntry>>,
}

impl StackScratch {
    pub fn take(&mut self, capacity_hint: usize) -> Vec<StackEntry> {
        match self.free.pop() {
            Some(mut v) => {
                v.clear();
                v.reserve(capacity_hint);
                v
            }
            None => Vec::with_capacity(capacity_hint.max(8)),
        }
    }

    pub fn give(&mut self, entries: Vec<StackEntry>) {
        self.free.push(entries);
    }

    /// Trim retained capacity back to the steady-state bound.
    pub fn reset(&mut self) {
        let mut total = 0usize;
        self.free.retain(|v| {
            total += v.capacity();
            total <= MAX_RETAINED_STACK_ENTRY_CAP && v.capacity() <= DEFAULT_STACK_ENTRY_CAP
        });
    }
}

/// Scratch for the hashed merge regime, retained across parses.
#[derive(Debug, Default)]
pub(crate) struct MergeScratch {
    by_state: HashMap<StateId, usize>,
}

/// Remove dead stacks and merge survivors with identical top states,
/// preserving first-seen order. Losing versions return their entry
/// storage to `scratch`.
pub(crate) fn merge_stacks(
    stacks: &mut Vec<GlrStack>,
    merge: &mut MergeScratch,
    scratch: &mut StackScratch,
) {
    let mut alive: Vec<GlrStack> = Vec::with_capacity(stacks.len());
    for stack in stacks.drain(..) {
        if stack.dead {
            scratch.give(stack.entries);
        } else {
            alive.push(stack);
        }
    }

    if alive.len() <= 1 {
        *stacks = alive;
        return;
    }

    let mut result: Vec<GlrStack> = Vec::with_capacity(alive.len());
    if alive.len() <= LINEAR_MERGE_LIMIT {
        for stack in alive {
            let key = stack.top_state();
            match result.iter_mut().find(|r| r.top_state() == key) {
                Some(existing) => {
                    if stack.score > existing.score {
                        let loser = std::mem::replace(existing, stack);
                        scratch.give(loser.entries);
                    } else {
                        scratch.give(stack.entries);
                    }
                }
                None => result.push(stack),
            }
        }
    } else {
        merge.by_state.clear();
        for stack in alive {
            let key = stack.top_state();
            match merge.by_state.get(&key) {
                Some(&idx) => {
                    if stack.score > result[idx].score {
                        let loser = std::mem::replace(&mut result[idx], stack);
                        scratch.give(loser.entries);
                    } else {
                        scratch.give(stack.entries);
                    }
                }
                None => {
                    merge.by_state.insert(key, result.len());
                    result.push(stack);
                }
            }
        }
    }

    *stacks = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with_top(state: StateId, score: i64, scratch: &mut StackScratch) -> GlrStack {
        let mut s = GlrStack::new(0, scratch);
        s.push(state, None);
        s.score = score;
        s
    }

    #[test]
    fn merge_drops_dead_stacks() {
        let mut scratch = StackScratch::default();
        let mut merge = MergeScratch::default();
        let mut dead = stack_with_top(1, 0, &mut scratch);
        dead.dead = true;
        let mut stacks = vec![dead, stack_with_top(2, 0, &mut scratch)];
        merge_stacks(&mut stacks, &mut merge, &mut scratch);
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].top_state(), 2);
    }

    #[test]
    fn merge_keeps_highest_score_per_top_state() {
        let mut scratch = StackScratch::default();
        let mut merge = MergeScratch::default();
        let mut stacks = vec![
            stack_with_top(3, 1, &mut scratch),
            stack_with_top(3, 9, &mut scratch),
            stack_with_top(4, 0, &mut scratch),
        ];
        merge_stacks(&mut stacks, &mut merge, &mut scratch);
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].top_state(), 3);
        assert_eq!(stacks[0].score, 9);
        assert_eq!(stacks[1].top_state(), 4);
    }

    #[test]
    fn merge_preserves_first_seen_order_on_ties() {
        let mut scratch = StackScratch::default();
        let mut merge = MergeScratch::default();
        let mut stacks = vec![
            stack_with_top(7, 5, &mut scratch),
            stack_with_top(8, 5, &mut scratch),
            stack_with_top(7, 5, &mut scratch),
        ];
        merge_stacks(&mut stacks, &mut merge, &mut scratch);
        let tops: Vec<StateId> = stacks.iter().map(|s| s.top_state()).collect();
        assert_eq!(tops, vec![7, 8]);
    }

    #[test]
    fn hashed_regime_matches_linear_semantics() {
        let mut scratch = StackScratch::default();
        let mut merge = MergeScratch::default();
        // More than LINEAR_MERGE_LIMIT survivors, all colliding on two
        // top states.
        let mut stacks = Vec::new();
        for i in 0..100i64 {
            stacks.push(stack_with_top((i % 2) as StateId, i, &mut scratch));
        }
        merge_stacks(&mut stacks, &mut merge, &mut scratch);
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].top_state(), 0);
        assert_eq!(stacks[0].score, 98);
        assert_eq!(stacks[1].top_state(), 1);
        assert_eq!(stacks[1].score, 99);
    }

    #[test]
    fn fork_shares_nothing_mutable() {
        let mut scratch = StackScratch::default();
        let mut a = GlrStack::new(0, &mut scratch);
        a.push(5, None);
        let mut b = a.fork(&mut scratch);
        b.push(6, None);
        assert_eq!(a.entries.len(), 2);
        assert_eq!(b.entries.len(), 3);
        assert_eq!(a.top_state(), 5);
        assert_eq!(b.top_state(), 6);
    }
}
