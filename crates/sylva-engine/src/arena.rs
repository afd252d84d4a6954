//! Pooled, reference-counted slab storage for tree nodes.
//!
//! Two arena classes exist: *incremental* arenas are small and recycled
//! aggressively on the assumption that edits only rebuild a frontier of
//! the tree; *full* arenas carry cold parses. Trees hold a tree-level
//! reference count per arena so grafted subtrees keep their original
//! arena alive; when the count reaches zero the arena returns to a
//! per-class pool.
//!
//! Node positions and flags sit behind relaxed atomics: edits shift
//! offsets and the reuse cursor clears dirty bits on nodes whose arena is
//! already shared between trees, and a tree built on one thread may be
//! dropped on another. Everything else is written once, while the parse
//! holds the arena exclusively.


use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use sylva_core::{FieldId, Point, StateId, Symbol};

/// Node slabs sized for steady-state edits where only a small frontier
/// of nodes is rebuilt.
const INCREMENTAL_ARENA_BYTES: usize = 16 * 1024;
/// Sized to the typical full-parse node footprint with headroom, while
/// staying small enough to keep a warm pool.
const FULL_ARENA_BYTES: usize = 2 * 1024 * 1024;
const MIN_ARENA_NODE_CAP: usize = 64;

// Default capacities for slice backing storage used by reduce actions.
// Full parses allocate many more parent-child edges than incremental
// edits.
const INCREMENTAL_CHILD_SLICE_CAP: usize = 2 * 1024;
const FULL_CHILD_SLICE_CAP: usize = 32 * 1024;
const INCREMENTAL_FIELD_SLICE_CAP: usize = 2 * 1024;
const FULL_FIELD_SLICE_CAP: usize = 32 * 1024;

/// Reset keeps at most this much slice capacity per family.
const MAX_RETAINED_SLICE_CAP: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArenaClass {
    Incremental,
    Full,
}

impl ArenaClass {
    fn node_capacity(self) -> usize {
        let bytes = match self {
            ArenaClass::Incremental => INCREMENTAL_ARENA_BYTES,
            ArenaClass::Full => FULL_ARENA_BYTES,
        };
        (bytes / std::mem::size_of::<NodeData>()).max(MIN_ARENA_NODE_CAP)
    }

    fn child_slice_cap(self) -> usize {
        match self {
            ArenaClass::Incremental => INCREMENTAL_CHILD_SLICE_CAP,
            ArenaClass::Full => FULL_CHILD_SLICE_CAP,
        }
    }

    fn field_slice_cap(self) -> usize {
        match self {
            ArenaClass::Incremental => INCREMENTAL_FIELD_SLICE_CAP,
            ArenaClass::Full => FULL_FIELD_SLICE_CAP,
        }
    }
}

/// Reference to a node: owning arena serial plus slab index. Serials are
/// unique per arena instance for the lifetime of the process, so a tree
/// holding several arenas resolves references unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct NodeRef {
    pub arena: u32,
    pub index: u32,
}

/// Reference to a slab-backed slice within one arena.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SliceRef {
    pub slab: u32,
    pub start: u32,
    pub len: u32,
}

impl SliceRef {
    pub const EMPTY: SliceRef = SliceRef {
        slab: 0,
        start: 0,
        len: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Node flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeFlags(u8);

impl NodeFlags {
    pub const NAMED: NodeFlags = NodeFlags(1 << 0);
    pub const MISSING: NodeFlags = NodeFlags(1 << 1);
    pub const HAS_ERROR: NodeFlags = NodeFlags(1 << 2);
    pub const EXTRA: NodeFlags = NodeFlags(1 << 3);
    pub const DIRTY: NodeFlags = NodeFlags(1 << 4);

    pub fn contains(self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 | other.0)
    }

    pub fn without(self, other: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 & !other.0)
    }
}

/// Single byte-offset slot, mutable through shared references.
#[derive(Debug, Default)]
pub(crate) struct ByteCell(AtomicU32);

impl ByteCell {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: u32) {
        self.0.store(value, Ordering::Relaxed);
    }
}

/// Row/column slot packed into one word.
#[derive(Debug, Default)]
pub(crate) struct PointCell(AtomicU64);

impl PointCell {
    pub fn get(&self) -> Point {
        let packed = self.0.load(Ordering::Relaxed);
        Point {
            row: (packed >> 32) as u32,
            column: packed as u32,
        }
    }

    pub fn set(&self, point: Point) {
        self.0
            .store((u64::from(point.row) << 32) | u64::from(point.column), Ordering::Relaxed);
    }
}

/// Flag byte slot.
#[derive(Debug, Default)]
pub(crate) struct FlagsCell(AtomicU8);

impl FlagsCell {
    pub fn get(&self) -> NodeFlags {
        NodeFlags(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, flags: NodeFlags) {
        self.0.store(flags.0, Ordering::Relaxed);
    }
}

/// Concrete-tree element owned by an arena. Positions and flags mutate
/// after construction (edits, dirty tracking); structure never does.
#[derive(Debug, Default)]
pub(crate) struct NodeData {
    pub symbol: Symbol,
    pub parse_state: StateId,
    pub start_byte: ByteCell,
    pub end_byte: ByteCell,
    pub start_point: PointCell,
    pub end_point: PointCell,
    pub flags: FlagsCell,
    pub children: SliceRef,
    pub fields: SliceRef,
}

impl NodeData {
    pub fn child_count(&self) -> u32 {
        self.children.len
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.get().contains(NodeFlags::DIRTY)
    }

    pub fn has_error(&self) -> bool {
        self.flags.get().contains(NodeFlags::HAS_ERROR)
    }

    pub fn set_flag(&self, flag: NodeFlags) {
        self.flags.set(self.flags.get().with(flag));
    }

    pub fn clear_flag(&self, flag: NodeFlags) {
        self.flags.set(self.flags.get().without(flag));
    }
}

struct ChildSlab {
    data: Vec<NodeRef>,
}

struct FieldSlab {
    data: Vec<FieldId>,
}

/// Slab-backed allocator for nodes and their child/field slices.
pub(crate) struct Arena {
    serial: u32,
    class: ArenaClass,
    refs: AtomicI32,
    nodes: Vec<NodeData>,
    child_slabs: Vec<ChildSlab>,
    field_slabs: Vec<FieldSlab>,
    child_cursor: usize,
    field_cursor: usize,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("serial", &self.serial)
            .field("class", &self.class)
            .field("refs", &self.refs.load(Ordering::Relaxed))
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

static NEXT_ARENA_SERIAL: AtomicU32 = AtomicU32::new(1);

static INCREMENTAL_POOL: LazyLock<Mutex<Vec<Arena>>> = LazyLock::new(|| Mutex::new(Vec::new()));
static FULL_POOL: LazyLock<Mutex<Vec<Arena>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn pool_for(class: ArenaClass) -> &'static Mutex<Vec<Arena>> {
    match class {
        ArenaClass::Incremental => &INCREMENTAL_POOL,
        ArenaClass::Full => &FULL_POOL,
    }
}

impl Arena {
    fn new(class: ArenaClass) -> Self {
        Self {
            serial: NEXT_ARENA_SERIAL.fetch_add(1, Ordering::Relaxed),
            class,
            refs: AtomicI32::new(0),
            nodes: Vec::with_capacity(class.node_capacity()),
            child_slabs: vec![ChildSlab {
                data: Vec::with_capacity(class.child_slice_cap()),
            }],
            field_slabs: vec![FieldSlab {
                data: Vec::with_capacity(class.field_slice_cap()),
            }],
            child_cursor: 0,
            field_cursor: 0,
        }
    }

    /// Take an arena from the class pool, or build a fresh one. The
    /// returned arena is exclusively owned with a tree-refcount of 1.
    pub fn acquire(class: ArenaClass) -> Arena {
        let arena = pool_for(class)
            .lock()
            .expect("arena pool lock")
            .pop()
            .unwrap_or_else(|| Arena::new(class));
        arena.refs.store(1, Ordering::Relaxed);
        arena
    }

    /// Increment the tree refcount (a new tree now references this arena).
    pub fn retain(&self) {
        self.refs.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop one tree reference. On the last release the arena is reset
    /// and returned to its class pool. If another thread is still inside
    /// its own release call the unwrap can fail transiently; the arena is
    /// then simply dropped instead of pooled.
    pub fn release(this: Arc<Arena>) {
        if this.refs.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        if let Ok(mut arena) = Arc::try_unwrap(this) {
            arena.reset();
            pool_for(arena.class)
                .lock()
                .expect("arena pool lock")
                .push(arena);
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    #[cfg(test)]
    pub fn class(&self) -> ArenaClass {
        self.class
    }

    pub fn refs(&self) -> i32 {
        self.refs.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        self.nodes.clear();

        for slab in &mut self.child_slabs {
            slab.data.clear();
        }
        let retained: usize = self.child_slabs.iter().map(|s| s.data.capacity()).sum();
        if retained > MAX_RETAINED_SLICE_CAP {
            self.child_slabs.truncate(1);
            self.child_slabs[0] = ChildSlab {
                data: Vec::with_capacity(self.class.child_slice_cap()),
            };
        }

        for slab in &mut self.field_slabs {
            slab.data.clear();
        }
        let retained: usize = self.field_slabs.iter().map(|s| s.data.capacity()).sum();
        if retained > MAX_RETAINED_SLICE_CAP {
            self.field_slabs.truncate(1);
            self.field_slabs[0] = FieldSlab {
                data: Vec::with_capacity(self.class.field_slice_cap()),
            };
        }

        self.child_cursor = 0;
        self.field_cursor = 0;
    }

    /// Allocate a zeroed node, returning a reference into this arena.
    pub fn alloc_node(&mut self) -> NodeRef {
        let index = self.nodes.len() as u32;
        self.nodes.push(NodeData::default());
        NodeRef {
            arena: self.serial,
            index,
        }
    }

    pub fn node(&self, index: u32) -> &NodeData {
        &self.nodes[index as usize]
    }

    pub fn node_mut(&mut self, index: u32) -> &mut NodeData {
        &mut self.nodes[index as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate an `n`-entry child slice. Slices never overlap and the
    /// backing slab never relocates a live allocation: when the current
    /// slab lacks space a fresh one (doubled, never below the class
    /// default) is appended and the cursor advances to it.
    pub fn alloc_child_slice(&mut self, n: usize) -> SliceRef {
        if n == 0 {
            return SliceRef::EMPTY;
        }
        loop {
            let slab_count = self.child_slabs.len();
            let slab = &mut self.child_slabs[self.child_cursor];
            if slab.data.capacity() - slab.data.len() >= n {
                let start = slab.data.len() as u32;
                slab.data.resize(slab.data.len() + n, NodeRef::default());
                return SliceRef {
                    slab: self.child_cursor as u32,
                    start,
                    len: n as u32,
                };
            }
            let slab_capacity = slab.data.capacity();
            if self.child_cursor + 1 == slab_count {
                let capacity = (slab_capacity * 2)
                    .max(self.class.child_slice_cap())
                    .max(n);
                self.child_slabs.push(ChildSlab {
                    data: Vec::with_capacity(capacity),
                });
            }
            self.child_cursor += 1;
        }
    }

    /// Allocate an `n`-entry zero-initialized field-id slice.
    pub fn alloc_field_slice(&mut self, n: usize) -> SliceRef {
        if n == 0 {
            return SliceRef::EMPTY;
        }
        loop {
            let slab_count = self.field_slabs.len();
            let slab = &mut self.field_slabs[self.field_cursor];
            if slab.data.capacity() - slab.data.len() >= n {
                let start = slab.data.len() as u32;
                slab.data.resize(slab.data.len() + n, 0);
                return SliceRef {
                    slab: self.field_cursor as u32,
                    start,
                    len: n as u32,
                };
            }
            let slab_capacity = slab.data.capacity();
            if self.field_cursor + 1 == slab_count {
                let capacity = (slab_capacity * 2)
                    .max(self.class.field_slice_cap())
                    .max(n);
                self.field_slabs.push(FieldSlab {
                    data: Vec::with_capacity(capacity),
                });
            }
            self.field_cursor += 1;
        }
    }

    pub fn child_slice(&self, slice: SliceRef) -> &[NodeRef] {
        if slice.is_empty() {
            return &[];
        }
        let slab = &self.child_slabs[slice.slab as usize];
        &slab.data[slice.start as usize..(slice.start + slice.len) as usize]
    }

    pub fn child_slice_mut(&mut self, slice: SliceRef) -> &mut [NodeRef] {
        if slice.is_empty() {
            return &mut [];
        }
        let slab = &mut self.child_slabs[slice.slab as usize];
        &mut slab.data[slice.start as usize..(slice.start + slice.len) as usize]
    }

    pub fn field_slice(&self, slice: SliceRef) -> &[FieldId] {
        if slice.is_empty() {
            return &[];
        }
        let slab = &self.field_slabs[slice.slab as usize];
        &slab.data[slice.start as usize..(slice.start + slice.len) as usize]
    }

    pub fn field_slice_mut(&mut self, slice: SliceRef) -> &mut [FieldId] {
        if slice.is_empty() {
            return &mut [];
        }
        let slab = &mut self.field_slabs[slice.slab as usize];
        &mut slab.data[slice.start as usize..(slice.start + slice.len) as usize]
    }
}
