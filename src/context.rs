//! The optimizer's per-query planning state, as seen by instrumentation.
use crate::path::CandidatePath;
use itertools::Itertools;
use snowflake::ProcessUniqueId;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type RelId = ProcessUniqueId;

/// Set of base relation indexes, one bit per index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelSet(u64);

/// All candidate paths the optimizer keeps for one base or join relation.
#[derive(Debug, Clone)]
pub struct RelationEntry {
    pub id: RelId,
    pub relids: RelSet,
    pub rows: f64,
    pub width: i32,
    pub paths: Vec<Rc<CandidatePath>>,
}

/// Created fresh for every query and read once after planning completes.
///
/// `base_rels` is indexed by relation index; slot 0 is reserved and never holds a relation the
/// optimizer cares about.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    pub base_rels: Vec<Option<RelationEntry>>,
    pub join_rels: Vec<RelationEntry>,
}

/// Gives access to the planning context of the call currently in progress, if any.
pub trait ContextSource {
    fn current(&self) -> Option<Rc<PlanningContext>>;
}

/// Single-writer slot the optimizer publishes its planning context into. Clones share the slot.
#[derive(Clone, Default)]
pub struct ContextSlot(Rc<RefCell<Option<Rc<PlanningContext>>>>);

impl RelSet {
    pub const MAX_RELID: usize = 63;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn singleton(relid: usize) -> Self {
        assert!(relid <= Self::MAX_RELID, "relid {} out of range", relid);
        Self(1 << relid)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, relid: usize) -> bool {
        relid <= Self::MAX_RELID && self.0 & (1 << relid) != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_disjoint(self, other: Self) -> bool {
        self.0 & other.0 == 0
    }

    pub fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..=Self::MAX_RELID).filter(move |&relid| self.contains(relid))
    }
}

impl FromIterator<usize> for RelSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, relid| set.union(Self::singleton(relid)))
    }
}

impl fmt::Display for RelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter().join(","))
    }
}

impl RelationEntry {
    pub fn new(relids: RelSet, rows: f64, width: i32) -> Self {
        Self {
            id: RelId::new(),
            relids,
            rows,
            width,
            paths: vec![],
        }
    }

    pub fn with_paths(mut self, paths: impl IntoIterator<Item = Rc<CandidatePath>>) -> Self {
        self.paths.extend(paths);
        self
    }
}

impl PlanningContext {
    /// A context with `relation_array_size` empty base relation slots.
    pub fn new(relation_array_size: usize) -> Self {
        Self {
            base_rels: vec![None; relation_array_size],
            join_rels: vec![],
        }
    }

    pub fn relation_array_size(&self) -> usize {
        self.base_rels.len()
    }

    /// Stores `entry` at `index`, growing the slot array as needed.
    pub fn set_base_rel(&mut self, index: usize, entry: RelationEntry) {
        if index >= self.base_rels.len() {
            self.base_rels.resize(index + 1, None);
        }
        self.base_rels[index] = Some(entry);
    }

    pub fn base_rel(&self, index: usize) -> Option<&RelationEntry> {
        self.base_rels.get(index).and_then(|entry| entry.as_ref())
    }

    pub fn add_join_rel(&mut self, entry: RelationEntry) {
        self.join_rels.push(entry);
    }

    /// Base relations in slot order, skipping the reserved slot 0 and empty slots.
    pub fn iter_base_rels(&self) -> impl Iterator<Item = (usize, &RelationEntry)> {
        self.base_rels
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index, entry)))
    }
}

impl ContextSlot {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn publish(&self, context: PlanningContext) {
        *self.0.borrow_mut() = Some(Rc::new(context));
    }

    pub fn clear(&self) {
        self.0.borrow_mut().take();
    }
}

impl ContextSource for ContextSlot {
    fn current(&self) -> Option<Rc<PlanningContext>> {
        self.0.borrow().clone()
    }
}
