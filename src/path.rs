use crate::context::RelSet;
use crate::cost::Cost;
use crate::kind::PathKind;
use either::Either;
use std::fmt;
use std::rc::Rc;
use traversal::DftPre;

/// One considered way of producing a relation's rows.
///
/// Join paths reference their operands through `outer` and `inner`. Paths are shared between
/// relations (a join path points into the path lists of the relations it joins), hence the `Rc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePath {
    pub kind: PathKind,
    pub rows: f64,
    pub startup_cost: Cost,
    pub total_cost: Cost,
    pub outer: Option<Rc<CandidatePath>>,
    pub inner: Option<Rc<CandidatePath>>,
    /// Base relations whose rows this path produces. Empty when built outside a planner.
    pub parent: RelSet,
}

impl CandidatePath {
    pub fn new(kind: PathKind, rows: f64, startup_cost: Cost, total_cost: Cost) -> Self {
        Self {
            kind,
            rows,
            startup_cost,
            total_cost,
            outer: None,
            inner: None,
            parent: RelSet::empty(),
        }
    }

    pub fn new_join(
        kind: PathKind,
        outer: Rc<CandidatePath>,
        inner: Rc<CandidatePath>,
        rows: f64,
        startup_cost: Cost,
        total_cost: Cost,
    ) -> Self {
        debug_assert!(kind.is_join());
        Self {
            kind,
            rows,
            startup_cost,
            total_cost,
            outer: Some(outer),
            inner: Some(inner),
            parent: RelSet::empty(),
        }
    }

    pub fn with_parent(mut self, parent: RelSet) -> Self {
        self.parent = parent;
        self
    }

    /// The operands a trace descends into. Non-join kinds never expose operands, even if the
    /// fields happen to be populated.
    pub fn join_operands(&self) -> Option<(Option<&Rc<Self>>, Option<&Rc<Self>>)> {
        self.kind
            .is_join()
            .then(|| (self.outer.as_ref(), self.inner.as_ref()))
    }

    /// Pre-order walk over every path reachable through join operands, with its depth.
    pub fn walk<'a>(self: &'a Rc<Self>) -> impl Iterator<Item = (usize, &'a Rc<Self>)> {
        DftPre::new(self, |path: &'a Rc<Self>| match path.join_operands() {
            Some((outer, inner)) => Either::Left(outer.into_iter().chain(inner)),
            None => Either::Right(std::iter::empty()),
        })
    }
}

impl From<&CandidatePath> for termtree::Tree<String> {
    fn from(path: &CandidatePath) -> Self {
        let tree = Self::new(format!(
            "{}(cost={:.2}..{:.2}, rows={:.0})",
            path.kind, path.startup_cost, path.total_cost, path.rows
        ));
        match path.join_operands() {
            Some((outer, inner)) => {
                tree.with_leaves(outer.into_iter().chain(inner).map(|path| path.as_ref()))
            }
            None => tree,
        }
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", termtree::Tree::<String>::from(self))
    }
}
