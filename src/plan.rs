use crate::cost::Cost;
use crate::kind::PlanKind;
use std::fmt;
use std::rc::Rc;
use traversal::DftPre;

/// One step of the selected execution plan.
///
/// Children are structural: any kind may have a `left` and/or `right` input.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub kind: PlanKind,
    pub startup_cost: Cost,
    pub total_cost: Cost,
    pub rows: f64,
    /// Estimated average row width in bytes.
    pub width: i32,
    pub left: Option<Rc<PlanNode>>,
    pub right: Option<Rc<PlanNode>>,
}

/// Bit flags the caller passes along with a query. The planner hooks only forward them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CursorOptions(pub u32);

impl CursorOptions {
    pub const BINARY: Self = Self(0x0001);
    pub const SCROLL: Self = Self(0x0002);
    pub const NO_SCROLL: Self = Self(0x0004);
    pub const FAST_PLAN: Self = Self(0x0020);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The final output of planning one query.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStmt {
    pub plan_tree: Rc<PlanNode>,
    pub cursor_options: CursorOptions,
}

impl PlanNode {
    pub fn new(kind: PlanKind, rows: f64, width: i32, startup_cost: Cost, total_cost: Cost) -> Self {
        Self {
            kind,
            startup_cost,
            total_cost,
            rows,
            width,
            left: None,
            right: None,
        }
    }

    pub fn with_left(mut self, left: Rc<PlanNode>) -> Self {
        self.left = Some(left);
        self
    }

    pub fn with_right(mut self, right: Rc<PlanNode>) -> Self {
        self.right = Some(right);
        self
    }

    /// Pre-order walk over the node and all of its inputs, with depth.
    pub fn walk<'a>(self: &'a Rc<Self>) -> impl Iterator<Item = (usize, &'a Rc<Self>)> {
        DftPre::new(self, |node: &'a Rc<Self>| {
            node.left.iter().chain(node.right.iter())
        })
    }
}

impl PlannedStmt {
    pub fn new(plan_tree: Rc<PlanNode>, cursor_options: CursorOptions) -> Self {
        Self {
            plan_tree,
            cursor_options,
        }
    }
}

impl From<&PlanNode> for termtree::Tree<String> {
    fn from(node: &PlanNode) -> Self {
        Self::new(format!(
            "{}(cost={:.2}..{:.2}, rows={:.0}, width={})",
            node.kind, node.startup_cost, node.total_cost, node.rows, node.width
        ))
        .with_leaves(
            node.left
                .iter()
                .chain(node.right.iter())
                .map(|child| child.as_ref()),
        )
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", termtree::Tree::<String>::from(self))
    }
}

impl fmt::Display for PlannedStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plan_tree)
    }
}
