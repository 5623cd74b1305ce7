/// Utility module useful for testing. Builders here fill in plausible defaults for every field a
/// test does not care about.
use crate::catalog::{Catalog, TableStats};
use crate::context::{RelSet, RelationEntry};
use crate::kind::{PathKind, PlanKind};
use crate::path::CandidatePath;
use crate::plan::PlanNode;
use std::rc::Rc;

/// A leaf path with zero startup cost.
pub fn scan_path(kind: PathKind, total_cost: f64, rows: f64) -> Rc<CandidatePath> {
    Rc::new(CandidatePath::new(kind, rows, 0., total_cost))
}

/// A join whose cost is the sum of its operands' and whose row count is the larger side's.
pub fn join_path(
    kind: PathKind,
    outer: Rc<CandidatePath>,
    inner: Rc<CandidatePath>,
) -> Rc<CandidatePath> {
    let rows = outer.rows.max(inner.rows);
    let startup_cost = outer.startup_cost + inner.startup_cost;
    let total_cost = outer.total_cost + inner.total_cost;
    Rc::new(CandidatePath::new_join(
        kind,
        outer,
        inner,
        rows,
        startup_cost,
        total_cost,
    ))
}

/// A childless plan node four bytes wide with zero startup cost.
pub fn plan_leaf(kind: PlanKind, total_cost: f64, rows: f64) -> Rc<PlanNode> {
    Rc::new(PlanNode::new(kind, rows, 4, 0., total_cost))
}

pub fn base_rel(
    relid: usize,
    paths: impl IntoIterator<Item = Rc<CandidatePath>>,
) -> RelationEntry {
    let paths: Vec<_> = paths.into_iter().collect();
    let rows = paths.first().map(|path| path.rows).unwrap_or(1.);
    RelationEntry::new(RelSet::singleton(relid), rows, 4).with_paths(paths)
}

/// Three tables: a large fact table and two smaller dimension tables keyed by `id`.
pub fn sample_catalog() -> Catalog {
    Catalog::new()
        .with_table(TableStats::new(
            "orders",
            100_000.,
            48,
            &["id", "customer_id", "product_id", "amount", "placed_at"],
            &["id", "customer_id"],
        ))
        .with_table(TableStats::new(
            "customers",
            5_000.,
            64,
            &["id", "name", "region"],
            &["id"],
        ))
        .with_table(TableStats::new(
            "products",
            800.,
            40,
            &["id", "title", "price"],
            &["id"],
        ))
}
