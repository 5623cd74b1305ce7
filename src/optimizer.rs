//! The standard planner: scan paths per base relation, exhaustive join search over relation
//! subsets, and plan creation from the cheapest path of the full join.
use crate::context::{ContextSlot, PlanningContext, RelSet, RelationEntry};
use crate::cost::{clamp_rows, CostEstimator, CostPair};
use crate::error::PlanError;
use crate::hook::Planner;
use crate::kind::{PathKind, PlanKind};
use crate::path::CandidatePath;
use crate::plan::{CursorOptions, PlanNode, PlannedStmt};
use crate::query::{ParamValue, Query, RestrictOp, TableRef};
use float_ord::FloatOrd;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Join search is exhaustive, so the number of relations is capped.
pub const MAX_RELATIONS: usize = 12;

/// Distinct values assumed per grouping column when nothing better is known.
pub const DEFAULT_NUM_DISTINCT: f64 = 200.;

/// Fraction of the result a fast-start cursor is expected to fetch.
pub const CURSOR_TUPLE_FRACTION: f64 = 0.1;

pub struct StandardPlanner {
    estimator: CostEstimator,
    slot: ContextSlot,
}

/// A join qual between two base relations, by relid.
struct JoinEdge {
    left: usize,
    right: usize,
    selectivity: f64,
}

/// State of planning one query.
struct JoinSearch<'a> {
    estimator: &'a CostEstimator,
    query: &'a Query,
    context: PlanningContext,
    edges: Vec<JoinEdge>,
    graph_connected: bool,
    join_index: FxHashMap<RelSet, usize>,
}

impl StandardPlanner {
    /// A planner publishing each planning context into `slot`.
    pub fn new(slot: ContextSlot) -> Self {
        Self {
            estimator: Default::default(),
            slot,
        }
    }

    pub fn with_estimator(mut self, estimator: CostEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn estimator(&self) -> &CostEstimator {
        &self.estimator
    }
}

impl Planner for StandardPlanner {
    fn plan(
        &self,
        query: &Query,
        query_text: &str,
        options: CursorOptions,
        params: &[ParamValue],
    ) -> Result<PlannedStmt, PlanError> {
        let num_rels = query.from.len();
        if num_rels == 0 {
            return Err(PlanError::EmptyFrom);
        }
        if num_rels > MAX_RELATIONS {
            return Err(PlanError::TooManyRelations(num_rels));
        }
        log::debug!(
            "planning {} relations with {} params: {}",
            num_rels,
            params.len(),
            query_text
        );

        let mut search = JoinSearch::new(&self.estimator, query);
        search.build_base_rels();
        search.build_join_rels();
        let plan_tree = search.create_final_plan(options)?;
        log::debug!(
            "considered {} join relations, selected {} (cost={:.2})",
            search.context.join_rels.len(),
            plan_tree.kind,
            plan_tree.total_cost
        );

        self.slot.publish(search.context);
        Ok(PlannedStmt::new(plan_tree, options))
    }
}

impl<'a> JoinSearch<'a> {
    fn new(estimator: &'a CostEstimator, query: &'a Query) -> Self {
        let edges: Vec<_> = query
            .join_quals
            .iter()
            .map(|qual| {
                let rows = query.from[qual.left.rel]
                    .table
                    .rows()
                    .max(query.from[qual.right.rel].table.rows())
                    .max(1.);
                JoinEdge {
                    left: qual.left.rel + 1,
                    right: qual.right.rel + 1,
                    selectivity: 1. / rows,
                }
            })
            .collect();

        let all = Self::all_rels(query.from.len());
        let mut reached = RelSet::singleton(1);
        loop {
            let next = edges.iter().fold(reached, |reached, edge| {
                if reached.contains(edge.left) || reached.contains(edge.right) {
                    reached
                        .union(RelSet::singleton(edge.left))
                        .union(RelSet::singleton(edge.right))
                } else {
                    reached
                }
            });
            if next == reached {
                break;
            }
            reached = next;
        }

        Self {
            estimator,
            query,
            context: PlanningContext::new(query.from.len() + 1),
            edges,
            graph_connected: reached == all,
            join_index: Default::default(),
        }
    }

    fn all_rels(num_rels: usize) -> RelSet {
        RelSet::from_bits(((1u64 << num_rels) - 1) << 1)
    }

    fn build_base_rels(&mut self) {
        for (rel, table_ref) in self.query.from.iter().enumerate() {
            let entry = self.make_base_rel(rel, table_ref);
            self.context.set_base_rel(rel + 1, entry);
        }
    }

    fn make_base_rel(&self, rel: usize, table_ref: &TableRef) -> RelationEntry {
        let relids = RelSet::singleton(rel + 1);
        let table = &table_ref.table;
        let restrictions: Vec<_> = self.query.restrictions_on(rel).collect();
        let rows = clamp_rows(
            restrictions
                .iter()
                .fold(table.rows(), |rows, restriction| {
                    rows * restriction.op.selectivity()
                }),
        );

        let mut entry = RelationEntry::new(relids, rows, table.width());
        let seq = self
            .estimator
            .seq_scan(table.rows(), table.width(), restrictions.len());
        add_path(
            &mut entry.paths,
            CandidatePath::new(PathKind::SeqScan, rows, seq.startup, seq.total).with_parent(relids),
        );

        for restriction in &restrictions {
            if !table.is_indexed(&restriction.column.column) {
                continue;
            }
            let selected = clamp_rows(table.rows() * restriction.op.selectivity());
            let (kind, cost) = match restriction.op {
                RestrictOp::Eq => (
                    PathKind::IndexScan,
                    self.estimator
                        .index_scan(table.rows(), table.width(), selected),
                ),
                op if op.is_range() => (
                    PathKind::BitmapHeapScan,
                    self.estimator
                        .bitmap_heap_scan(table.rows(), table.width(), selected),
                ),
                _ => continue,
            };
            add_path(
                &mut entry.paths,
                CandidatePath::new(kind, rows, cost.startup, cost.total).with_parent(relids),
            );
        }

        entry
    }

    /// Builds join relations level by level: all two-relation joins first, then three, and so on.
    fn build_join_rels(&mut self) {
        let num_rels = self.query.from.len();
        for size in 2..=num_rels {
            for mask in 1u64..(1 << num_rels) {
                if mask.count_ones() as usize != size {
                    continue;
                }
                let relids = RelSet::from_bits(mask << 1);
                if let Some(entry) = self.make_join_rel(relids) {
                    self.join_index
                        .insert(relids, self.context.join_rels.len());
                    self.context.add_join_rel(entry);
                }
            }
        }
    }

    fn make_join_rel(&self, relids: RelSet) -> Option<RelationEntry> {
        let rows = self.join_rows(relids);
        let mut paths = vec![];

        let bits = relids.bits();
        let mut sub = (bits - 1) & bits;
        while sub != 0 {
            let outer_ids = RelSet::from_bits(sub);
            let inner_ids = RelSet::from_bits(bits ^ sub);
            sub = (sub - 1) & bits;

            let connected = self.connects(outer_ids, inner_ids);
            if self.graph_connected && !connected {
                continue;
            }
            let outer = self.relation(outer_ids).and_then(cheapest_total);
            let inner = self.relation(inner_ids).and_then(cheapest_total);
            if let (Some(outer), Some(inner)) = (outer, inner) {
                self.add_join_paths(&mut paths, relids, rows, outer, inner, connected);
            }
        }

        if paths.is_empty() {
            None
        } else {
            Some(RelationEntry::new(relids, rows, self.width(relids)).with_paths(paths))
        }
    }

    fn add_join_paths(
        &self,
        paths: &mut Vec<Rc<CandidatePath>>,
        relids: RelSet,
        rows: f64,
        outer: &Rc<CandidatePath>,
        inner: &Rc<CandidatePath>,
        connected: bool,
    ) {
        let outer_cost = CostPair::new(outer.startup_cost, outer.total_cost);
        let inner_cost = CostPair::new(inner.startup_cost, inner.total_cost);

        let mut candidates = vec![(
            PathKind::NestLoop,
            self.estimator
                .nest_loop(outer_cost, outer.rows, inner_cost, inner.rows, rows),
        )];
        if connected {
            candidates.push((
                PathKind::HashJoin,
                self.estimator
                    .hash_join(outer_cost, outer.rows, inner_cost, inner.rows, rows),
            ));
            candidates.push((
                PathKind::MergeJoin,
                self.estimator
                    .merge_join(outer_cost, outer.rows, inner_cost, inner.rows, rows),
            ));
        }

        for (kind, cost) in candidates {
            let path = CandidatePath::new_join(
                kind,
                outer.clone(),
                inner.clone(),
                rows,
                cost.startup,
                cost.total,
            )
            .with_parent(relids);
            add_path(paths, path);
        }
    }

    fn relation(&self, relids: RelSet) -> Option<&RelationEntry> {
        if relids.len() == 1 {
            relids
                .iter()
                .next()
                .and_then(|relid| self.context.base_rel(relid))
        } else {
            self.join_index
                .get(&relids)
                .map(|&index| &self.context.join_rels[index])
        }
    }

    fn connects(&self, left: RelSet, right: RelSet) -> bool {
        self.edges.iter().any(|edge| {
            (left.contains(edge.left) && right.contains(edge.right))
                || (right.contains(edge.left) && left.contains(edge.right))
        })
    }

    fn join_rows(&self, relids: RelSet) -> f64 {
        let rows = relids
            .iter()
            .filter_map(|relid| self.context.base_rel(relid))
            .fold(1., |rows, entry| rows * entry.rows);
        let selectivity = self
            .edges
            .iter()
            .filter(|edge| relids.contains(edge.left) && relids.contains(edge.right))
            .fold(1., |sel, edge| sel * edge.selectivity);
        clamp_rows(rows * selectivity)
    }

    fn width(&self, relids: RelSet) -> i32 {
        relids
            .iter()
            .filter_map(|relid| self.context.base_rel(relid))
            .map(|entry| entry.width)
            .sum()
    }

    fn create_final_plan(&self, options: CursorOptions) -> Result<Rc<PlanNode>, PlanError> {
        let all = Self::all_rels(self.query.from.len());
        let path = self
            .relation(all)
            .and_then(|entry| final_path(entry, options))
            .ok_or_else(|| PlanError::NoJoinPath(all.to_string()))?;

        let mut plan = self.create_plan(path)?;
        if !self.query.group_by.is_empty() {
            plan = self.agg_node(plan, self.query.group_by.len());
        }
        if !self.query.order_by.is_empty() {
            plan = self.sort_node(plan);
        }
        Ok(plan)
    }

    fn create_plan(&self, path: &CandidatePath) -> Result<Rc<PlanNode>, PlanError> {
        let node = PlanNode::new(
            PlanKind::from(path.kind),
            path.rows,
            self.width(path.parent),
            path.startup_cost,
            path.total_cost,
        );

        let node = match path.join_operands() {
            None => node,
            Some((Some(outer), Some(inner))) => {
                let left = self.create_plan(outer)?;
                let right = self.create_plan(inner)?;
                match path.kind {
                    PathKind::HashJoin => node.with_left(left).with_right(self.hash_node(right)),
                    PathKind::MergeJoin => node
                        .with_left(self.sort_node(left))
                        .with_right(self.sort_node(right)),
                    _ => node.with_left(left).with_right(right),
                }
            }
            Some(_) => {
                return Err(PlanError::Custom(format!(
                    "{} path is missing an operand",
                    path.kind
                )))
            }
        };
        Ok(Rc::new(node))
    }

    fn hash_node(&self, input: Rc<PlanNode>) -> Rc<PlanNode> {
        let cost = self.estimator.hash_build(cost_of(&input), input.rows);
        Rc::new(
            PlanNode::new(PlanKind::Hash, input.rows, input.width, cost.startup, cost.total)
                .with_left(input),
        )
    }

    fn sort_node(&self, input: Rc<PlanNode>) -> Rc<PlanNode> {
        let cost = self.estimator.sort(cost_of(&input), input.rows);
        Rc::new(
            PlanNode::new(PlanKind::Sort, input.rows, input.width, cost.startup, cost.total)
                .with_left(input),
        )
    }

    fn agg_node(&self, input: Rc<PlanNode>, num_group_cols: usize) -> Rc<PlanNode> {
        let groups = clamp_rows(
            input
                .rows
                .min(DEFAULT_NUM_DISTINCT.powi(num_group_cols as i32)),
        );
        let cost = self
            .estimator
            .hash_agg(cost_of(&input), input.rows, num_group_cols, groups);
        Rc::new(
            PlanNode::new(PlanKind::Agg, groups, input.width, cost.startup, cost.total)
                .with_left(input),
        )
    }
}

fn cost_of(plan: &PlanNode) -> CostPair {
    CostPair::new(plan.startup_cost, plan.total_cost)
}

fn dominates(a: &CandidatePath, b: &CandidatePath) -> bool {
    a.startup_cost <= b.startup_cost && a.total_cost <= b.total_cost
}

/// Keeps `path` only if no existing path is at least as cheap in both startup and total cost,
/// and drops the existing paths it beats.
pub fn add_path(paths: &mut Vec<Rc<CandidatePath>>, path: CandidatePath) {
    if paths.iter().any(|old| dominates(old, &path)) {
        return;
    }
    paths.retain(|old| !dominates(&path, old));
    paths.push(Rc::new(path));
}

pub fn cheapest_total(entry: &RelationEntry) -> Option<&Rc<CandidatePath>> {
    entry
        .paths
        .iter()
        .min_by_key(|path| FloatOrd(path.total_cost))
}

/// Cheapest total cost, or cheapest cost to fetch the first fraction of rows for fast-start
/// cursors.
pub fn final_path(entry: &RelationEntry, options: CursorOptions) -> Option<&Rc<CandidatePath>> {
    if options.contains(CursorOptions::FAST_PLAN) {
        entry.paths.iter().min_by_key(|path| {
            FloatOrd(
                path.startup_cost
                    + CURSOR_TUPLE_FRACTION * (path.total_cost - path.startup_cost),
            )
        })
    } else {
        cheapest_total(entry)
    }
}
