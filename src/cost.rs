pub type Cost = f64;

pub mod cost_factors {
    pub static SEQ_PAGE_COST: f64 = 1.;
    pub static RANDOM_PAGE_COST: f64 = 4.;
    pub static CPU_TUPLE_COST: f64 = 0.01;
    pub static CPU_INDEX_TUPLE_COST: f64 = 0.005;
    pub static CPU_OPERATOR_COST: f64 = 0.0025;
    pub static PAGE_SIZE: f64 = 8192.;
}

/// Default selectivities for restrictions we have no statistics for.
pub mod selectivity {
    pub static EQ_SEL: f64 = 0.005;
    pub static NEQ_SEL: f64 = 0.995;
    pub static INEQ_SEL: f64 = 1. / 3.;
    pub static RANGE_SEL: f64 = 0.005;
}

/// Startup and total cost of one operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPair {
    pub startup: Cost,
    pub total: Cost,
}

#[derive(Clone)]
pub struct CostEstimator {
    seq_page_cost: f64,
    random_page_cost: f64,
    cpu_tuple_cost: f64,
    cpu_index_tuple_cost: f64,
    cpu_operator_cost: f64,
}

/// Row estimates are never below one and always whole.
pub fn clamp_rows(rows: f64) -> f64 {
    if rows.is_nan() || rows <= 1. {
        1.
    } else {
        rows.round()
    }
}

impl CostPair {
    pub fn new(startup: Cost, total: Cost) -> Self {
        Self { startup, total }
    }
}

impl CostEstimator {
    pub fn with_random_page_cost(mut self, random_page_cost: f64) -> Self {
        self.random_page_cost = random_page_cost;
        self
    }

    pub fn with_seq_page_cost(mut self, seq_page_cost: f64) -> Self {
        self.seq_page_cost = seq_page_cost;
        self
    }

    pub fn pages(&self, rows: f64, width: i32) -> f64 {
        (rows * width.max(1) as f64 / cost_factors::PAGE_SIZE)
            .ceil()
            .max(1.)
    }

    /// Full scan of `rows` tuples, evaluating `num_quals` restrictions on each.
    pub fn seq_scan(&self, rows: f64, width: i32, num_quals: usize) -> CostPair {
        let per_tuple = self.cpu_tuple_cost + num_quals as f64 * self.cpu_operator_cost;
        CostPair::new(
            0.,
            self.pages(rows, width) * self.seq_page_cost + rows * per_tuple,
        )
    }

    /// Index lookup returning `selected` of the table's `rows` tuples in index order.
    pub fn index_scan(&self, rows: f64, width: i32, selected: f64) -> CostPair {
        let descent = (rows.max(2.).log2() + 1.) * self.cpu_operator_cost;
        let heap_pages = selected.min(self.pages(rows, width));
        CostPair::new(
            descent,
            descent
                + heap_pages * self.random_page_cost
                + selected * (self.cpu_index_tuple_cost + self.cpu_tuple_cost),
        )
    }

    /// Builds a bitmap of matching tuples first, then visits the heap in physical order.
    pub fn bitmap_heap_scan(&self, rows: f64, width: i32, selected: f64) -> CostPair {
        let startup = (rows.max(2.).log2() + 1.) * self.cpu_operator_cost
            + selected * self.cpu_index_tuple_cost;
        let heap_pages = selected.min(self.pages(rows, width));
        let page_cost = (self.seq_page_cost + self.random_page_cost) / 2.;
        CostPair::new(
            startup,
            startup + heap_pages * page_cost + selected * self.cpu_tuple_cost,
        )
    }

    pub fn nest_loop(
        &self,
        outer: CostPair,
        outer_rows: f64,
        inner: CostPair,
        inner_rows: f64,
        out_rows: f64,
    ) -> CostPair {
        let rescan = inner.total - inner.startup;
        CostPair::new(
            outer.startup + inner.startup,
            outer.total
                + inner.startup
                + outer_rows * rescan
                + outer_rows * inner_rows * self.cpu_operator_cost
                + out_rows * self.cpu_tuple_cost,
        )
    }

    /// Cost of loading the inner side into a hash table.
    pub fn hash_build(&self, inner: CostPair, inner_rows: f64) -> CostPair {
        let total = inner.total + inner_rows * (self.cpu_operator_cost + self.cpu_tuple_cost);
        CostPair::new(total, total)
    }

    pub fn hash_join(
        &self,
        outer: CostPair,
        outer_rows: f64,
        inner: CostPair,
        inner_rows: f64,
        out_rows: f64,
    ) -> CostPair {
        let build = self.hash_build(inner, inner_rows);
        let startup = outer.startup + build.total;
        CostPair::new(
            startup,
            startup
                + (outer.total - outer.startup)
                + outer_rows * self.cpu_operator_cost
                + out_rows * self.cpu_tuple_cost,
        )
    }

    pub fn sort(&self, input: CostPair, rows: f64) -> CostPair {
        let comparisons = if rows > 1. { rows * rows.log2() } else { 0. };
        let startup = input.total + 2. * self.cpu_operator_cost * comparisons;
        CostPair::new(startup, startup + rows * self.cpu_operator_cost)
    }

    pub fn merge_join(
        &self,
        outer: CostPair,
        outer_rows: f64,
        inner: CostPair,
        inner_rows: f64,
        out_rows: f64,
    ) -> CostPair {
        let outer = self.sort(outer, outer_rows);
        let inner = self.sort(inner, inner_rows);
        CostPair::new(
            outer.startup + inner.startup,
            outer.total
                + inner.total
                + (outer_rows + inner_rows) * self.cpu_operator_cost
                + out_rows * self.cpu_tuple_cost,
        )
    }

    /// Hashed aggregation: every input row is consumed before the first group comes out.
    pub fn hash_agg(
        &self,
        input: CostPair,
        input_rows: f64,
        num_group_cols: usize,
        groups: f64,
    ) -> CostPair {
        let startup =
            input.total + input_rows * num_group_cols.max(1) as f64 * self.cpu_operator_cost;
        CostPair::new(startup, startup + groups * self.cpu_tuple_cost)
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self {
            seq_page_cost: cost_factors::SEQ_PAGE_COST,
            random_page_cost: cost_factors::RANDOM_PAGE_COST,
            cpu_tuple_cost: cost_factors::CPU_TUPLE_COST,
            cpu_index_tuple_cost: cost_factors::CPU_INDEX_TUPLE_COST,
            cpu_operator_cost: cost_factors::CPU_OPERATOR_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rows() {
        assert_eq!(clamp_rows(0.2), 1.);
        assert_eq!(clamp_rows(-3.), 1.);
        assert_eq!(clamp_rows(f64::NAN), 1.);
        assert_eq!(clamp_rows(41.6), 42.);
    }

    #[test]
    fn test_seq_scan() {
        let est = CostEstimator::default();
        // 1000 rows of 8192 bytes is 1000 pages.
        let cost = est.seq_scan(1000., 8192, 0);
        assert_eq!(cost.startup, 0.);
        assert!((cost.total - 1010.).abs() < 1e-9);
    }

    #[test]
    fn test_index_scan_beats_seq_scan_when_selective() {
        let est = CostEstimator::default();
        let seq = est.seq_scan(100_000., 100, 1);
        let idx = est.index_scan(100_000., 100, 5.);
        assert!(idx.total < seq.total);
        assert!(idx.startup > seq.startup);
    }

    #[test]
    fn test_sort_startup_includes_input() {
        let est = CostEstimator::default();
        let sorted = est.sort(CostPair::new(0., 10.), 1.);
        assert_eq!(sorted.startup, 10.);
        assert!(sorted.total > sorted.startup);
    }

    #[test]
    fn test_join_costs_are_ordered() {
        let est = CostEstimator::default();
        let outer = CostPair::new(0., 100.);
        let inner = CostPair::new(0., 50.);
        for cost in [
            est.nest_loop(outer, 1000., inner, 500., 1000.),
            est.hash_join(outer, 1000., inner, 500., 1000.),
            est.merge_join(outer, 1000., inner, 500., 1000.),
        ] {
            assert!(cost.startup <= cost.total);
            assert!(cost.total >= outer.total + inner.total);
        }
    }
}
