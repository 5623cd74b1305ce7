use crate::catalog::Catalog;
use crate::context::ContextSlot;
use crate::cost::CostEstimator;
use crate::error::Result;
use crate::hook::{HookPoint, Planner, TracingPlanner};
use crate::optimizer::StandardPlanner;
use crate::parse::Parser;
use crate::plan::{CursorOptions, PlannedStmt};
use crate::query::{ParamValue, Query};
use crate::trace::{TraceConfig, TraceReport, TraceSink};
use log::{debug, info};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Parses SQL against a catalog and plans it through whatever planner hook is installed.
pub struct Engine {
    catalog: Catalog,
    hook_point: HookPoint,
    slot: ContextSlot,
    standard: Rc<StandardPlanner>,
    trace_config: TraceConfig,
    tracer: Option<Rc<TracingPlanner>>,
    sink: Option<Rc<dyn TraceSink>>,
    stats: RefCell<PlanStats>,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct PlanStats {
    pub num_planned: usize,
    pub num_failed: usize,
    pub plan_time_ms: u128,
    pub trace_lines: usize,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        let slot = ContextSlot::new();
        Self {
            catalog,
            hook_point: HookPoint::new(),
            standard: Rc::new(StandardPlanner::new(slot.clone())),
            slot,
            trace_config: Default::default(),
            tracer: None,
            sink: None,
            stats: Default::default(),
        }
    }

    pub fn with_trace_config(&mut self, trace_config: TraceConfig) -> &mut Self {
        self.trace_config = trace_config;
        self.reinstall_tracer();
        self
    }

    pub fn with_estimator(&mut self, estimator: CostEstimator) -> &mut Self {
        self.standard = Rc::new(StandardPlanner::new(self.slot.clone()).with_estimator(estimator));
        self.reinstall_tracer();
        self
    }

    /// Installs a tracing planner on top of the current hook, replacing any tracer this engine
    /// installed before.
    pub fn enable_tracing(&mut self, sink: impl TraceSink + 'static) -> &mut Self {
        self.disable_tracing();
        self.install_tracer(Rc::new(sink));
        self
    }

    pub fn disable_tracing(&mut self) -> &mut Self {
        if let Some(tracer) = self.tracer.take() {
            tracer.uninstall(&self.hook_point);
        }
        self.sink = None;
        self
    }

    fn install_tracer(&mut self, sink: Rc<dyn TraceSink>) {
        self.tracer = Some(TracingPlanner::install(
            &self.hook_point,
            self.standard.clone(),
            Rc::new(self.slot.clone()),
            self.trace_config.clone(),
            Box::new(sink.clone()),
        ));
        self.sink = Some(sink);
    }

    fn reinstall_tracer(&mut self) {
        if let Some(sink) = self.sink.clone() {
            self.disable_tracing();
            self.install_tracer(sink);
        }
    }

    pub fn is_tracing(&self) -> bool {
        self.tracer.is_some()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Hook point other planners can chain onto. A tracer enabled afterwards wraps them.
    pub fn hook_point(&self) -> &HookPoint {
        &self.hook_point
    }

    pub fn standard_planner(&self) -> Rc<StandardPlanner> {
        self.standard.clone()
    }

    pub fn context_slot(&self) -> &ContextSlot {
        &self.slot
    }

    pub fn trace_config(&self) -> &TraceConfig {
        &self.trace_config
    }

    pub fn last_trace_report(&self) -> Option<TraceReport> {
        self.tracer.as_ref().and_then(|tracer| tracer.last_report())
    }

    pub fn stats(&self) -> PlanStats {
        self.stats.borrow().clone()
    }

    pub fn make_parser(&self) -> Parser<'_> {
        Parser::new(&self.catalog)
    }

    pub fn plan(&self, sql: &str) -> Result<Vec<PlannedStmt>> {
        self.plan_with(sql, CursorOptions::default(), &[])
    }

    /// Plans every statement in `sql`, stopping at the first failure.
    pub fn plan_with(
        &self,
        sql: &str,
        options: CursorOptions,
        params: &[ParamValue],
    ) -> Result<Vec<PlannedStmt>> {
        let queries = self.make_parser().parse(sql)?;
        queries
            .iter()
            .map(|query| self.plan_query(query, sql, options, params))
            .collect()
    }

    pub fn plan_query(
        &self,
        query: &Query,
        query_text: &str,
        options: CursorOptions,
        params: &[ParamValue],
    ) -> Result<PlannedStmt> {
        debug!("query {}", query);
        let planner: Rc<dyn Planner> = match self.hook_point.get() {
            Some(hook) => hook,
            None => self.standard.clone(),
        };

        let now = Instant::now();
        let result = planner.plan(query, query_text, options, params);
        let elapsed = now.elapsed().as_millis();
        // The planning context must not outlive the call that produced it.
        self.slot.clear();

        let mut stats = self.stats.borrow_mut();
        stats.plan_time_ms += elapsed;
        match result {
            Ok(stmt) => {
                stats.num_planned += 1;
                if let Some(report) = self.last_trace_report() {
                    stats.trace_lines += report.lines;
                }
                info!("planned in {} ms: {}", elapsed, stmt.plan_tree.kind);
                Ok(stmt)
            }
            Err(err) => {
                stats.num_failed += 1;
                Err(err.into())
            }
        }
    }
}
