//! The planner call contract and the tracing decorator that attaches to it.
use crate::context::ContextSource;
use crate::error::PlanError;
use crate::plan::{CursorOptions, PlannedStmt};
use crate::query::{ParamValue, Query};
use crate::trace::{self, TraceConfig, TraceReport, TraceSink};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Anything that can turn a query into a plan.
pub trait Planner {
    fn plan(
        &self,
        query: &Query,
        query_text: &str,
        options: CursorOptions,
        params: &[ParamValue],
    ) -> Result<PlannedStmt, PlanError>;
}

/// Where an installed planner hook lives. Empty means the standard planner runs.
#[derive(Default)]
pub struct HookPoint(RefCell<Option<Rc<dyn Planner>>>);

impl HookPoint {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self) -> Option<Rc<dyn Planner>> {
        self.0.borrow().clone()
    }

    /// Installs `hook` and returns the one it displaced.
    pub fn replace(&self, hook: Option<Rc<dyn Planner>>) -> Option<Rc<dyn Planner>> {
        self.0.replace(hook)
    }

    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }
}

/// Wraps whichever planner was installed before it and traces every planning call it forwards.
///
/// The plan the wrapped planner returns is passed back untouched. Planning errors propagate;
/// nothing that happens while tracing does.
pub struct TracingPlanner {
    prev: Option<Rc<dyn Planner>>,
    standard: Rc<dyn Planner>,
    context: Rc<dyn ContextSource>,
    config: TraceConfig,
    sink: Box<dyn TraceSink>,
    last_report: Cell<Option<TraceReport>>,
}

impl TracingPlanner {
    pub fn new(
        prev: Option<Rc<dyn Planner>>,
        standard: Rc<dyn Planner>,
        context: Rc<dyn ContextSource>,
        config: TraceConfig,
        sink: Box<dyn TraceSink>,
    ) -> Self {
        Self {
            prev,
            standard,
            context,
            config,
            sink,
            last_report: Cell::new(None),
        }
    }

    /// Saves the hook currently installed at `hook_point` and installs a tracer in its place.
    pub fn install(
        hook_point: &HookPoint,
        standard: Rc<dyn Planner>,
        context: Rc<dyn ContextSource>,
        config: TraceConfig,
        sink: Box<dyn TraceSink>,
    ) -> Rc<Self> {
        let tracer = Rc::new(Self::new(
            hook_point.get(),
            standard,
            context,
            config,
            sink,
        ));
        hook_point.replace(Some(tracer.clone()));
        tracer
    }

    /// Puts back the hook that was installed when this tracer was.
    pub fn uninstall(&self, hook_point: &HookPoint) {
        let current = hook_point.replace(self.prev.clone());
        let is_self = current
            .as_ref()
            .map(|hook| Rc::as_ptr(hook) as *const () == self as *const Self as *const ())
            .unwrap_or(false);
        if !is_self {
            log::warn!("uninstalling a tracing planner that was not the installed hook");
        }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Report of the most recent successful planning call.
    pub fn last_report(&self) -> Option<TraceReport> {
        self.last_report.get()
    }
}

impl Planner for TracingPlanner {
    fn plan(
        &self,
        query: &Query,
        query_text: &str,
        options: CursorOptions,
        params: &[ParamValue],
    ) -> Result<PlannedStmt, PlanError> {
        let delegate = self.prev.as_ref().unwrap_or(&self.standard);
        let stmt = delegate.plan(query, query_text, options, params)?;

        let context = self.context.current();
        let report = trace::trace_planning(context.as_deref(), &stmt, &self.config, &*self.sink);
        if report.missing_context {
            log::debug!("no planning context for query: {}", query_text);
        } else {
            log::debug!(
                "traced {} paths and {} plan nodes across {} relations",
                report.paths_rendered,
                report.plan_nodes_rendered,
                report.relations_swept
            );
        }
        self.last_report.set(Some(report));

        Ok(stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextSlot, PlanningContext};
    use crate::kind::{PathKind, PlanKind};
    use crate::plan::PlanNode;
    use crate::test_utils::{base_rel, plan_leaf, scan_path};
    use crate::trace::{BufferSink, MISSING_CONTEXT_LINE};
    use pretty_assertions::assert_eq;

    struct FixedPlanner {
        plan: Rc<PlanNode>,
        calls: Cell<usize>,
    }

    struct FailingPlanner;

    impl FixedPlanner {
        fn new(kind: PlanKind) -> Rc<Self> {
            Rc::new(Self {
                plan: plan_leaf(kind, 10., 100.),
                calls: Cell::new(0),
            })
        }
    }

    impl Planner for FixedPlanner {
        fn plan(
            &self,
            _query: &Query,
            _query_text: &str,
            options: CursorOptions,
            _params: &[ParamValue],
        ) -> Result<PlannedStmt, PlanError> {
            self.calls.set(self.calls.get() + 1);
            Ok(PlannedStmt::new(self.plan.clone(), options))
        }
    }

    impl Planner for FailingPlanner {
        fn plan(
            &self,
            _query: &Query,
            _query_text: &str,
            _options: CursorOptions,
            _params: &[ParamValue],
        ) -> Result<PlannedStmt, PlanError> {
            Err(PlanError::Custom("rejected".to_string()))
        }
    }

    fn call(planner: &dyn Planner) -> Result<PlannedStmt, PlanError> {
        planner.plan(
            &Query::default(),
            "select 1",
            CursorOptions::SCROLL,
            &[ParamValue::Int(3)],
        )
    }

    #[test]
    fn test_no_context_returns_plan_unchanged() {
        let hook_point = HookPoint::new();
        let standard = FixedPlanner::new(PlanKind::SeqScan);
        let sink = BufferSink::new();
        let tracer = TracingPlanner::install(
            &hook_point,
            standard.clone(),
            Rc::new(ContextSlot::new()),
            TraceConfig::default(),
            Box::new(sink.clone()),
        );

        let stmt = call(&*tracer).unwrap();

        assert!(Rc::ptr_eq(&stmt.plan_tree, &standard.plan));
        assert_eq!(stmt.cursor_options, CursorOptions::SCROLL);
        assert_eq!(sink.lines(), vec![MISSING_CONTEXT_LINE]);
        let report = tracer.last_report().unwrap();
        assert!(report.missing_context);
        assert_eq!(report.relations_swept, 0);
    }

    #[test]
    fn test_traces_published_context() {
        let slot = ContextSlot::new();
        let mut context = PlanningContext::new(2);
        context.set_base_rel(1, base_rel(1, [scan_path(PathKind::SeqScan, 10., 100.)]));
        slot.publish(context);

        let hook_point = HookPoint::new();
        let sink = BufferSink::new();
        let tracer = TracingPlanner::install(
            &hook_point,
            FixedPlanner::new(PlanKind::SeqScan),
            Rc::new(slot),
            TraceConfig::default(),
            Box::new(sink.clone()),
        );
        call(&*tracer).unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                trace::RICH_BANNER_LINE,
                "Selected Plan: Seq Scan cost=0.00..10.00 rows=100 width=4",
                "Relation #1",
                "  Path: Seq Scan cost=0.00..10.00 rows=100",
            ]
        );
        assert_eq!(tracer.last_report().unwrap().paths_rendered, 1);
    }

    #[test]
    fn test_previous_hook_takes_precedence() {
        let hook_point = HookPoint::new();
        let prev = FixedPlanner::new(PlanKind::HashJoin);
        let standard = FixedPlanner::new(PlanKind::SeqScan);
        hook_point.replace(Some(prev.clone()));

        let tracer = TracingPlanner::install(
            &hook_point,
            standard.clone(),
            Rc::new(ContextSlot::new()),
            TraceConfig::default(),
            Box::new(BufferSink::new()),
        );
        let stmt = call(&*hook_point.get().unwrap()).unwrap();

        assert_eq!(stmt.plan_tree.kind, PlanKind::HashJoin);
        assert_eq!(prev.calls.get(), 1);
        assert_eq!(standard.calls.get(), 0);
        assert!(tracer.last_report().is_some());
    }

    #[test]
    fn test_planning_failure_propagates() {
        let hook_point = HookPoint::new();
        hook_point.replace(Some(Rc::new(FailingPlanner)));
        let sink = BufferSink::new();
        let tracer = TracingPlanner::install(
            &hook_point,
            FixedPlanner::new(PlanKind::SeqScan),
            Rc::new(ContextSlot::new()),
            TraceConfig::default(),
            Box::new(sink.clone()),
        );

        let err = call(&*tracer).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
        assert!(sink.is_empty());
        assert!(tracer.last_report().is_none());
    }

    #[test]
    fn test_install_uninstall_is_lifo() {
        let hook_point = HookPoint::new();
        let base = FixedPlanner::new(PlanKind::Agg);
        hook_point.replace(Some(base.clone()));

        let install = |hook_point: &HookPoint| {
            TracingPlanner::install(
                hook_point,
                FixedPlanner::new(PlanKind::SeqScan),
                Rc::new(ContextSlot::new()),
                TraceConfig::default(),
                Box::new(BufferSink::new()),
            )
        };
        let first = install(&hook_point);
        let second = install(&hook_point);

        // Both tracers forward down the chain to the original hook.
        assert_eq!(
            call(&*hook_point.get().unwrap()).unwrap().plan_tree.kind,
            PlanKind::Agg
        );
        assert_eq!(base.calls.get(), 1);
        assert!(second.last_report().is_some());
        assert!(first.last_report().is_some());

        second.uninstall(&hook_point);
        let current = hook_point.get().unwrap();
        assert_eq!(
            Rc::as_ptr(&current) as *const (),
            Rc::as_ptr(&first) as *const ()
        );

        first.uninstall(&hook_point);
        let current = hook_point.get().unwrap();
        assert_eq!(
            Rc::as_ptr(&current) as *const (),
            Rc::as_ptr(&base) as *const ()
        );
    }

    #[test]
    fn test_uninstall_restores_empty_hook() {
        let hook_point = HookPoint::new();
        let tracer = TracingPlanner::install(
            &hook_point,
            FixedPlanner::new(PlanKind::SeqScan),
            Rc::new(ContextSlot::new()),
            TraceConfig::default(),
            Box::new(BufferSink::new()),
        );
        assert!(hook_point.is_set());
        tracer.uninstall(&hook_point);
        assert!(!hook_point.is_set());
    }
}
