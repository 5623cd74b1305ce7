//! Renders the optimizer's search space and selected plan as an indented text trace.
//!
//! A trace is one depth-first, pre-order pass: a node's line comes before the lines of its
//! children, and the same trees always produce the same lines.
use crate::context::PlanningContext;
use crate::plan::PlannedStmt;

mod path;
mod plan;
mod sink;
mod sweep;

pub use path::path_line;
pub use plan::plan_line;
pub use sink::{BufferSink, LogSink, TraceSink};

pub const DEFAULT_MAX_DEPTH: usize = 16;

pub const MISSING_CONTEXT_LINE: &str = "Planning context is unavailable. Cannot log paths.";
pub const RICH_BANNER_LINE: &str = "Logging paths for all relations in the query...";

/// Which label and line format set a trace uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TraceStyle {
    /// Total cost and fractional rows per path, base relations only.
    Simple,
    /// Startup and total cost, the selected plan, and join relations.
    Rich,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    pub style: TraceStyle,
    /// Indentation stops growing past this many levels.
    pub max_depth: usize,
    pub include_plan: bool,
    pub include_join_rels: bool,
}

/// What one trace pass did, including the conditions it degraded on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceReport {
    pub lines: usize,
    pub paths_rendered: usize,
    pub plan_nodes_rendered: usize,
    pub relations_swept: usize,
    pub unknown_kinds: usize,
    pub null_subtrees: usize,
    pub missing_context: bool,
}

/// State of one trace pass.
pub struct Tracer<'a> {
    config: &'a TraceConfig,
    sink: &'a dyn TraceSink,
    report: TraceReport,
}

impl TraceConfig {
    /// The preset matching a style: the simple style only sweeps base relations.
    pub fn for_style(style: TraceStyle) -> Self {
        let rich = style == TraceStyle::Rich;
        Self {
            style,
            max_depth: DEFAULT_MAX_DEPTH,
            include_plan: rich,
            include_join_rels: rich,
        }
    }

    pub fn with_style(mut self, style: TraceStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn set_include_plan(mut self, include_plan: bool) -> Self {
        self.include_plan = include_plan;
        self
    }

    pub fn set_include_join_rels(mut self, include_join_rels: bool) -> Self {
        self.include_join_rels = include_join_rels;
        self
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self::for_style(TraceStyle::Rich)
    }
}

impl<'a> Tracer<'a> {
    pub fn new(config: &'a TraceConfig, sink: &'a dyn TraceSink) -> Self {
        Self {
            config,
            sink,
            report: Default::default(),
        }
    }

    pub fn report(&self) -> TraceReport {
        self.report
    }

    /// Two spaces per level, capped at the configured maximum depth.
    fn indent(&self, level: usize) -> String {
        " ".repeat(2 * level.min(self.config.max_depth))
    }

    fn emit(&mut self, line: &str) {
        self.sink.emit(line);
        self.report.lines += 1;
    }

    /// Traces one finished planning call: the selected plan first, then every relation's paths.
    pub fn trace(&mut self, context: Option<&PlanningContext>, stmt: &PlannedStmt) {
        let context = match context {
            Some(context) => context,
            None => {
                self.report.missing_context = true;
                self.emit(MISSING_CONTEXT_LINE);
                return;
            }
        };

        if self.config.style == TraceStyle::Rich {
            self.emit(RICH_BANNER_LINE);
        }
        if self.config.include_plan {
            self.render_plan(Some(stmt.plan_tree.as_ref()), 0);
        }
        self.sweep(context);
    }
}

/// Runs a whole trace pass and returns its report.
pub fn trace_planning(
    context: Option<&PlanningContext>,
    stmt: &PlannedStmt,
    config: &TraceConfig,
    sink: &dyn TraceSink,
) -> TraceReport {
    let mut tracer = Tracer::new(config, sink);
    tracer.trace(context, stmt);
    tracer.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{PathKind, PlanKind};
    use crate::plan::CursorOptions;
    use crate::test_utils::{base_rel, plan_leaf, scan_path};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn stmt() -> PlannedStmt {
        PlannedStmt::new(
            plan_leaf(PlanKind::SeqScan, 10., 100.),
            CursorOptions::default(),
        )
    }

    #[test]
    fn test_missing_context() {
        let sink = BufferSink::new();
        let report = trace_planning(None, &stmt(), &TraceConfig::default(), &sink);

        assert_eq!(sink.lines(), vec![MISSING_CONTEXT_LINE]);
        assert!(report.missing_context);
        assert_eq!(report.lines, 1);
        assert_eq!(report.relations_swept, 0);
    }

    #[test]
    fn test_rich_trace_renders_plan_before_relations() {
        let mut context = PlanningContext::new(2);
        context.set_base_rel(1, base_rel(1, [scan_path(PathKind::SeqScan, 10., 100.)]));

        let sink = BufferSink::new();
        let report = trace_planning(Some(&context), &stmt(), &TraceConfig::default(), &sink);

        assert_eq!(
            sink.lines(),
            vec![
                RICH_BANNER_LINE,
                "Selected Plan: Seq Scan cost=0.00..10.00 rows=100 width=4",
                "Relation #1",
                "  Path: Seq Scan cost=0.00..10.00 rows=100",
            ]
        );
        assert_eq!(report.lines, 4);
        assert_eq!(report.plan_nodes_rendered, 1);
        assert_eq!(report.paths_rendered, 1);
        assert!(!report.missing_context);
    }

    #[test]
    fn test_simple_preset_skips_plan() {
        let mut context = PlanningContext::new(2);
        context.set_base_rel(1, base_rel(1, [scan_path(PathKind::SeqScan, 10., 100.)]));

        let sink = BufferSink::new();
        trace_planning(
            Some(&context),
            &stmt(),
            &TraceConfig::for_style(TraceStyle::Simple),
            &sink,
        );

        assert_eq!(
            sink.lines(),
            vec![
                "Examining relation 1",
                "Path type: Seq Scan | cost=10.00 | rows=100.00",
            ]
        );
    }

    #[test]
    fn test_idempotent() {
        let mut context = PlanningContext::new(3);
        context.set_base_rel(1, base_rel(1, [scan_path(PathKind::SeqScan, 10., 100.)]));
        context.set_base_rel(2, base_rel(2, [scan_path(PathKind::TidScan, 1., 1.)]));

        let config = TraceConfig::default();
        let first = BufferSink::new();
        let second = BufferSink::new();
        trace_planning(Some(&context), &stmt(), &config, &first);
        trace_planning(Some(&context), &stmt(), &config, &second);

        assert_eq!(first.lines(), second.lines());
    }

    #[test]
    fn test_config_builders() {
        let config = TraceConfig::for_style(TraceStyle::Simple)
            .set_include_plan(true)
            .with_max_depth(4);
        assert_eq!(config.style, TraceStyle::Simple);
        assert!(config.include_plan);
        assert!(!config.include_join_rels);
        assert_eq!(config.max_depth, 4);

        assert_eq!(TraceStyle::from_str("rich").unwrap(), TraceStyle::Rich);
        assert_eq!(TraceStyle::Simple.to_string(), "simple");
        assert!(TraceStyle::from_str("fancy").is_err());
    }
}
