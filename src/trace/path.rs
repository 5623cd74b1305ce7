use super::{TraceStyle, Tracer};
use crate::kind::PathKind;
use crate::path::CandidatePath;
use std::rc::Rc;

pub fn path_line(style: TraceStyle, indent: &str, path: &CandidatePath) -> String {
    match style {
        TraceStyle::Simple => format!(
            "{}Path type: {} | cost={:.2} | rows={:.2}",
            indent, path.kind, path.total_cost, path.rows
        ),
        TraceStyle::Rich => format!(
            "{}Path: {} cost={:.2}..{:.2} rows={:.0}",
            indent, path.kind, path.startup_cost, path.total_cost, path.rows
        ),
    }
}

fn operand_headers(style: TraceStyle) -> (&'static str, &'static str) {
    match style {
        TraceStyle::Simple => ("[Join left:]", "[Join right:]"),
        TraceStyle::Rich => ("Outer:", "Inner:"),
    }
}

impl Tracer<'_> {
    /// Emits the path's line, then descends into the outer and inner operands of join paths.
    pub fn render_path(&mut self, path: Option<&CandidatePath>, level: usize) {
        let path = match path {
            Some(path) => path,
            None => {
                self.report.null_subtrees += 1;
                return;
            }
        };

        if path.kind == PathKind::Other {
            self.report.unknown_kinds += 1;
        }
        let line = path_line(self.config.style, &self.indent(level), path);
        self.emit(&line);
        self.report.paths_rendered += 1;

        if let Some((outer, inner)) = path.join_operands() {
            let (outer_header, inner_header) = operand_headers(self.config.style);
            self.render_operand(outer_header, outer, level);
            self.render_operand(inner_header, inner, level);
        }
    }

    fn render_operand(
        &mut self,
        header: &str,
        operand: Option<&Rc<CandidatePath>>,
        level: usize,
    ) {
        match operand {
            Some(operand) => {
                let line = format!("{}{}", self.indent(level), header);
                self.emit(&line);
                self.render_path(Some(operand.as_ref()), level + 1);
            }
            None => self.report.null_subtrees += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{BufferSink, TraceConfig};
    use crate::test_utils::{join_path, scan_path};
    use pretty_assertions::assert_eq;

    fn render(config: &TraceConfig, path: Option<&CandidatePath>, level: usize) -> Vec<String> {
        let sink = BufferSink::new();
        let mut tracer = Tracer::new(config, &sink);
        tracer.render_path(path, level);
        sink.lines()
    }

    #[test]
    fn test_simple_leaf() {
        let path = scan_path(PathKind::SeqScan, 10., 100.);
        assert_eq!(
            render(&TraceConfig::for_style(TraceStyle::Simple), Some(path.as_ref()), 0),
            vec!["Path type: Seq Scan | cost=10.00 | rows=100.00"]
        );
    }

    #[test]
    fn test_join_renders_outer_then_inner() {
        let path = join_path(
            PathKind::HashJoin,
            scan_path(PathKind::SeqScan, 10., 100.),
            scan_path(PathKind::IndexScan, 4.5, 7.),
        );

        assert_eq!(
            render(&TraceConfig::default(), Some(path.as_ref()), 1),
            vec![
                "  Path: Hash Join cost=0.00..14.50 rows=100",
                "  Outer:",
                "    Path: Seq Scan cost=0.00..10.00 rows=100",
                "  Inner:",
                "    Path: Index Scan cost=0.00..4.50 rows=7",
            ]
        );
        assert_eq!(
            render(&TraceConfig::for_style(TraceStyle::Simple), Some(path.as_ref()), 0),
            vec![
                "Path type: Hash Join | cost=14.50 | rows=100.00",
                "[Join left:]",
                "  Path type: Seq Scan | cost=10.00 | rows=100.00",
                "[Join right:]",
                "  Path type: Index Scan | cost=4.50 | rows=7.00",
            ]
        );
    }

    #[test]
    fn test_non_join_operands_are_ignored() {
        let mut path = CandidatePath::new(PathKind::SeqScan, 5., 0., 1.);
        path.outer = Some(scan_path(PathKind::IndexScan, 1., 1.));
        path.inner = Some(scan_path(PathKind::IndexScan, 1., 1.));

        let lines = render(&TraceConfig::default(), Some(&path), 0);
        assert_eq!(lines, vec!["Path: Seq Scan cost=0.00..1.00 rows=5"]);
    }

    #[test]
    fn test_null_path_is_a_no_op() {
        let config = TraceConfig::default();
        let sink = BufferSink::new();
        let mut tracer = Tracer::new(&config, &sink);
        tracer.render_path(None, 3);

        assert!(sink.is_empty());
        assert_eq!(tracer.report().null_subtrees, 1);
        assert_eq!(tracer.report().lines, 0);
    }

    #[test]
    fn test_missing_operand_is_skipped() {
        let mut path = CandidatePath::new(PathKind::NestLoop, 5., 0., 9.);
        path.inner = Some(scan_path(PathKind::SeqScan, 2., 5.));

        let config = TraceConfig::default();
        let sink = BufferSink::new();
        let mut tracer = Tracer::new(&config, &sink);
        tracer.render_path(Some(&path), 0);

        assert_eq!(
            sink.lines(),
            vec![
                "Path: Nested Loop Join cost=0.00..9.00 rows=5",
                "Inner:",
                "  Path: Seq Scan cost=0.00..2.00 rows=5",
            ]
        );
        assert_eq!(tracer.report().null_subtrees, 1);
    }

    #[test]
    fn test_unknown_kind_uses_fallback_label() {
        let path = scan_path(PathKind::from_tag("T_CustomPath"), 1., 1.);

        let config = TraceConfig::default();
        let sink = BufferSink::new();
        let mut tracer = Tracer::new(&config, &sink);
        tracer.render_path(Some(path.as_ref()), 0);

        assert_eq!(sink.lines(), vec!["Path: Other Path cost=0.00..1.00 rows=1"]);
        assert_eq!(tracer.report().unknown_kinds, 1);
    }

    #[test]
    fn test_indentation_is_capped() {
        // A left-deep chain of nested loops, 20 joins deep.
        let mut path = scan_path(PathKind::SeqScan, 1., 1.);
        for _ in 0..20 {
            path = join_path(PathKind::NestLoop, path, scan_path(PathKind::SeqScan, 1., 1.));
        }

        let config = TraceConfig::default().with_max_depth(16);
        let lines = render(&config, Some(path.as_ref()), 0);
        let node_indents: Vec<_> = lines
            .iter()
            .filter(|line| line.trim_start().starts_with("Path:"))
            .map(|line| line.len() - line.trim_start().len())
            .collect();

        // Every node the walk reaches is rendered exactly once.
        assert_eq!(node_indents.len(), path.walk().count());
        for ((depth, _), indent) in path.walk().zip(&node_indents) {
            assert_eq!(*indent, 2 * depth.min(16));
        }
        assert_eq!(node_indents.iter().max(), Some(&32));
    }
}
