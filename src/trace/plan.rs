use super::Tracer;
use crate::kind::PlanKind;
use crate::plan::PlanNode;

pub fn plan_line(indent: &str, plan: &PlanNode) -> String {
    format!(
        "{}Selected Plan: {} cost={:.2}..{:.2} rows={:.0} width={}",
        indent, plan.kind, plan.startup_cost, plan.total_cost, plan.rows, plan.width
    )
}

impl Tracer<'_> {
    /// Emits the node's line, then its left and right inputs, whatever the node's kind.
    pub fn render_plan(&mut self, plan: Option<&PlanNode>, level: usize) {
        let plan = match plan {
            Some(plan) => plan,
            None => return,
        };

        if plan.kind == PlanKind::Other {
            self.report.unknown_kinds += 1;
        }
        let line = plan_line(&self.indent(level), plan);
        self.emit(&line);
        self.report.plan_nodes_rendered += 1;

        if let Some(left) = &plan.left {
            self.render_plan(Some(left.as_ref()), level + 1);
        }
        if let Some(right) = &plan.right {
            self.render_plan(Some(right.as_ref()), level + 1);
        }
    }
}
