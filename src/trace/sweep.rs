use super::{TraceStyle, Tracer};
use crate::context::{PlanningContext, RelationEntry};

impl Tracer<'_> {
    /// Renders every candidate path of every relation in storage order: base relations by
    /// ascending index, then join relations in the order the optimizer built them.
    pub fn sweep(&mut self, context: &PlanningContext) {
        let level = match self.config.style {
            TraceStyle::Simple => 0,
            TraceStyle::Rich => 1,
        };

        for (index, entry) in context.iter_base_rels() {
            let header = match self.config.style {
                TraceStyle::Simple => format!("Examining relation {}", index),
                TraceStyle::Rich => format!("Relation #{}", index),
            };
            self.sweep_relation(&header, entry, level);
        }

        if self.config.include_join_rels {
            for entry in &context.join_rels {
                self.sweep_relation(&format!("Join Relation {}", entry.id), entry, level);
            }
        }
    }

    fn sweep_relation(&mut self, header: &str, entry: &RelationEntry, level: usize) {
        self.emit(header);
        self.report.relations_swept += 1;
        for path in &entry.paths {
            self.render_path(Some(path.as_ref()), level);
        }
    }
}
