pub mod bin_utils;
mod catalog;
mod context;
pub mod cost;
mod engine;
mod error;
mod hook;
mod kind;
pub mod logging;
mod optimizer;
mod parse;
mod path;
mod plan;
mod query;
pub mod test_utils;
pub mod trace;

pub use catalog::{Catalog, CatalogError, TableStats};
pub use context::{ContextSlot, ContextSource, PlanningContext, RelId, RelSet, RelationEntry};
pub use cost::CostEstimator;
pub use engine::{Engine, PlanStats};
pub use error::{EngineError, PlanError};
pub use hook::{HookPoint, Planner, TracingPlanner};
pub use kind::{PathKind, PlanKind};
pub use optimizer::{StandardPlanner, MAX_RELATIONS};
pub use parse::{ParseError, Parser};
pub use path::CandidatePath;
pub use plan::{CursorOptions, PlanNode, PlannedStmt};
pub use query::{ColumnRef, JoinQual, ParamValue, Query, RestrictOp, Restriction, TableRef};
