use crate::parse::ParseError;
use thiserror::Error;

/// Why a planner could not produce a plan for a query.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("query has no FROM entries to plan")]
    EmptyFrom,
    #[error("too many relations to plan exhaustively: {0}")]
    TooManyRelations(usize),
    #[error("no join path connects relations {0}")]
    NoJoinPath(String),
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
