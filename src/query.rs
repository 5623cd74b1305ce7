use crate::catalog::TableStats;
use crate::cost::selectivity;
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

/// A table in the FROM clause, possibly under an alias.
#[derive(Debug)]
pub struct TableRef {
    pub table: Rc<TableStats>,
    pub alias: Option<String>,
}

/// A column of the `rel`-th FROM entry (zero-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub rel: usize,
    pub column: String,
}

/// `left = right` across two different FROM entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinQual {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RestrictOp {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "<>")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(serialize = "BETWEEN")]
    Between,
}

/// `column op value`, filtering a single FROM entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    pub column: ColumnRef,
    pub op: RestrictOp,
    pub value: String,
}

/// A bound parameter value handed to the planner alongside the query.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Default)]
pub struct Query {
    pub projection: Vec<String>,
    pub from: Vec<Rc<TableRef>>,
    pub join_quals: Vec<JoinQual>,
    pub restrictions: Vec<Restriction>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<ColumnRef>,
}

impl TableRef {
    pub fn new(table: Rc<TableStats>, alias: Option<String>) -> Self {
        Self { table, alias }
    }

    /// The name columns of this entry are qualified with.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.table.name())
    }
}

impl ColumnRef {
    pub fn new(rel: usize, column: &str) -> Self {
        Self {
            rel,
            column: column.to_string(),
        }
    }
}

impl JoinQual {
    /// Whether the qual has one side in each of the two FROM entry sets.
    pub fn connects(&self, left: impl Fn(usize) -> bool, right: impl Fn(usize) -> bool) -> bool {
        (left(self.left.rel) && right(self.right.rel))
            || (right(self.left.rel) && left(self.right.rel))
    }
}

impl RestrictOp {
    /// Flips the operator for `value op column` written the other way around.
    pub fn commute(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            op => op,
        }
    }

    pub fn selectivity(self) -> f64 {
        match self {
            Self::Eq => selectivity::EQ_SEL,
            Self::NotEq => selectivity::NEQ_SEL,
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => selectivity::INEQ_SEL,
            Self::Between => selectivity::RANGE_SEL,
        }
    }

    pub fn is_range(self) -> bool {
        !matches!(self, Self::Eq | Self::NotEq)
    }
}

impl Query {
    pub fn column_name(&self, column: &ColumnRef) -> String {
        format!("{}.{}", self.from[column.rel].name(), column.column)
    }

    pub fn restrictions_on(&self, rel: usize) -> impl Iterator<Item = &Restriction> {
        self.restrictions
            .iter()
            .filter(move |restriction| restriction.column.rel == rel)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.table.name(), alias),
            None => write!(f, "{}", self.table.name()),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quals = self
            .join_quals
            .iter()
            .map(|qual| {
                format!(
                    "{} = {}",
                    self.column_name(&qual.left),
                    self.column_name(&qual.right)
                )
            })
            .chain(self.restrictions.iter().map(|restriction| {
                format!(
                    "{} {} {}",
                    self.column_name(&restriction.column),
                    restriction.op,
                    restriction.value
                )
            }))
            .collect::<Vec<_>>();

        write!(
            f,
            "SELECT {} FROM {}",
            self.projection.iter().join(", "),
            self.from.iter().join(", ")
        )?;
        if !quals.is_empty() {
            write!(f, " WHERE {}", quals.iter().join(" and "))?;
        }
        if !self.group_by.is_empty() {
            write!(
                f,
                " GROUP BY {}",
                self.group_by.iter().map(|col| self.column_name(col)).join(", ")
            )?;
        }
        if !self.order_by.is_empty() {
            write!(
                f,
                " ORDER BY {}",
                self.order_by.iter().map(|col| self.column_name(col)).join(", ")
            )?;
        }
        Ok(())
    }
}
