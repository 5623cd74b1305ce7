use crate::catalog::Catalog;
use crate::query::{ColumnRef, JoinQual, Query, RestrictOp, Restriction, TableRef};
use sqlparser::ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::{Parser as RawParser, ParserError as RawParseError};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SQL syntax error: {0}")]
    Raw(#[from] RawParseError),
    #[error("only SELECT queries can be planned: {0}")]
    NonSelect(String),
    #[error("no such table: {0}")]
    NoTable(String),
    #[error("no such column: {0}")]
    NoColumn(String),
    #[error("column reference is ambiguous: {0}")]
    AmbiguousColumn(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Turns SQL text into planner queries, resolving tables and columns against a catalog.
pub struct Parser<'a> {
    catalog: &'a Catalog,
}

/// What a single conjunct of a WHERE or ON clause turned out to be.
enum Conjunct {
    Join(JoinQual),
    Restrict(Restriction),
}

impl<'a> Parser<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn parse(&self, sql: &str) -> Result<Vec<Query>> {
        let stmts = RawParser::parse_sql(&PostgreSqlDialect {}, sql)?;

        stmts
            .into_iter()
            .map(|stmt| {
                let stmt_str = stmt.to_string();
                let query = if let ast::Statement::Query(query) = stmt {
                    Ok(*query)
                } else {
                    Err(ParseError::NonSelect(stmt_str.clone()))
                }?;
                let order_by = query.order_by;
                let select = if let ast::SetExpr::Select(select) = *query.body {
                    Ok(select)
                } else {
                    Err(ParseError::NonSelect(stmt_str))
                }?;
                let select = *select;

                let (from, mut quals) = self.parse_from(select.from)?;
                if let Some(selection) = select.selection {
                    split_conjuncts(selection, &mut quals);
                }

                let mut join_quals = vec![];
                let mut restrictions = vec![];
                for qual in quals {
                    match parse_conjunct(qual, &from)? {
                        Conjunct::Join(qual) => join_quals.push(qual),
                        Conjunct::Restrict(restriction) => restrictions.push(restriction),
                    }
                }

                let group_by = select
                    .group_by
                    .iter()
                    .map(|expr| resolve_required(expr, &from))
                    .collect::<Result<Vec<_>>>()?;
                let order_by = order_by
                    .iter()
                    .map(|order| resolve_required(&order.expr, &from))
                    .collect::<Result<Vec<_>>>()?;

                Ok(Query {
                    projection: select
                        .projection
                        .iter()
                        .map(|item| item.to_string())
                        .collect(),
                    from,
                    join_quals,
                    restrictions,
                    group_by,
                    order_by,
                })
            })
            .collect()
    }

    /// Returns the FROM entries in textual order, plus the ON conditions of any inner joins.
    fn parse_from(
        &self,
        from: Vec<ast::TableWithJoins>,
    ) -> Result<(Vec<Rc<TableRef>>, Vec<ast::Expr>)> {
        fn parse_table(parser: &Parser, table: ast::TableFactor) -> Result<Rc<TableRef>> {
            match table {
                ast::TableFactor::Table { name, alias, .. } => {
                    let name = match &name.0[..] {
                        [ident] => ident.value.clone(),
                        _ => return Err(ParseError::Unsupported(name.to_string())),
                    };
                    let table = parser
                        .catalog
                        .get_table(&name)
                        .ok_or_else(|| ParseError::NoTable(name.clone()))?;
                    let alias = alias.map(|ast::TableAlias { name: alias, .. }| alias.value);
                    Ok(Rc::new(TableRef::new(table.clone(), alias)))
                }
                other => Err(ParseError::Unsupported(other.to_string())),
            }
        }

        let mut table_refs = vec![];
        let mut quals = vec![];
        for table in from {
            table_refs.push(parse_table(self, table.relation)?);
            for join in table.joins {
                match &join.join_operator {
                    ast::JoinOperator::Inner(ast::JoinConstraint::On(expr)) => {
                        split_conjuncts(expr.clone(), &mut quals)
                    }
                    ast::JoinOperator::Inner(ast::JoinConstraint::None)
                    | ast::JoinOperator::CrossJoin => {}
                    _ => return Err(ParseError::Unsupported(join.to_string())),
                }
                table_refs.push(parse_table(self, join.relation)?);
            }
        }

        let mut names: Vec<_> = table_refs.iter().map(|table_ref| table_ref.name()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ParseError::Unsupported(format!(
                "table name {} specified more than once",
                dup[0]
            )));
        }

        Ok((table_refs, quals))
    }
}

fn split_conjuncts(expr: ast::Expr, out: &mut Vec<ast::Expr>) {
    match expr {
        ast::Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::And,
            right,
        } => {
            split_conjuncts(*left, out);
            split_conjuncts(*right, out);
        }
        ast::Expr::Nested(expr) => split_conjuncts(*expr, out),
        expr => out.push(expr),
    }
}

fn parse_conjunct(expr: ast::Expr, from: &[Rc<TableRef>]) -> Result<Conjunct> {
    let unsupported = |expr: &ast::Expr| ParseError::Unsupported(expr.to_string());

    match &expr {
        ast::Expr::BinaryOp { left, op, right } => {
            let op = restrict_op(op).ok_or_else(|| unsupported(&expr))?;
            match (resolve_column(left, from)?, resolve_column(right, from)?) {
                (Some(left), Some(right)) if op == RestrictOp::Eq && left.rel != right.rel => {
                    Ok(Conjunct::Join(JoinQual { left, right }))
                }
                (Some(column), None) if is_constant(right) => Ok(Conjunct::Restrict(Restriction {
                    column,
                    op,
                    value: right.to_string(),
                })),
                (None, Some(column)) if is_constant(left) => Ok(Conjunct::Restrict(Restriction {
                    column,
                    op: op.commute(),
                    value: left.to_string(),
                })),
                _ => Err(unsupported(&expr)),
            }
        }
        ast::Expr::Between {
            expr: column,
            negated: false,
            low,
            high,
        } if is_constant(low) && is_constant(high) => match resolve_column(column, from)? {
            Some(column) => Ok(Conjunct::Restrict(Restriction {
                column,
                op: RestrictOp::Between,
                value: format!("{} AND {}", low, high),
            })),
            None => Err(unsupported(&expr)),
        },
        _ => Err(unsupported(&expr)),
    }
}

fn restrict_op(op: &ast::BinaryOperator) -> Option<RestrictOp> {
    match op {
        ast::BinaryOperator::Eq => Some(RestrictOp::Eq),
        ast::BinaryOperator::NotEq => Some(RestrictOp::NotEq),
        ast::BinaryOperator::Lt => Some(RestrictOp::Lt),
        ast::BinaryOperator::LtEq => Some(RestrictOp::LtEq),
        ast::BinaryOperator::Gt => Some(RestrictOp::Gt),
        ast::BinaryOperator::GtEq => Some(RestrictOp::GtEq),
        _ => None,
    }
}

fn is_constant(expr: &ast::Expr) -> bool {
    match expr {
        ast::Expr::Value(_) => true,
        ast::Expr::UnaryOp { expr, .. } | ast::Expr::Nested(expr) => is_constant(expr),
        _ => false,
    }
}

/// Resolves a column reference, or returns `None` if the expression is not one.
fn resolve_column(expr: &ast::Expr, from: &[Rc<TableRef>]) -> Result<Option<ColumnRef>> {
    match expr {
        ast::Expr::Identifier(ident) => {
            let mut matches = from
                .iter()
                .enumerate()
                .filter(|(_, table_ref)| table_ref.table.has_column(&ident.value));
            match (matches.next(), matches.next()) {
                (Some((rel, _)), None) => Ok(Some(ColumnRef::new(rel, &ident.value))),
                (Some(_), Some(_)) => Err(ParseError::AmbiguousColumn(ident.value.clone())),
                (None, _) => Err(ParseError::NoColumn(ident.value.clone())),
            }
        }
        ast::Expr::CompoundIdentifier(idents) => match &idents[..] {
            [table, column] => {
                let (rel, table_ref) = from
                    .iter()
                    .enumerate()
                    .find(|(_, table_ref)| table_ref.name() == table.value)
                    .ok_or_else(|| ParseError::NoTable(table.value.clone()))?;
                if table_ref.table.has_column(&column.value) {
                    Ok(Some(ColumnRef::new(rel, &column.value)))
                } else {
                    Err(ParseError::NoColumn(expr.to_string()))
                }
            }
            _ => Err(ParseError::Unsupported(expr.to_string())),
        },
        ast::Expr::Nested(expr) => resolve_column(expr, from),
        _ => Ok(None),
    }
}

fn resolve_required(expr: &ast::Expr, from: &[Rc<TableRef>]) -> Result<ColumnRef> {
    resolve_column(expr, from)?.ok_or_else(|| ParseError::Unsupported(expr.to_string()))
}
