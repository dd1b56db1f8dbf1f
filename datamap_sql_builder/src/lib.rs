#![forbid(unsafe_code)]
//! Renders a datamap [`Query`] into one parameterised SQL statement.
//!
//! Placeholders are always `?` (SQLite/libsql style). Filters become an ANDed list of
//! equalities; a `NULL` filter value renders `IS NULL` and binds nothing.
//!
//! With feature `libsql_returning`, inserts append `RETURNING id`.

use datamap_core::{Direction, Operation, Query, Record, Value};
use thiserror::Error;

#[cfg(feature = "libsql_returning")]
use datamap_core::ID_COLUMN;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("update of `{table}` has no columns to set")]
    EmptyUpdate { table: String },
}

/// ASCII letters, digits, or `_`, not starting with a digit.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

fn ident(s: &str) -> Result<&str, BuildError> {
    if is_valid_identifier(s) {
        Ok(s)
    } else {
        Err(BuildError::InvalidIdentifier(s.to_string()))
    }
}

/// Render `query` for execution.
pub fn render(query: &Query) -> Result<Statement, BuildError> {
    let table = ident(query.table_name())?;
    match query.operation() {
        Operation::Select => select(table, query),
        Operation::Count => count(table, query.filters()),
        Operation::Insert(columns) => insert(table, columns),
        Operation::Update(columns) => update(table, columns, query.filters()),
        Operation::Delete => delete(table, query.filters()),
    }
}

/// Build WHERE clause for a conjunction (AND) of equality comparisons.
/// Returns ("WHERE a = ? AND b IS NULL ...", params_in_order); empty when there are no filters.
pub fn build_where_and(filters: &Record) -> Result<(String, Vec<Value>), BuildError> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut clauses = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for (column, value) in filters.iter() {
        let column = ident(column)?;
        if value.is_null() {
            clauses.push(format!("{column} IS NULL"));
        } else {
            clauses.push(format!("{column} = ?"));
            params.push(value.clone());
        }
    }
    Ok((format!("WHERE {}", clauses.join(" AND ")), params))
}

/// ORDER BY / LIMIT / OFFSET tail, with a leading space when non-empty.
///
/// SQLite only accepts OFFSET after a LIMIT, so an offset alone renders `LIMIT -1`.
pub fn pagination_clause(
    ordering: &[(String, Direction)],
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<String, BuildError> {
    let mut sql = String::new();
    if !ordering.is_empty() {
        let terms = ordering
            .iter()
            .map(|(column, dir)| Ok(format!("{} {}", ident(column)?, dir.as_sql())))
            .collect::<Result<Vec<_>, BuildError>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }
    match (limit, offset) {
        (Some(l), _) => {
            sql.push_str(" LIMIT ");
            sql.push_str(&l.to_string());
        }
        (None, Some(_)) => sql.push_str(" LIMIT -1"),
        (None, None) => {}
    }
    if let Some(off) = offset {
        sql.push_str(" OFFSET ");
        sql.push_str(&off.to_string());
    }
    Ok(sql)
}

fn with_where(mut sql: String, where_sql: &str) -> String {
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(where_sql);
    }
    sql
}

fn select(table: &str, query: &Query) -> Result<Statement, BuildError> {
    let (where_sql, params) = build_where_and(query.filters())?;
    let mut sql = with_where(format!("SELECT * FROM {table}"), &where_sql);
    sql.push_str(&pagination_clause(
        query.ordering(),
        query.row_limit(),
        query.row_offset(),
    )?);
    Ok(Statement { sql, params })
}

fn count(table: &str, filters: &Record) -> Result<Statement, BuildError> {
    let (where_sql, params) = build_where_and(filters)?;
    let sql = with_where(format!("SELECT COUNT(*) FROM {table}"), &where_sql);
    Ok(Statement { sql, params })
}

/// An insert without columns takes every column default.
fn insert(table: &str, columns: &Record) -> Result<Statement, BuildError> {
    #[allow(unused_mut)]
    let mut sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let names = columns
            .keys()
            .map(ident)
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = vec!["?"; names.len()];
        format!(
            "INSERT INTO {table} ({cols}) VALUES ({vals})",
            cols = names.join(", "),
            vals = placeholders.join(", ")
        )
    };
    #[cfg(feature = "libsql_returning")]
    {
        sql.push_str(" RETURNING ");
        sql.push_str(ID_COLUMN);
    }
    Ok(Statement {
        sql,
        params: columns.values().cloned().collect(),
    })
}

fn update(table: &str, columns: &Record, filters: &Record) -> Result<Statement, BuildError> {
    if columns.is_empty() {
        return Err(BuildError::EmptyUpdate {
            table: table.to_string(),
        });
    }
    let mut assignments = Vec::with_capacity(columns.len());
    let mut params: Vec<Value> = Vec::with_capacity(columns.len() + filters.len());
    for (column, value) in columns.iter() {
        assignments.push(format!("{} = ?", ident(column)?));
        params.push(value.clone());
    }
    let (where_sql, where_params) = build_where_and(filters)?;
    params.extend(where_params);
    let sql = with_where(
        format!("UPDATE {table} SET {}", assignments.join(", ")),
        &where_sql,
    );
    Ok(Statement { sql, params })
}

fn delete(table: &str, filters: &Record) -> Result<Statement, BuildError> {
    let (where_sql, params) = build_where_and(filters)?;
    let sql = with_where(format!("DELETE FROM {table}"), &where_sql);
    Ok(Statement { sql, params })
}
