//! An in-memory [`QueryBuilder`] that behaves like a small SQLite table store.
//!
//! Booleans are stored as 0/1 integers, every row carries an integer `id`
//! primary key, and columns not given on insert are `NULL`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use datamap_core::{
    Direction, Operation, Query, QueryBuilder, QueryOutput, Record, RepoError, RepoResult, Value,
    COUNT_COLUMN, ID_COLUMN,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("no such table: {0}")]
    NoSuchTable(String),
    #[error("table {table} has no column named {column}")]
    NoSuchColumn { table: String, column: String },
    #[error("memory database lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
    next_id: i64,
}

impl Table {
    fn check<'a>(&self, table: &str, columns: impl IntoIterator<Item = &'a str>) -> RepoResult<()> {
        for column in columns {
            if !self.columns.iter().any(|c| c == column) {
                return Err(RepoError::backend(MemoryError::NoSuchColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                }));
            }
        }
        Ok(())
    }

    fn insert(&mut self, table: &str, columns: &Record) -> RepoResult<i64> {
        self.check(table, columns.keys())?;
        let id = match columns.get(ID_COLUMN).and_then(Value::as_i64) {
            Some(id) => id,
            None => self.next_id,
        };
        self.next_id = self.next_id.max(id.saturating_add(1));
        let mut row = Record::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = if column == ID_COLUMN {
                Value::I64(id)
            } else {
                columns.get(column).map(store).unwrap_or(Value::Null)
            };
            row.insert(column.as_str(), value);
        }
        self.rows.push(row);
        Ok(id)
    }

    fn matching(&self, filters: &Record) -> impl Iterator<Item = &Record> {
        let filters = stored(filters);
        self.rows
            .iter()
            .filter(move |row| filters.iter().all(|(k, v)| row.get(k) == Some(v)))
    }
}

fn store(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::I64(i64::from(*b)),
        other => other.clone(),
    }
}

fn stored(record: &Record) -> Record {
    record.iter().map(|(k, v)| (k, store(v))).collect()
}

fn compare(a: &Record, b: &Record, ordering: &[(String, Direction)]) -> Ordering {
    for (column, direction) in ordering {
        let ord = a
            .get(column)
            .partial_cmp(&b.get(column))
            .unwrap_or(Ordering::Equal);
        let ord = match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn no_such_table(name: &str) -> RepoError {
    RepoError::backend(MemoryError::NoSuchTable(name.to_string()))
}

fn table_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> RepoResult<&'a mut Table> {
    tables.get_mut(name).ok_or_else(|| no_such_table(name))
}

/// Shared handle; clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `table` with an `id` primary key plus `columns`. Replaces any existing table.
    pub fn with_table(self, table: &str, columns: &[&str]) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            let mut all = vec![ID_COLUMN.to_string()];
            all.extend(columns.iter().map(|c| c.to_string()));
            tables.insert(
                table.to_string(),
                Table {
                    columns: all,
                    rows: Vec::new(),
                    next_id: 1,
                },
            );
        }
        self
    }

    /// Raw insert, bypassing entities and validation. Returns the new id.
    pub fn seed(&self, table: &str, columns: Record) -> RepoResult<i64> {
        let mut tables = self.lock()?;
        table_mut(&mut tables, table)?.insert(table, &columns)
    }

    /// Snapshot of the stored rows, in insertion order.
    pub fn rows(&self, table: &str) -> RepoResult<Vec<Record>> {
        let tables = self.lock()?;
        match tables.get(table) {
            Some(t) => Ok(t.rows.clone()),
            None => Err(no_such_table(table)),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, HashMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| RepoError::backend(MemoryError::Poisoned))
    }

    fn execute(&self, query: &Query) -> RepoResult<QueryOutput> {
        let mut tables = self.lock()?;
        let name = query.table_name();
        let table = table_mut(&mut tables, name)?;
        table.check(name, query.filters().keys())?;
        match query.operation() {
            Operation::Insert(columns) => table
                .insert(name, columns)
                .map(|id| QueryOutput::Inserted(vec![id])),
            Operation::Select => {
                table.check(name, query.ordering().iter().map(|(c, _)| c.as_str()))?;
                let mut rows: Vec<Record> = table.matching(query.filters()).cloned().collect();
                rows.sort_by(|a, b| compare(a, b, query.ordering()));
                let rows = rows
                    .into_iter()
                    .skip(query.row_offset().unwrap_or(0))
                    .take(query.row_limit().unwrap_or(usize::MAX))
                    .collect();
                Ok(QueryOutput::Rows(rows))
            }
            Operation::Count => {
                let n = table.matching(query.filters()).count() as i64;
                let mut row = Record::new();
                row.insert(COUNT_COLUMN, n);
                Ok(QueryOutput::Rows(vec![row]))
            }
            Operation::Update(columns) => {
                table.check(name, columns.keys())?;
                let filters = stored(query.filters());
                let set = stored(columns);
                let mut affected = 0;
                for row in table
                    .rows
                    .iter_mut()
                    .filter(|row| filters.iter().all(|(k, v)| row.get(k) == Some(v)))
                {
                    for (k, v) in set.iter() {
                        row.insert(k, v.clone());
                    }
                    affected += 1;
                }
                Ok(QueryOutput::Affected(affected))
            }
            Operation::Delete => {
                let filters = stored(query.filters());
                let before = table.rows.len();
                table
                    .rows
                    .retain(|row| !filters.iter().all(|(k, v)| row.get(k) == Some(v)));
                Ok(QueryOutput::Affected((before - table.rows.len()) as u64))
            }
        }
    }
}

#[async_trait]
impl QueryBuilder for MemoryDatabase {
    async fn run(&self, query: Query) -> RepoResult<QueryOutput> {
        self.execute(&query)
    }
}
