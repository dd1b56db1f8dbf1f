//! The query-builder contract repositories are written against.
//!
//! A [`Query`] is a plain, inspectable value built by chaining; a [`QueryBuilder`]
//! hands out queries bound to a table and executes them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Record, RepoError, RepoResult, Value};

/// Field of the single row a count query yields.
pub const COUNT_COLUMN: &str = "count(*)";

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// What a query does once executed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    Count,
    Insert(Record),
    Update(Record),
    Delete,
}

/// A chainable query against one table. Filters are column equalities joined by AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    operation: Operation,
    filters: Record,
    order_by: Vec<(String, Direction)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    /// A select over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operation: Operation::Select,
            filters: Record::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self) -> Self {
        self.operation = Operation::Select;
        self
    }

    pub fn count(mut self) -> Self {
        self.operation = Operation::Count;
        self
    }

    pub fn insert(mut self, columns: Record) -> Self {
        self.operation = Operation::Insert(columns);
        self
    }

    pub fn update(mut self, columns: Record) -> Self {
        self.operation = Operation::Update(columns);
        self
    }

    pub fn delete(mut self) -> Self {
        self.operation = Operation::Delete;
        self
    }

    /// Add equality filters; repeated columns keep the latest value.
    pub fn filter(mut self, columns: Record) -> Self {
        self.filters.extend(columns);
        self
    }

    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(column, value);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn filters(&self) -> &Record {
        &self.filters
    }

    pub fn ordering(&self) -> &[(String, Direction)] {
        &self.order_by
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn row_offset(&self) -> Option<usize> {
        self.offset
    }
}

/// Result of running a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Selected rows, snake_case keyed. A count yields one row holding [`COUNT_COLUMN`].
    Rows(Vec<Record>),
    /// Generated ids of inserted rows; the first is the new row's id.
    Inserted(Vec<i64>),
    /// Rows touched by an update or delete.
    Affected(u64),
}

fn shape_error(expected: &str, got: &QueryOutput) -> RepoError {
    let got = match got {
        QueryOutput::Rows(_) => "rows",
        QueryOutput::Inserted(_) => "inserted ids",
        QueryOutput::Affected(_) => "affected count",
    };
    RepoError::mapping(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("expected {expected}, query builder returned {got}"),
    ))
}

impl QueryOutput {
    pub fn into_rows(self) -> RepoResult<Vec<Record>> {
        match self {
            QueryOutput::Rows(rows) => Ok(rows),
            other => Err(shape_error("rows", &other)),
        }
    }

    pub fn into_inserted_id(self) -> RepoResult<i64> {
        match self {
            QueryOutput::Inserted(ids) => ids.first().copied().ok_or_else(|| {
                RepoError::mapping(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "insert returned no generated id",
                ))
            }),
            other => Err(shape_error("inserted ids", &other)),
        }
    }

    pub fn into_affected(self) -> RepoResult<u64> {
        match self {
            QueryOutput::Affected(n) => Ok(n),
            other => Err(shape_error("affected count", &other)),
        }
    }

    /// The number held by a count query's single row.
    pub fn into_count(self) -> RepoResult<i64> {
        let rows = self.into_rows()?;
        rows.first()
            .and_then(|row| row.get(COUNT_COLUMN))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                RepoError::mapping(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("count result has no integer `{COUNT_COLUMN}` field"),
                ))
            })
    }
}

/// The external query builder / database driver.
///
/// Implementations execute queries and surface their own failures as
/// [`RepoError::Backend`]; callers never retry.
#[async_trait]
pub trait QueryBuilder: Send + Sync {
    /// A fresh select query bound to `table`.
    fn table(&self, table: &str) -> Query {
        Query::new(table)
    }

    async fn run(&self, query: Query) -> RepoResult<QueryOutput>;
}

#[async_trait]
impl<T: QueryBuilder + ?Sized> QueryBuilder for Arc<T> {
    fn table(&self, table: &str) -> Query {
        (**self).table(table)
    }

    async fn run(&self, query: Query) -> RepoResult<QueryOutput> {
        (**self).run(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use futures::executor::block_on;
    use std::sync::Mutex;

    #[test]
    fn chaining_builds_inspectable_query() {
        let q = Query::new("creams")
            .filter(record! { "is_vegan" => true })
            .filter_eq("name", "Vanille")
            .order_by("name", Direction::Desc)
            .limit(1)
            .offset(2);
        assert_eq!(q.table_name(), "creams");
        assert_eq!(q.operation(), &Operation::Select);
        assert_eq!(q.filters().keys().collect::<Vec<_>>(), vec!["is_vegan", "name"]);
        assert_eq!(q.ordering(), &[("name".to_string(), Direction::Desc)]);
        assert_eq!(q.row_limit(), Some(1));
        assert_eq!(q.row_offset(), Some(2));
    }

    #[test]
    fn last_operation_wins() {
        let q = Query::new("creams").count().delete();
        assert_eq!(q.operation(), &Operation::Delete);
        let q = q.insert(record! { "name" => "x" });
        assert!(matches!(q.operation(), Operation::Insert(c) if c.contains_key("name")));
    }

    #[test]
    fn output_shape_mismatch_is_mapping_error() {
        let err = QueryOutput::Affected(1).into_rows().unwrap_err();
        assert!(matches!(err, RepoError::Mapping { .. }));
        let err = QueryOutput::Inserted(vec![]).into_inserted_id().unwrap_err();
        assert!(matches!(err, RepoError::Mapping { .. }));
        assert_eq!(QueryOutput::Inserted(vec![5, 6]).into_inserted_id().unwrap(), 5);
    }

    #[test]
    fn count_is_read_from_count_field() {
        let out = QueryOutput::Rows(vec![record! { COUNT_COLUMN => 3 }]);
        assert_eq!(out.into_count().unwrap(), 3);
        let bad = QueryOutput::Rows(vec![record! { "n" => 3 }]);
        assert!(bad.into_count().is_err());
    }

    /// Records every query it is asked to run.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Query>>,
    }

    #[async_trait]
    impl QueryBuilder for Recorder {
        async fn run(&self, query: Query) -> RepoResult<QueryOutput> {
            self.seen.lock().unwrap().push(query);
            Ok(QueryOutput::Affected(0))
        }
    }

    #[test]
    fn shared_handles_delegate_to_inner_builder() {
        let inner = Arc::new(Recorder::default());
        let shared: Arc<dyn QueryBuilder> = inner.clone();
        let q = shared.table("creams").delete();
        let out = block_on(shared.run(q)).unwrap();
        assert_eq!(out, QueryOutput::Affected(0));
        let seen = inner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].table_name(), "creams");
    }
}
