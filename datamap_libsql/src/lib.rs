#![forbid(unsafe_code)]
#![cfg_attr(
    not(feature = "libsql-backend"),
    doc = "Enable feature `libsql-backend` to use this adapter."
)]

#[cfg(feature = "libsql-backend")]
mod backend {
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;
    use datamap_core::obs::obs_record;
    use datamap_core::{
        Operation, Query, QueryBuilder, QueryOutput, Record, RepoError, RepoResult, Value,
        COUNT_COLUMN,
    };
    use libsql::{Connection, Database, Rows};

    // SQLite has no boolean type; bools are stored as 0/1.
    fn to_libsql_value(v: Value) -> libsql::Value {
        match v {
            Value::Null => libsql::Value::Null,
            Value::Bool(b) => libsql::Value::Integer(i64::from(b)),
            Value::I64(i) => libsql::Value::Integer(i),
            Value::F64(f) => libsql::Value::Real(f),
            Value::String(s) => libsql::Value::Text(s),
            Value::Bytes(b) => libsql::Value::Blob(b),
        }
    }

    fn from_libsql_value(v: libsql::Value) -> Value {
        match v {
            libsql::Value::Null => Value::Null,
            libsql::Value::Integer(i) => Value::I64(i),
            libsql::Value::Real(f) => Value::F64(f),
            libsql::Value::Text(s) => Value::String(s),
            libsql::Value::Blob(b) => Value::Bytes(b),
        }
    }

    fn op_name(op: &Operation) -> &'static str {
        match op {
            Operation::Select => "select",
            Operation::Count => "count",
            Operation::Insert(_) => "insert",
            Operation::Update(_) => "update",
            Operation::Delete => "delete",
        }
    }

    async fn read_rows(rows: &mut Rows) -> RepoResult<Vec<Record>> {
        let names: Vec<String> = (0..rows.column_count())
            .map(|i| rows.column_name(i).unwrap_or_default().to_string())
            .collect();
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(RepoError::backend)? {
            let mut record = Record::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let value = row.get_value(i as i32).map_err(RepoError::mapping)?;
                record.insert(name.as_str(), from_libsql_value(value));
            }
            out.push(record);
        }
        Ok(out)
    }

    async fn first_integer(rows: &mut Rows, what: &str) -> RepoResult<i64> {
        let row = rows
            .next()
            .await
            .map_err(RepoError::backend)?
            .ok_or_else(|| {
                RepoError::mapping(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("no row returned for {what}"),
                ))
            })?;
        row.get::<i64>(0).map_err(RepoError::mapping)
    }

    /// A [`QueryBuilder`] executing datamap queries against libsql/SQLite.
    #[derive(Clone)]
    pub struct LibsqlDatabase {
        db: Arc<Database>,
        /// When set, every query runs on this connection instead of a fresh one.
        conn: Option<Connection>,
    }

    impl LibsqlDatabase {
        /// Creates a new query builder from an existing `libsql::Database` object.
        pub fn new(db: Arc<Database>) -> Self {
            Self { db, conn: None }
        }

        /// All queries execute on the provided connection. Required for `:memory:`
        /// databases, where each new connection sees an empty database.
        pub fn from_conn(db: Arc<Database>, conn: Connection) -> Self {
            Self {
                db,
                conn: Some(conn),
            }
        }

        /// Opens the database at `database_url` (a path, `:memory:`, or `file:` URL).
        pub async fn from_url(database_url: &str) -> RepoResult<Self> {
            // Database::open is deprecated upstream; keep a narrow allow here until Builder migration
            #[allow(deprecated)]
            let db = Arc::new(Database::open(database_url).map_err(RepoError::backend)?);
            Ok(Self::new(db))
        }

        pub fn database(&self) -> &Arc<Database> {
            &self.db
        }

        /// The bound connection, or a new one.
        pub fn connect(&self) -> RepoResult<Connection> {
            match &self.conn {
                Some(c) => Ok(c.clone()),
                None => self.db.connect().map_err(RepoError::backend),
            }
        }

        async fn execute(&self, query: &Query) -> RepoResult<(QueryOutput, usize)> {
            let statement = datamap_sql_builder::render(query).map_err(RepoError::backend)?;
            let params: Vec<libsql::Value> =
                statement.params.into_iter().map(to_libsql_value).collect();
            let conn = self.connect()?;
            match query.operation() {
                Operation::Select => {
                    let mut rows = conn
                        .query(&statement.sql, params)
                        .await
                        .map_err(RepoError::backend)?;
                    let records = read_rows(&mut rows).await?;
                    let n = records.len();
                    Ok((QueryOutput::Rows(records), n))
                }
                Operation::Count => {
                    let mut rows = conn
                        .query(&statement.sql, params)
                        .await
                        .map_err(RepoError::backend)?;
                    let count = first_integer(&mut rows, "COUNT(*)").await?;
                    let mut row = Record::new();
                    row.insert(COUNT_COLUMN, count);
                    Ok((QueryOutput::Rows(vec![row]), 1))
                }
                Operation::Insert(_) => {
                    #[cfg(feature = "libsql_returning")]
                    let id = {
                        // INSERT ... RETURNING id
                        let mut rows = conn
                            .query(&statement.sql, params)
                            .await
                            .map_err(RepoError::backend)?;
                        first_integer(&mut rows, "INSERT ... RETURNING").await?
                    };
                    #[cfg(not(feature = "libsql_returning"))]
                    let id = {
                        conn.execute(&statement.sql, params)
                            .await
                            .map_err(RepoError::backend)?;
                        conn.last_insert_rowid()
                    };
                    Ok((QueryOutput::Inserted(vec![id]), 1))
                }
                Operation::Update(_) | Operation::Delete => {
                    let n = conn
                        .execute(&statement.sql, params)
                        .await
                        .map_err(RepoError::backend)?;
                    Ok((QueryOutput::Affected(n), n as usize))
                }
            }
        }
    }

    #[async_trait]
    impl QueryBuilder for LibsqlDatabase {
        async fn run(&self, query: Query) -> RepoResult<QueryOutput> {
            let start = Instant::now();
            let result = self.execute(&query).await;
            let op = op_name(query.operation());
            match result {
                Ok((output, rows)) => {
                    obs_record(op, query.table_name(), start, rows, true);
                    Ok(output)
                }
                Err(e) => {
                    obs_record(op, query.table_name(), start, 0, false);
                    Err(e)
                }
            }
        }
    }
}

#[cfg(feature = "libsql-backend")]
pub use backend::LibsqlDatabase;

#[cfg(all(test, feature = "libsql-backend"))]
mod tests {
    use super::LibsqlDatabase;
    use datamap::{record, Direction, Entity, Query, QueryBuilder, QueryOutput, RepoError, Repository, Value};
    use libsql::Database;
    use std::sync::Arc;
    use tests_common::{migrations, Cream};

    async fn setup_db(dir: &tempfile::TempDir) -> LibsqlDatabase {
        let path = dir.path().join("datamap_libsql_tests.sqlite3");
        // Database::open is deprecated upstream; narrow allow inside tests setup only.
        #[allow(deprecated)]
        let db = Database::open(format!("file:{}?mode=rwc", path.display())).expect("open db");
        let conn = db.connect().expect("connect");
        conn.execute(migrations::LIBSQL_CREAMS_SQL, ())
            .await
            .expect("apply schema");
        LibsqlDatabase::new(Arc::new(db))
    }

    #[tokio::test]
    async fn runs_each_operation_against_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = setup_db(&dir).await;

        let out = db
            .run(Query::new("creams").insert(record! { "name" => "Vanille", "is_vegan" => true }))
            .await
            .expect("insert");
        let id = out.into_inserted_id().expect("id");
        assert!(id > 0);
        db.run(Query::new("creams").insert(record! { "name" => "Himbeere" }))
            .await
            .expect("insert");

        let rows = db
            .run(Query::new("creams").order_by("name", Direction::Asc))
            .await
            .and_then(QueryOutput::into_rows)
            .expect("select");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Himbeere")));
        assert_eq!(rows[0].get("is_vegan"), Some(&Value::Null));
        assert_eq!(rows[1].get("is_vegan"), Some(&Value::I64(1)));

        let n = db
            .run(Query::new("creams").filter_eq("is_vegan", true).count())
            .await
            .and_then(QueryOutput::into_count)
            .expect("count");
        assert_eq!(n, 1);

        let updated = db
            .run(Query::new("creams").filter_eq("id", id).update(record! { "name" => "Kirsche" }))
            .await
            .expect("update");
        assert_eq!(updated, QueryOutput::Affected(1));

        let deleted = db
            .run(Query::new("creams").filter_eq("name", Value::Null).delete())
            .await
            .expect("delete");
        assert_eq!(deleted, QueryOutput::Affected(1));
    }

    #[tokio::test]
    async fn unknown_column_surfaces_backend_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = setup_db(&dir).await;
        let err = db
            .run(Query::new("creams").filter_eq("does_not_exist", "x"))
            .await
            .expect_err("expected query to fail");
        assert!(matches!(err, RepoError::Backend { .. }));
        let source = std::error::Error::source(&err).map(|s| s.to_string().to_lowercase());
        assert!(
            source.as_deref().is_some_and(|m| m.contains("no such column")),
            "unexpected error: {source:?}"
        );
    }

    #[tokio::test]
    async fn invalid_identifier_never_reaches_the_driver() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = setup_db(&dir).await;
        let err = db
            .run(Query::new("creams; DROP TABLE creams"))
            .await
            .expect_err("expected render to fail");
        assert!(matches!(err, RepoError::Backend { .. }));
        let rows = db.run(Query::new("creams")).await.expect("table still exists");
        assert_eq!(rows, QueryOutput::Rows(vec![]));
    }

    #[derive(datamap::EntityKind)]
    #[entity(table = "creams")]
    struct UncheckedCream;

    #[tokio::test]
    async fn creating_without_attributes_takes_column_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let creams: Repository<UncheckedCream, _> = Repository::new(setup_db(&dir).await);

        let created = creams.create(Entity::new(record! {})).await.expect("create");
        assert!(created.id().is_some_and(|id| id > 0));
        assert_eq!(created.get("name"), Some(&Value::Null));
        assert_eq!(created.get("isVegan"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn repository_round_trip_uses_camel_case_attributes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let creams: Repository<Cream, _> = Repository::new(setup_db(&dir).await);

        let created = creams
            .create(Entity::new(record! { "name" => "Schokolade", "isVegan" => true }))
            .await
            .expect("create");
        let id = created.id().expect("id");
        assert_eq!(created.get("isVegan").and_then(Value::as_bool), Some(true));

        let found = creams
            .find_where(&record! { "isVegan" => true })
            .await
            .expect("find_where")
            .expect("matching cream");
        assert_eq!(found.id(), Some(id));
        assert_eq!(found.is_valid(), Some(true));

        assert_eq!(creams.delete(id).await.expect("delete"), 1);
        let err = creams.find(id).await.expect_err("deleted");
        assert_eq!(err.to_string(), "Record not found");
    }
}
