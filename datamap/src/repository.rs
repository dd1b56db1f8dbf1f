//! CRUD helpers bound to one entity kind, one table and one query builder.

use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

use datamap_core::obs::obs_record;
use datamap_core::{
    Adaptor, EntityKind, Query, QueryBuilder, QueryOutput, Record, RepoError, RepoResult,
    ID_COLUMN,
};

use crate::entity::Entity;

/// A repository over `K` entities stored in one table.
///
/// Holds nothing but the table name and the query-builder handle, so it is cheap to
/// clone whenever `Q` is (for example an `Arc<dyn QueryBuilder>`).
///
/// Reads build unvalidated entities, except [`find_where`](Self::find_where) and
/// [`find`](Self::find) which validate what they return. Writes validate first and
/// only touch the database when the entity is valid.
pub struct Repository<K: EntityKind, Q> {
    db: Q,
    table: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind, Q: QueryBuilder> Repository<K, Q> {
    /// Bind to `K::TABLE`.
    pub fn new(db: Q) -> Self {
        Self::for_table(db, K::TABLE)
    }

    pub fn for_table(db: Q, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            _kind: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn db(&self) -> &Q {
        &self.db
    }

    /// Attribute names to column names, using the kind's adaptor.
    pub fn to_columns(attributes: &Record) -> Record {
        K::adaptor().columns(attributes)
    }

    /// A select on this table filtered by `attributes`, then customized.
    ///
    /// Nothing runs; callers pick the operation and execute.
    pub(crate) fn filtered<F>(&self, attributes: &Record, customize: F) -> Query
    where
        F: FnOnce(Query) -> Query,
    {
        let query = self.db.table(&self.table).filter(Self::to_columns(attributes));
        customize(query)
    }

    /// All rows matching `attributes`, in the order the query builder returns them.
    pub async fn filter(&self, attributes: &Record) -> RepoResult<Vec<Entity<K>>> {
        self.filter_with(attributes, |q| q).await
    }

    /// Like [`filter`](Self::filter), with `customize` applied to the query before it runs.
    pub async fn filter_with<F>(
        &self,
        attributes: &Record,
        customize: F,
    ) -> RepoResult<Vec<Entity<K>>>
    where
        F: FnOnce(Query) -> Query + Send,
    {
        let query = self.filtered(attributes, customize);
        let rows = self.fetch("filter", query).await?;
        Ok(Entity::collection(rows))
    }

    /// The first row matching `attributes`, validated. `None` when nothing matches.
    pub async fn find_where(&self, attributes: &Record) -> RepoResult<Option<Entity<K>>> {
        let query = self.filtered(attributes, |q| q.limit(1));
        let rows = self.fetch("find_where", query).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let mut entity = Entity::from_columns(&row);
                entity.validate().await;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    /// The entity with integer id `id`, or [`RepoError::NotFound`].
    pub async fn find(&self, id: i64) -> RepoResult<Entity<K>> {
        let mut attributes = Record::new();
        attributes.insert(ID_COLUMN, id);
        self.find_where(&attributes)
            .await?
            .ok_or(RepoError::NotFound)
    }

    pub async fn count(&self, attributes: &Record) -> RepoResult<i64> {
        let start = Instant::now();
        let query = self.filtered(attributes, Query::count);
        let result = self.db.run(query).await.and_then(QueryOutput::into_count);
        self.observe("count", start, &result, |_| 1);
        result
    }

    pub async fn all(&self) -> RepoResult<Vec<Entity<K>>> {
        self.all_with(|q| q).await
    }

    /// Every row of the table, after `customize` (ordering, limits) is applied.
    pub async fn all_with<F>(&self, customize: F) -> RepoResult<Vec<Entity<K>>>
    where
        F: FnOnce(Query) -> Query + Send,
    {
        let query = customize(self.db.table(&self.table));
        let rows = self.fetch("all", query).await?;
        Ok(Entity::collection(rows))
    }

    /// Insert `entity` when valid and return the stored row.
    ///
    /// An invalid entity comes back as given, with its errors populated; nothing is written.
    pub async fn create(&self, mut entity: Entity<K>) -> RepoResult<Entity<K>> {
        if !entity.validate().await {
            return Ok(entity);
        }
        let start = Instant::now();
        let query = self.db.table(&self.table).insert(entity.columns());
        let inserted = self
            .db
            .run(query)
            .await
            .and_then(QueryOutput::into_inserted_id);
        self.observe("create", start, &inserted, |_| 1);
        self.find(inserted?).await
    }

    /// Write `entity`'s columns to the row with `id` when valid and return the stored row.
    ///
    /// An invalid entity comes back as given, with its errors populated; nothing is written.
    pub async fn update(&self, id: i64, mut entity: Entity<K>) -> RepoResult<Entity<K>> {
        if !entity.validate().await {
            return Ok(entity);
        }
        let start = Instant::now();
        let query = self
            .db
            .table(&self.table)
            .filter_eq(ID_COLUMN, id)
            .update(entity.columns());
        let affected = self.db.run(query).await.and_then(QueryOutput::into_affected);
        self.observe("update", start, &affected, |n| *n as usize);
        affected?;
        self.find(id).await
    }

    /// Number of rows removed; 0 when `id` does not exist.
    pub async fn delete(&self, id: i64) -> RepoResult<u64> {
        let start = Instant::now();
        let query = self.db.table(&self.table).filter_eq(ID_COLUMN, id).delete();
        let result = self.db.run(query).await.and_then(QueryOutput::into_affected);
        self.observe("delete", start, &result, |n| *n as usize);
        result
    }

    async fn fetch(&self, op: &str, query: Query) -> RepoResult<Vec<Record>> {
        let start = Instant::now();
        let result = self.db.run(query).await.and_then(QueryOutput::into_rows);
        self.observe(op, start, &result, Vec::len);
        result
    }

    fn observe<T>(&self, op: &str, start: Instant, result: &RepoResult<T>, rows: impl FnOnce(&T) -> usize) {
        match result {
            Ok(value) => obs_record(op, &self.table, start, rows(value), true),
            Err(_) => obs_record(op, &self.table, start, 0, false),
        }
    }
}

impl<K: EntityKind, Q: Clone> Clone for Repository<K, Q> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            table: self.table.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: EntityKind, Q> fmt::Debug for Repository<K, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
