#![forbid(unsafe_code)]
//! Facade crate for the `datamap` entity/repository layer.
//!
//! An [`EntityKind`] fixes how attributes are validated and how attribute names map
//! to column names. [`Entity<K>`](Entity) is one attribute bag of that kind and
//! [`Repository<K, Q>`](Repository) runs CRUD queries for it through any
//! [`QueryBuilder`].
//!
//! ```ignore
//! use datamap::{async_trait, record, EntityKind, Entity, Repository, Validation, Validator};
//!
//! #[derive(Default)]
//! pub struct CreamValidator;
//!
//! #[async_trait]
//! impl Validator for CreamValidator {
//!     async fn validate(&self, validation: &mut Validation<'_>) {
//!         validation.require("name", "Missing name");
//!     }
//! }
//!
//! #[derive(EntityKind)]
//! #[entity(table = "creams", validator = CreamValidator)]
//! pub struct Cream;
//!
//! let creams: Repository<Cream, _> = Repository::new(db);
//! let stored = creams.create(Entity::new(record! { "name" => "Vanille", "isVegan" => true })).await?;
//! let vegan = creams.filter(&record! { "isVegan" => true }).await?;
//! ```
//!
//! The derive expands to paths under `datamap_core`, so crates using it depend on
//! `datamap_core` as well.

pub mod entity;
pub mod repository;

pub use datamap_core::{
    async_trait, obs, record, Adaptor, AlwaysValid, CaseAdaptor, Direction, EntityKind,
    IdentityAdaptor, Operation, Query, QueryBuilder, QueryOutput, Record, RepoError, RepoResult,
    Validation, Validator, Value, COUNT_COLUMN, ID_COLUMN,
};
pub use datamap_macros::EntityKind;

pub use entity::{Entity, Validity};
pub use repository::Repository;

// Optional re-export of the SQL renderer.
#[cfg(feature = "sql-builder")]
pub use datamap_sql_builder as sql_builder;

// Optional pagination: one count query plus one limited select.
#[cfg(feature = "query-ext")]
pub mod query_ext {
    use crate::{Direction, Entity, EntityKind, QueryBuilder, Record, RepoResult, Repository, ID_COLUMN};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Page<T> {
        pub items: Vec<T>,
        /// Rows matching the filter across all pages.
        pub total: i64,
    }

    #[async_trait::async_trait]
    pub trait PaginateExt<K: EntityKind> {
        /// Zero-based page `page` of `size` entities matching `attributes`, ordered by id.
        async fn paginate(
            &self,
            attributes: &Record,
            page: usize,
            size: usize,
        ) -> RepoResult<Page<Entity<K>>>;
    }

    #[async_trait::async_trait]
    impl<K, Q> PaginateExt<K> for Repository<K, Q>
    where
        K: EntityKind,
        Q: QueryBuilder,
    {
        async fn paginate(
            &self,
            attributes: &Record,
            page: usize,
            size: usize,
        ) -> RepoResult<Page<Entity<K>>> {
            let total = self.count(attributes).await?;
            if size == 0 {
                return Ok(Page {
                    items: Vec::new(),
                    total,
                });
            }
            let offset = page.saturating_mul(size);
            let items = self
                .filter_with(attributes, move |q| {
                    q.order_by(ID_COLUMN, Direction::Asc).limit(size).offset(offset)
                })
                .await?;
            Ok(Page { items, total })
        }
    }
}

// Optional batch create: sequential loop over `create`.
#[cfg(feature = "batch-ext")]
pub mod batch_ext {
    use crate::{Entity, EntityKind, QueryBuilder, RepoResult, Repository};

    #[async_trait::async_trait]
    pub trait BatchCreateExt<K: EntityKind> {
        /// Create each entity in order. Invalid ones come back unsaved; the first
        /// backend error stops the batch.
        async fn create_many(&self, entities: Vec<Entity<K>>) -> RepoResult<Vec<Entity<K>>>;
    }

    #[async_trait::async_trait]
    impl<K, Q> BatchCreateExt<K> for Repository<K, Q>
    where
        K: EntityKind,
        Q: QueryBuilder,
    {
        async fn create_many(&self, entities: Vec<Entity<K>>) -> RepoResult<Vec<Entity<K>>> {
            let mut out = Vec::with_capacity(entities.len());
            for entity in entities {
                out.push(self.create(entity).await?);
            }
            Ok(out)
        }
    }
}

// Optional streaming extension: wraps filter() into a Stream.
#[cfg(feature = "stream-ext")]
pub mod stream_ext {
    use crate::{Entity, EntityKind, QueryBuilder, Record, RepoResult, Repository};
    use futures_core::Stream;
    use std::pin::Pin;

    pub trait FilterStreamExt<K: EntityKind> {
        /// Yields the entities of `filter(attributes)` one by one. The rows are fetched
        /// in a single query when the stream is first polled.
        fn filter_stream(
            &self,
            attributes: Record,
        ) -> Pin<Box<dyn Stream<Item = RepoResult<Entity<K>>> + Send + '_>>;
    }

    impl<K, Q> FilterStreamExt<K> for Repository<K, Q>
    where
        K: EntityKind,
        Q: QueryBuilder,
    {
        fn filter_stream(
            &self,
            attributes: Record,
        ) -> Pin<Box<dyn Stream<Item = RepoResult<Entity<K>>> + Send + '_>> {
            let this = self;
            Box::pin(async_stream::try_stream! {
                let entities = this.filter(&attributes).await?;
                for entity in entities {
                    yield entity;
                }
            })
        }
    }
}

// Optional save helper: update by id when present, create otherwise.
#[cfg(feature = "upsert-ext")]
pub mod upsert_ext {
    use crate::{Entity, EntityKind, QueryBuilder, RepoResult, Repository};

    #[async_trait::async_trait]
    pub trait SaveExt<K: EntityKind> {
        async fn save(&self, entity: Entity<K>) -> RepoResult<Entity<K>>;
    }

    #[async_trait::async_trait]
    impl<K, Q> SaveExt<K> for Repository<K, Q>
    where
        K: EntityKind,
        Q: QueryBuilder,
    {
        async fn save(&self, entity: Entity<K>) -> RepoResult<Entity<K>> {
            match entity.id() {
                Some(id) => self.update(id, entity).await,
                None => self.create(entity).await,
            }
        }
    }
}

pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use datamap_libsql::LibsqlDatabase;
}
