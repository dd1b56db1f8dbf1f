//! Common integration testing utilities and generic tests reusable across backends.

use std::sync::Arc;

use async_trait::async_trait;
use datamap::{record, Entity, EntityKind, QueryBuilder, RepoError, RepoResult, Repository, Validation, Validator, Value};

pub mod memory;

pub use memory::{MemoryDatabase, MemoryError};

/// Rejects creams without a name.
#[derive(Debug, Default)]
pub struct CreamValidator;

#[async_trait]
impl Validator for CreamValidator {
    async fn validate(&self, validation: &mut Validation<'_>) {
        validation.require("name", "Missing name");
    }
}

#[derive(EntityKind)]
#[entity(table = "creams", validator = CreamValidator)] // consistent across backends
pub struct Cream;

/// Custom getter on cream entities.
pub trait CreamExt {
    fn is_vegetarian(&self) -> bool;
}

impl CreamExt for Entity<Cream> {
    fn is_vegetarian(&self) -> bool {
        self.get("isVegan").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Custom finder on cream repositories.
#[async_trait]
pub trait CreamFinders {
    async fn all_vegan(&self) -> RepoResult<Vec<Entity<Cream>>>;
}

#[async_trait]
impl<Q: QueryBuilder> CreamFinders for Repository<Cream, Q> {
    async fn all_vegan(&self) -> RepoResult<Vec<Entity<Cream>>> {
        self.filter(&record! { "isVegan" => true }).await
    }
}

/// Expose migration SQL via constants for harnesses.
pub mod migrations {
    pub const LIBSQL_CREAMS_SQL: &str = include_str!("../migrations/libsql/001_creams.sql");
}

/// An empty in-memory database with the `creams` table.
pub fn memory_creams() -> MemoryDatabase {
    MemoryDatabase::new().with_table("creams", &["name", "is_vegan"])
}

#[async_trait]
pub trait DatabaseFactory {
    /// Construct a query builder connected to a clean DB with the `creams` schema.
    async fn new_cream_db(&self) -> RepoResult<Arc<dyn QueryBuilder>>;
}

async fn cream_repo<F: DatabaseFactory + Sync>(
    f: &F,
) -> RepoResult<Repository<Cream, Arc<dyn QueryBuilder>>> {
    Ok(Repository::new(f.new_cream_db().await?))
}

fn cream(name: &str, vegan: bool) -> Entity<Cream> {
    Entity::new(record! { "name" => name, "isVegan" => vegan })
}

/// Generic CRUD roundtrip test.
pub async fn test_crud_roundtrip<F: DatabaseFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = cream_repo(f).await?;

    let created = repo.create(cream("Erdbeere", true)).await?;
    let id = created.id().expect("created cream has an id");
    assert!(id > 0);
    assert_eq!(created.is_valid(), Some(true));
    assert_eq!(created.get("name"), Some(&Value::from("Erdbeere")));
    assert!(created.is_vegetarian());

    let fetched = repo.find(id).await?;
    assert_eq!(fetched.id(), Some(id));

    let updated = repo.update(id, cream("Schokolade", false)).await?;
    assert_eq!(updated.id(), Some(id));
    assert_eq!(updated.get("name"), Some(&Value::from("Schokolade")));
    assert_eq!(updated.is_valid(), Some(true));
    assert!(!repo.find(id).await?.is_vegetarian());

    assert_eq!(repo.delete(id).await?, 1);
    assert_eq!(repo.delete(id).await?, 0);
    assert!(matches!(repo.find(id).await, Err(RepoError::NotFound)));
    Ok(())
}

/// Invalid entities are returned with their errors and never written.
pub async fn test_invalid_writes<F: DatabaseFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = cream_repo(f).await?;

    let rejected = repo.create(Entity::new(record! { "isVegan" => true })).await?;
    assert_eq!(rejected.is_valid(), Some(false));
    assert_eq!(rejected.errors(), &["Missing name".to_string()]);
    assert_eq!(rejected.id(), None);
    assert_eq!(repo.count(&record! {}).await?, 0);

    let stored = repo.create(cream("Erdbeere", false)).await?;
    let id = stored.id().expect("created cream has an id");
    let rejected = repo.update(id, Entity::new(record! {})).await?;
    assert_eq!(rejected.is_valid(), Some(false));
    let unchanged = repo.find(id).await?;
    assert_eq!(unchanged.get("name"), Some(&Value::from("Erdbeere")));
    Ok(())
}

/// Filters, counts and custom finders by camelCase attributes.
pub async fn test_filter_by_attributes<F: DatabaseFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = cream_repo(f).await?;
    repo.create(cream("Schokolade", true)).await?;
    repo.create(cream("Vanille", true)).await?;
    repo.create(cream("Himbeere", false)).await?;

    let vegan = repo
        .filter_with(&record! { "isVegan" => true }, |q| {
            q.order_by("name", datamap::Direction::Desc)
        })
        .await?;
    let names: Vec<_> = vegan.iter().filter_map(|c| c.get("name")).collect();
    assert_eq!(names, vec![&Value::from("Vanille"), &Value::from("Schokolade")]);

    assert_eq!(repo.count(&record! { "isVegan" => true }).await?, 2);
    assert_eq!(repo.count(&record! { "name" => "Erdbeere" }).await?, 0);
    assert_eq!(repo.all_vegan().await?.len(), 2);

    let first = repo.find_where(&record! { "name" => "Himbeere" }).await?;
    assert_eq!(first.and_then(|c| c.is_valid()), Some(true));
    assert!(repo.find_where(&record! { "name" => "Erdbeere" }).await?.is_none());
    assert_eq!(repo.all().await?.len(), 3);
    Ok(())
}
