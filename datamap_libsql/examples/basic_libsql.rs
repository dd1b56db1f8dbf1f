// Enable with: cargo run -p datamap_libsql --features libsql-backend --example basic

#[cfg(feature = "libsql-backend")]
#[tokio::main]
async fn main() -> Result<(), datamap_core::RepoError> {
    use datamap::{record, Entity, Repository};
    use datamap_core::RepoError;
    use datamap_libsql::LibsqlDatabase;
    use std::sync::Arc;
    use tests_common::{migrations, Cream, CreamExt};

    // One shared connection: every new connection to :memory: is a new database.
    #[allow(deprecated)]
    let db = libsql::Database::open(":memory:").map_err(RepoError::backend)?;
    let conn = db.connect().map_err(RepoError::backend)?;
    conn.execute(migrations::LIBSQL_CREAMS_SQL, ())
        .await
        .map_err(RepoError::backend)?;
    let creams: Repository<Cream, _> = Repository::new(LibsqlDatabase::from_conn(Arc::new(db), conn));

    let rejected = creams.create(Entity::new(record! { "isVegan" => true })).await?;
    println!("rejected: {:?}", rejected.errors());

    let stored = creams
        .create(Entity::new(record! { "name" => "Erdbeere", "isVegan" => true }))
        .await?;
    println!(
        "stored cream {:?}, vegetarian: {}",
        stored.id(),
        stored.is_vegetarian()
    );
    Ok(())
}

#[cfg(not(feature = "libsql-backend"))]
fn main() {
    eprintln!("Enable feature libsql-backend to run this example");
}
