#![allow(unused_imports, dead_code)]

use datamap::{record, Entity, RepoResult, Repository, Value};
use tests_common::{memory_creams, Cream, MemoryDatabase};

fn repo() -> (MemoryDatabase, Repository<Cream, MemoryDatabase>) {
    let db = memory_creams();
    (db.clone(), Repository::new(db))
}

#[cfg(feature = "query-ext")]
#[tokio::test]
async fn paginate_pages_by_id_with_total() -> RepoResult<()> {
    use datamap::query_ext::PaginateExt;

    let (db, creams) = repo();
    for name in ["Kirsche", "Zitrone", "Vanille", "Mango", "Sahne"] {
        db.seed("creams", record! { "name" => name, "is_vegan" => name != "Sahne" })?;
    }

    let vegan = record! { "isVegan" => true };
    let first = creams.paginate(&vegan, 0, 3).await?;
    assert_eq!(first.total, 4);
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.items[0].get("name"), Some(&Value::from("Kirsche")));

    let second = creams.paginate(&vegan, 1, 3).await?;
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].get("name"), Some(&Value::from("Mango")));

    let beyond = creams.paginate(&vegan, 5, 3).await?;
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 4);

    let empty = creams.paginate(&vegan, 0, 0).await?;
    assert!(empty.items.is_empty());
    Ok(())
}

#[cfg(feature = "batch-ext")]
#[tokio::test]
async fn create_many_keeps_order_and_skips_invalid() -> RepoResult<()> {
    use datamap::batch_ext::BatchCreateExt;

    let (db, creams) = repo();
    let out = creams
        .create_many(vec![
            Entity::new(record! { "name" => "Kirsche" }),
            Entity::new(record! {}),
            Entity::new(record! { "name" => "Zitrone" }),
        ])
        .await?;
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].id(), Some(1));
    assert_eq!(out[1].is_valid(), Some(false));
    assert_eq!(out[2].id(), Some(2));
    assert_eq!(db.rows("creams")?.len(), 2);
    Ok(())
}

#[cfg(feature = "stream-ext")]
#[tokio::test]
async fn filter_stream_yields_each_match() -> RepoResult<()> {
    use datamap::stream_ext::FilterStreamExt;
    use futures::StreamExt;

    let (db, creams) = repo();
    db.seed("creams", record! { "name" => "Kirsche", "is_vegan" => true })?;
    db.seed("creams", record! { "name" => "Sahne", "is_vegan" => false })?;
    db.seed("creams", record! { "name" => "Zitrone", "is_vegan" => true })?;

    let items: Vec<_> = creams
        .filter_stream(record! { "isVegan" => true })
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|r| r.is_ok()));
    Ok(())
}

#[cfg(feature = "upsert-ext")]
#[tokio::test]
async fn save_creates_then_updates() -> RepoResult<()> {
    use datamap::upsert_ext::SaveExt;

    let (db, creams) = repo();
    let saved = creams.save(Entity::new(record! { "name" => "Kirsche" })).await?;
    let id = saved.id().expect("id");

    let renamed = creams
        .save(Entity::new(record! { "id" => id, "name" => "Zitrone" }))
        .await?;
    assert_eq!(renamed.id(), Some(id));
    assert_eq!(renamed.get("name"), Some(&Value::from("Zitrone")));
    assert_eq!(db.rows("creams")?.len(), 1);
    Ok(())
}
