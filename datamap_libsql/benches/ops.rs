// Criterion benches for basic repository operations using libsql (SQLite) in-memory.
// Run locally with:
//   cargo bench -p datamap_libsql --features libsql-backend --bench ops

#[cfg(feature = "libsql-backend")]
mod bench_impl {
    use criterion::{black_box, BatchSize, Criterion};
    use datamap::{record, Entity, Repository};
    use datamap_libsql::LibsqlDatabase;
    use std::sync::Arc;
    use tests_common::{migrations, Cream};

    fn setup_repo(rt: &tokio::runtime::Runtime) -> Repository<Cream, LibsqlDatabase> {
        #[allow(deprecated)]
        let db = libsql::Database::open(":memory:").expect("open db");
        let conn = db.connect().expect("connect");
        rt.block_on(async {
            conn.execute(migrations::LIBSQL_CREAMS_SQL, ())
                .await
                .expect("apply schema");
        });
        Repository::new(LibsqlDatabase::from_conn(Arc::new(db), conn))
    }

    fn cream() -> Entity<Cream> {
        Entity::new(record! { "name" => "Vanille", "isVegan" => true })
    }

    pub fn bench_create(c: &mut Criterion) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let mut group = c.benchmark_group("libsql_create");
        group.bench_function("create_valid", |b| {
            b.iter_batched(
                || setup_repo(&rt),
                |repo| {
                    let created = rt.block_on(repo.create(cream())).expect("create");
                    black_box(created);
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function("create_invalid", |b| {
            let repo = setup_repo(&rt);
            b.iter(|| {
                let rejected = rt
                    .block_on(repo.create(Entity::new(record! {})))
                    .expect("create");
                black_box(rejected);
            })
        });
        group.finish();
    }

    pub fn bench_find_filter_delete(c: &mut Criterion) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let mut group = c.benchmark_group("libsql_find_filter_delete");

        let repo = setup_repo(&rt);
        let id = rt
            .block_on(repo.create(cream()))
            .expect("seed")
            .id()
            .expect("id");
        group.bench_function("find", |b| {
            b.iter(|| black_box(rt.block_on(repo.find(id)).expect("find")))
        });
        group.bench_function("filter_camel_case", |b| {
            let attrs = record! { "isVegan" => true };
            b.iter(|| black_box(rt.block_on(repo.filter(&attrs)).expect("filter")))
        });

        group.bench_function("create_and_delete", |b| {
            b.iter(|| {
                let created = rt.block_on(repo.create(cream())).expect("create");
                let id = created.id().expect("id");
                black_box(rt.block_on(repo.delete(id)).expect("delete"));
            })
        });

        group.finish();
    }
}

// Define the Criterion entry points at the crate root so `main` exists at crate level.
#[cfg(feature = "libsql-backend")]
use bench_impl::{bench_create, bench_find_filter_delete};
#[cfg(feature = "libsql-backend")]
criterion::criterion_group!(benches, bench_create, bench_find_filter_delete);
#[cfg(feature = "libsql-backend")]
criterion::criterion_main!(benches);

// Fallback when feature is not enabled: provide a dummy main so the bench binary compiles.
#[cfg(not(feature = "libsql-backend"))]
fn main() {
    eprintln!("Enable feature libsql-backend to run benches.");
}
