//! Query Execution Performance Benchmarks
//!
//! Measures the statement tools end to end, including conversion of every
//! row into a column-keyed JSON object:
//! - SELECT over small and large result sets
//! - Single-row INSERT through `write_query`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[cfg(feature = "sqlite")]
use schemata::{dsn, query};

#[cfg(feature = "sqlite")]
fn seeded_database(name: &str, rows: usize) -> std::path::PathBuf {
    let temp_file = std::env::temp_dir().join(name);
    let _ = std::fs::remove_file(&temp_file);

    let conn = rusqlite::Connection::open(&temp_file).expect("Failed to create database");
    conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, avatar BLOB)", [])
        .expect("Failed to create table");
    for i in 1..=rows {
        conn.execute(
            "INSERT INTO users (name, age, avatar) VALUES (?1, ?2, x'DEADBEEF')",
            rusqlite::params![format!("User {i}"), i % 100],
        )
        .expect("Failed to insert");
    }
    temp_file
}

#[cfg(feature = "sqlite")]
fn bench_sqlite_queries(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for (label, rows) in [("sqlite_read_query_100", 100), ("sqlite_read_query_10000", 10_000)] {
        let path = seeded_database(&format!("schemata_bench_{label}.db"), rows);
        let parsed = dsn::classify(&format!("sqlite3://{}", path.display())).unwrap();
        let conn = runtime.block_on(schemata::driver::connect(&parsed)).unwrap();

        c.bench_function(label, |b| {
            b.iter(|| {
                let result = runtime
                    .block_on(query::read_query(conn.as_ref(), black_box("SELECT * FROM users WHERE age > 50")))
                    .unwrap();
                assert!(!result.rows.is_empty());
                result
            });
        });

        drop(conn);
        let _ = std::fs::remove_file(&path);
    }

    let path = seeded_database("schemata_bench_write.db", 0);
    let parsed = dsn::classify(&format!("sqlite3://{}", path.display())).unwrap();
    let conn = runtime.block_on(schemata::driver::connect(&parsed)).unwrap();
    let mut counter = 0;

    c.bench_function("sqlite_write_query_insert", |b| {
        b.iter(|| {
            counter += 1;
            let sql = format!("INSERT INTO users (name, age) VALUES ('User {counter}', {})", counter % 100);
            let result = runtime.block_on(query::write_query(conn.as_ref(), black_box(&sql))).unwrap();
            assert_eq!(result.rows_affected, 1);
            result
        });
    });

    drop(conn);
    let _ = std::fs::remove_file(&path);
}

#[cfg(feature = "sqlite")]
criterion_group!(benches, bench_sqlite_queries);

#[cfg(not(feature = "sqlite"))]
criterion_group!(benches,);

criterion_main!(benches);
