//! Shared fixtures: the built-in registry over a seeded in-memory database.

#![allow(dead_code)]

use resq::config::PaginationSettings;
use resq::engine::QueryEngine;
use resq::params::QueryParams;
use resq::schema::builtin;
use resq::store::SqliteExecutor;

pub const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        type TEXT NOT NULL
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT,
        published_at TEXT,
        writer_id INTEGER REFERENCES users(id)
    );
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY,
        content TEXT NOT NULL,
        post_id INTEGER NOT NULL REFERENCES posts(id),
        writer_id INTEGER NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

pub const SEED: &str = "
    INSERT INTO users VALUES (1, 'Alice', 'alice@example.com', 'admin');
    INSERT INTO users VALUES (2, 'Bob', 'bob@example.org', 'member');
    INSERT INTO users VALUES (3, 'Carol', 'carol@example.com', 'member');

    INSERT INTO posts VALUES (1, 'New post A', 'first', '2024-01-10 09:00:00', 1);
    INSERT INTO posts VALUES (2, 'New post B', 'second', '2024-02-15', 2);
    INSERT INTO posts VALUES (3, 'Old post', 'third', NULL, 1);
    INSERT INTO posts VALUES (4, 'Draft 100% done', NULL, NULL, 3);

    INSERT INTO comments VALUES (1, 'Nice', 1, 2, '2024-01-11', '2024-01-11');
    INSERT INTO comments VALUES (2, 'Great', 1, 3, '2024-01-12', '2024-01-13');
    INSERT INTO comments VALUES (3, 'Thanks', 2, 1, '2024-02-16', '2024-02-16');
    INSERT INTO comments VALUES (4, 'Old news', 3, 2, '2024-03-01', '2024-03-02');
";

/// In-memory database with the users / posts / comments fixture.
pub fn seeded_executor() -> SqliteExecutor {
    let executor = SqliteExecutor::open_in_memory().unwrap();
    executor.connection().execute_batch(SCHEMA).unwrap();
    executor.connection().execute_batch(SEED).unwrap();
    executor
}

pub fn engine() -> QueryEngine {
    engine_with(PaginationSettings::default())
}

pub fn engine_with(pagination: PaginationSettings) -> QueryEngine {
    QueryEngine::new(builtin::registry().unwrap(), pagination)
}

/// Build params from raw `key=value` query-string pairs.
pub fn params(pairs: &[(&str, &str)]) -> QueryParams {
    QueryParams::from_pairs(pairs.iter().copied())
}

/// Primary keys of a page's rows, in order.
pub fn ids(page: &resq::pagination::Page) -> Vec<i64> {
    page.rows
        .iter()
        .map(|row| row.id.as_i64().unwrap())
        .collect()
}
