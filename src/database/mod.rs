// Copyright 2023 Remi Bernotavicius

use crate::error::{Error, Result};
use diesel::prelude::Connection as _;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Most ids bound into a single `IN (...)` list. SQLite refuses statements with more than 32766
/// parameters.
pub const MAX_BOUND_IDS: usize = 10_000;

diesel::expression::functions::define_sql_function! {
    /// Lower case with full Unicode folding. SQLite's own `lower` and `LIKE` only fold ASCII.
    fn unicode_lower(text: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Opens (or creates) the database at `path` and brings its schema up to date. `":memory:"` gives
/// a private in-memory database.
pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let url = path
        .to_str()
        .ok_or_else(|| Error::Migration(format!("database path {path:?} is not valid UTF-8")))?;
    let mut connection = Connection::establish(url)?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;
    unicode_lower_utils::register_impl(&mut connection, |text: String| text.to_lowercase())?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    log::debug!("opened database at {url}");
    Ok(connection)
}

#[cfg(test)]
pub fn test_connection() -> Connection {
    establish_connection(":memory:").unwrap()
}

#[test]
fn migrations() {
    let mut conn = Connection::establish(":memory:").unwrap();

    conn.run_pending_migrations(MIGRATIONS).unwrap();
    conn.revert_all_migrations(MIGRATIONS).unwrap();
    assert!(conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}

#[test]
fn unicode_lower_folds_non_ascii() {
    let mut conn = test_connection();
    let lowered: String = diesel::select(unicode_lower("CRÈME-BRÛLÉE"))
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(lowered, "crème-brûlée");
}
