//! Database schema definitions and migration runner.
//!
//! Migrations are SQL strings applied in order. The SQLite `user_version`
//! pragma tracks which migrations have already been applied.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// All migrations, in order. Each entry is `(version, description, sql)`.
static MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "initial schema",
        r#"
        CREATE TABLE IF NOT EXISTS repositories (
            platform      TEXT    NOT NULL,
            path          TEXT    NOT NULL,
            remote_id     TEXT,
            selected      INTEGER NOT NULL DEFAULT 1,
            listed_at     TEXT,
            fetched_at    TEXT,
            commit_count  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (platform, path)
        );

        CREATE TABLE IF NOT EXISTS commits (
            platform      TEXT NOT NULL,
            repo_path     TEXT NOT NULL,
            commit_id     TEXT NOT NULL,
            committed_at  TEXT,
            payload       TEXT NOT NULL,
            stored_at     TEXT NOT NULL,
            PRIMARY KEY (platform, repo_path, commit_id)
        );

        CREATE INDEX IF NOT EXISTS idx_commits_committed_at ON commits (committed_at);

        CREATE TABLE IF NOT EXISTS census_runs (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at    TEXT NOT NULL,
            completed_at  TEXT,
            platforms     TEXT NOT NULL DEFAULT '',
            summary       TEXT
        );
        "#,
    ),
];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking database migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version > current_version {
            info!(version, description, "applying migration");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    detail: e.to_string(),
                })?;
            set_schema_version(conn, version)?;
            debug!(version, "migration applied");
        }
    }

    Ok(())
}

/// Read the current schema version from the SQLite `user_version` pragma.
fn get_schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}
