//! `SQLite` storage handle and schema migrations.
//!
//! # Design
//! `Database` wraps an `r2d2` pool and is the only way to reach storage. It is
//! built once at startup and handed to the store through axum state, so there
//! is no process-global connection. Schema changes happen only through
//! [`Database::migrate`], which the `migrate` subcommand runs; `serve` merely
//! checks that the schema is current.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Connection pool settings.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "todos table",
    sql: r"
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL CHECK (length(trim(text)) > 0 AND length(text) <= 500),
    deadline TEXT,
    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at DESC);
",
}];

/// Shared handle to the todo database.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open a file-backed pool. The schema is not touched.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build(manager)?;
        debug!(path = %path.display(), pool_size = config.pool_size, "database pool opened");
        Ok(Self { pool })
    }

    /// Open a migrated in-memory database.
    ///
    /// Every `SQLite` memory connection is its own database, so the pool holds
    /// exactly one connection and never recycles it.
    pub fn in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: ConnectionConfig::default().busy_timeout_ms,
            }))
            .build(SqliteConnectionManager::memory())?;
        let db = Self { pool };
        db.migrate()?;
        Ok(db)
    }

    /// Run `f` with a pooled connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Apply every pending migration. Returns how many were applied.
    pub fn migrate(&self) -> Result<u32> {
        self.with_conn(run_migrations)
    }

    /// Drop all tables and migrate from scratch.
    pub fn reset(&self) -> Result<u32> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "DROP TABLE IF EXISTS todos;\
                 DROP TABLE IF EXISTS schema_version;",
            )
            .map_err(|e| StoreError::Migration {
                message: format!("failed to drop tables: {e}"),
            })?;
            info!("dropped all tables");
            run_migrations(conn)
        })
    }

    /// Fail unless the schema is at the version this build expects.
    pub fn ensure_schema_current(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tracked: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master
                                WHERE type = 'table' AND name = 'schema_version')",
                [],
                |row| row.get(0),
            )?;
            let found = if tracked { current_version(conn)? } else { 0 };
            let expected = latest_version();
            if found == expected {
                Ok(())
            } else {
                Err(StoreError::SchemaOutOfDate { found, expected })
            }
        })
    }
}

/// Highest migration version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn run_migrations(conn: &Connection) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(version = migration.version, "migration already applied, skipping");
            continue;
        }
        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        apply_migration(conn, migration)?;
        applied += 1;
    }

    Ok(applied)
}

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })
}

fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to read schema_version: {e}"),
    })
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let failed = |e: rusqlite::Error| StoreError::Migration {
        message: format!("v{:03} ({}): {e}", migration.version, migration.description),
    };

    let tx = conn.unchecked_transaction().map_err(failed)?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            chrono::Utc::now().to_rfc3339(),
            migration.description
        ],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)
}
