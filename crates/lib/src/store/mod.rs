//! # SQLite Store
//!
//! A thin wrapper over a Turso SQLite database. It owns schema
//! initialization (including seeding the fixed platform rows) and hands out
//! connections to the persistence services. Cloning shares the same
//! underlying database.

use crate::errors::StoreError;
use crate::platform::Platform;
use std::fmt::{self, Debug};
use tracing::info;
use turso::{params, Database};

mod sql;

pub use sql::ALL_TABLE_CREATION_SQL;

/// The relational store behind the save pipeline.
#[derive(Clone)]
pub struct SqliteStore {
    /// The Turso database instance. Cloneable and thread-safe.
    pub db: Database,
}

impl SqliteStore {
    /// Creates a store from a file path, or an isolated in-memory database
    /// for ":memory:". Share an in-memory store across services by cloning.
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // WAL improves concurrency for file-backed databases and is a
        // harmless no-op in memory.
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Ensures all tables exist and the platform rows are seeded.
    /// Idempotent; safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ())
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        }

        for platform in Platform::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO platforms (name, display_name, icon) VALUES (?, ?, ?)",
                params![platform.as_str(), platform.display_name(), platform.icon()],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        }

        info!("Store schema initialized.");
        Ok(())
    }

    /// A helper for tests to pre-populate data with raw SQL statements.
    pub async fn execute_batch(&self, init_sql: &str) -> Result<(), StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteStore {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}
