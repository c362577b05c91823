//! # Database Handle
//!
//! Opens the SQLite file, applies migrations and hands out the sale engine
//! and repositories.
//!
//! ## Where writers wait
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine op on doc A ─┐                                                  │
//! │  engine op on doc A ─┴─► DocumentLocks["A"]  (one at a time)            │
//! │  engine op on doc B ───► DocumentLocks["B"]                             │
//! │                               │                                         │
//! │                               ▼                                         │
//! │              SqlitePool (max_connections)                               │
//! │                               │                                         │
//! │                               ▼                                         │
//! │              SQLite write lock, queued by busy_timeout                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each engine transaction writes first, so with WAL a writer never holds a
//! stale read snapshot and `busy_timeout` is enough to serialize them.
//! Plain reads (`get_document`, repository lookups) do not queue.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::engine::locks::DocumentLocks;
use crate::engine::SaleEngine;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::product::ProductRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool and connection settings.
///
/// ```rust,ignore
/// let config = StoreConfig::from_env().db_config()?.max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Upper bound on concurrent transactions (5).
    pub max_connections: u32,

    pub min_connections: u32,

    /// How long `pool.begin()` waits for a free connection (30 s).
    pub connect_timeout: Duration,

    /// How long a writer waits for SQLite's write lock (5 s). Past it the
    /// operation fails with the retryable `DbError::Busy`.
    pub busy_timeout: Duration,

    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,

    /// `None` never recycles a connection.
    pub max_lifetime: Option<Duration>,

    /// Apply embedded migrations in [`Database::new`].
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database; the file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory database for tests.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the
    /// pool is pinned to exactly one connection that is never recycled.
    /// Tests that need real connection-level concurrency use a temp file
    /// with [`DbConfig::new`] instead.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the store database.
///
/// Clones share the pool and the per-document lock table, so every
/// [`SaleEngine`] from the same `Database` serializes on the same documents.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    locks: Arc<DocumentLocks>,
}

impl Database {
    /// Connects, configures SQLite and runs migrations if enabled.
    ///
    /// Connections use WAL with NORMAL sync and foreign keys on; item rows
    /// rely on the cascade from `documents`.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            locks: Arc::new(DocumentLocks::new()),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Raw pool, for ad-hoc queries in tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Read-side document queries; all writes go through [`Self::engine`].
    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    /// ```rust,ignore
    /// let engine = db.engine();
    /// let doc = engine.create_document(NewDocument::pos("Walk-in", None)).await?;
    /// engine.add_item(&doc.id, &product.id, 2, None).await?;
    /// engine.make_payment(&doc.id).await?;
    /// ```
    pub fn engine(&self) -> SaleEngine {
        SaleEngine::new(self.pool.clone(), Arc::clone(&self.locks))
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
