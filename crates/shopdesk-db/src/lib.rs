//! # shopdesk-db: Database Layer and Sale Engine
//!
//! SQLite storage for products, customers and sale documents, plus the
//! [`SaleEngine`] that owns every transaction boundary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        shopdesk Data Flow                               │
//! │                                                                         │
//! │  Forms / views (add item, discount, make payment)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopdesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  SaleEngine   │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine/)    │───►│ product       │    │  (embedded)  │  │   │
//! │  │   │ locks         │    │ customer      │    │ 001_initial  │  │   │
//! │  │   │ propagator    │    │ document      │    │              │  │   │
//! │  │   │               │    │ sequence      │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ pure rules                                          │   │
//! │  │           ▼                                                     │   │
//! │  │      shopdesk-core                                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the engine-level `SaleError`
//! - [`repository`] - Repository implementations
//! - [`engine`] - The sale-transaction engine
//! - [`config`] - Environment-driven store settings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopdesk_db::{Database, DbConfig};
//! use shopdesk_core::NewDocument;
//!
//! let db = Database::new(DbConfig::new("shopdesk.db")).await?;
//! let engine = db.engine();
//!
//! let ticket = engine.create_document(NewDocument::pos("Walk-in", None)).await?;
//! engine.add_item(&ticket.id, &product_id, 2, None).await?;
//! engine.update_discount_text(&ticket.id, "3.00").await?;
//! engine.make_payment(&ticket.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::StoreConfig;
pub use engine::SaleEngine;
pub use error::{DbError, DbResult, SaleError, SaleResult};
pub use pool::{Database, DbConfig};

pub use repository::{CustomerRepository, DocumentRepository, ProductRepository};
