//! # Repository Module
//!
//! Database repository implementations for shopdesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Faces of Each Repository                         │
//! │                                                                         │
//! │  Read side (pool)                 Write side (caller's transaction)    │
//! │  ─────────────────                ──────────────────────────────────   │
//! │  db.products().lookup_price()     product::reserve(&mut tx, ..)        │
//! │  db.customers().get_by_phone()    customer::store_aggregates(..)       │
//! │  db.documents().items()           document::insert_item(..)            │
//! │                                   sequence::next_number(..)            │
//! │                                                                         │
//! │  The write side is crate-private: only SaleEngine composes it, so      │
//! │  every mutation of a document happens under its lock and inside one    │
//! │  transaction.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Products, price lookup, stock adjustments
//! - [`CustomerRepository`] - Registered customers
//! - [`DocumentRepository`] - POS tickets / invoices and their items
//! - [`sequence`] - Per-kind numbering counters

pub mod customer;
pub mod document;
pub mod product;
pub mod sequence;

pub use customer::CustomerRepository;
pub use document::DocumentRepository;
pub use product::ProductRepository;
