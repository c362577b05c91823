//! # shopdesk-core: Pure Business Logic for the Sale Engine
//!
//! This crate holds the rules of POS tickets and invoices as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        shopdesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Forms / views (external)                        │   │
//! │  │    item form ──► discount form ──► make payment ──► status      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           shopdesk-db: SaleEngine (locks + transactions)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopdesk-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐ │   │
//! │  │   │  types  │ │  money  │ │ document │ │  stock  │ │numbering│ │   │
//! │  │   │Document │ │  Money  │ │ Totals   │ │shortage │ │ POS-001 │ │   │
//! │  │   │ Product │ │ parsing │ │ guards   │ │ checks  │ │ INV-001 │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Document, Item)
//! - [`money`] - Money type with integer arithmetic
//! - [`document`] - Totals recompute, discount bounds, payment guard
//! - [`stock`] - Availability checks and shortage wording
//! - [`numbering`] - `POS-001` / `INV-001` formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use shopdesk_core::document::{check_discount, Totals};
//! use shopdesk_core::{DocumentKind, Money};
//!
//! let totals = Totals::recompute(
//!     [Money::from_cents(2000), Money::from_cents(1000)],
//!     Money::from_cents(300),
//! )
//! .unwrap();
//! assert_eq!(totals.total.cents(), 2700);
//!
//! // A discount above the subtotal is rejected.
//! assert!(check_discount(DocumentKind::Pos, Money::from_cents(3500), totals.subtotal).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod money;
pub mod numbering;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use numbering::DocumentNumber;
pub use types::*;
