//! # Domain Types
//!
//! Core domain types of the sale-transaction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Document     │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  number POS-001 │   │  phone (unique) │       │
//! │  │  quantity       │◄─┐│  kind, status   │──►│  total_purchases│       │
//! │  │  unit_price     │  ││  subtotal/total │   │  outstanding    │       │
//! │  └─────────────────┘  │└────────┬────────┘   └─────────────────┘       │
//! │                       │         │ owns                                  │
//! │                       │┌────────▼────────┐                              │
//! │                       └│      Item       │                              │
//! │                        │  qty × price    │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` used for relations; documents also carry a
//! human-readable business number (`POS-001`, `INV-014`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` is owned by the stock ledger: it is only ever changed by
/// reserve/restore/adjust operations and never drops below zero.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Scan key used by the item-entry lookup.
    pub barcode: Option<String>,
    /// Units on hand.
    pub quantity: i64,
    /// Selling price in cents.
    pub unit_price_cents: i64,
    /// Purchase cost in cents.
    pub buying_price_cents: i64,
    /// Alert level; read-only from the engine's perspective.
    pub low_stock_threshold: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a fresh id and timestamps.
    pub fn new(name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            barcode: None,
            quantity,
            unit_price_cents: unit_price.cents(),
            buying_price_cents: 0,
            low_stock_threshold: 10,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the purchase cost as Money.
    #[inline]
    pub fn buying_price(&self) -> Money {
        Money::from_cents(self.buying_price_cents)
    }

    /// Below this product's own alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.low_stock_threshold
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// `outstanding_balance_cents`, `total_purchases_cents` and `last_purchase`
/// are cached aggregates written only by the consistency propagator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Exactly 11 digits; correlates walk-in POS tickets with this record.
    pub phone: String,
    pub outstanding_balance_cents: i64,
    pub total_purchases_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with zeroed aggregates.
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Customer {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: None,
            phone: phone.into(),
            outstanding_balance_cents: 0,
            total_purchases_cents: 0,
            last_purchase: None,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn outstanding_balance(&self) -> Money {
        Money::from_cents(self.outstanding_balance_cents)
    }

    #[inline]
    pub fn total_purchases(&self) -> Money {
        Money::from_cents(self.total_purchases_cents)
    }
}

// =============================================================================
// Document Kind
// =============================================================================

/// The two sale document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Walk-in point-of-sale ticket; supports a discount.
    Pos,
    /// Invoice against a registered customer; no discount field.
    Invoice,
}

impl DocumentKind {
    /// Number prefix (`POS-001`, `INV-001`).
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Pos => "POS",
            DocumentKind::Invoice => "INV",
        }
    }

    /// Storage key, matching the sqlx encoding.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pos => "pos",
            DocumentKind::Invoice => "invoice",
        }
    }

    pub const fn supports_discount(&self) -> bool {
        matches!(self, DocumentKind::Pos)
    }

    /// Whether `status` is a legal label for this kind.
    pub const fn allows(&self, status: DocumentStatus) -> bool {
        match status {
            DocumentStatus::Unpaid | DocumentStatus::Paid => true,
            DocumentStatus::Overdue => matches!(self, DocumentKind::Invoice),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Payment status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Initial state; items and discount are being edited.
    Unpaid,
    /// Settled through the validated payment transition.
    Paid,
    /// Invoice-only label, set explicitly (no scheduler moves documents here).
    Overdue,
}

impl DocumentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Unpaid => "unpaid",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
        }
    }

    /// Counts towards the customer's outstanding balance.
    pub const fn is_owed(&self) -> bool {
        matches!(self, DocumentStatus::Unpaid | DocumentStatus::Overdue)
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Unpaid
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the status value posted by a status dropdown.
impl FromStr for DocumentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(DocumentStatus::Unpaid),
            "paid" => Ok(DocumentStatus::Paid),
            "overdue" => Ok(DocumentStatus::Overdue),
            _ => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: "must be one of: unpaid, paid, overdue".to_string(),
            }),
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A POS ticket or an Invoice.
///
/// ## Money fields
/// - `subtotal_cents` = Σ item amounts (always a full re-sum)
/// - `discount_cents` = 0 ≤ discount ≤ subtotal (always 0 for invoices)
/// - `total_cents`    = subtotal − discount (the invoice "amount")
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Document {
    pub id: String,
    pub kind: DocumentKind,
    /// Human-readable number, e.g. `POS-001`.
    pub number: String,
    /// Numeric part of `number`; the value the numbering counter hands out.
    pub sequence: i64,
    pub status: DocumentStatus,
    /// Registered customer (invoices).
    pub customer_id: Option<String>,
    /// Free-text name (POS) or snapshot of the customer's name (invoice).
    pub customer_name: String,
    /// Free-text phone used for correlation with `Customer.phone`.
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Document {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn is_paid(&self) -> bool {
        self.status == DocumentStatus::Paid
    }
}

// =============================================================================
// Item
// =============================================================================

/// A line on a document.
/// Uses the snapshot pattern: price and name are frozen at add time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub document_id: String,
    pub product_id: String,
    /// Insertion order within the document (1-based).
    pub position: i64,
    /// Product name at time of adding (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price, computed by the line-item store.
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Commands & Read Models
// =============================================================================

/// Who a new document is for.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CustomerRef {
    /// POS walk-in: free text, correlated to a Customer by phone.
    WalkIn {
        name: String,
        contact_number: Option<String>,
        email: Option<String>,
    },
    /// Invoice: a registered customer.
    Registered { customer_id: String },
}

/// Input for `create_document`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub customer: CustomerRef,
    /// Business date; defaults to today.
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

impl NewDocument {
    pub fn pos(name: impl Into<String>, contact_number: Option<String>) -> Self {
        NewDocument {
            kind: DocumentKind::Pos,
            customer: CustomerRef::WalkIn {
                name: name.into(),
                contact_number,
                email: None,
            },
            date: None,
            due_date: None,
        }
    }

    pub fn invoice(customer_id: impl Into<String>) -> Self {
        NewDocument {
            kind: DocumentKind::Invoice,
            customer: CustomerRef::Registered {
                customer_id: customer_id.into(),
            },
            date: None,
            due_date: None,
        }
    }
}

/// Totals read model consumed by dashboards and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub item_count: usize,
}

impl DocumentTotals {
    pub fn of(document: &Document, item_count: usize) -> Self {
        DocumentTotals {
            subtotal: document.subtotal(),
            discount: document.discount(),
            total: document.total(),
            item_count,
        }
    }
}

/// A document with its items, as shown on an edit/detail page.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentDetail {
    pub document: Document,
    pub items: Vec<Item>,
    pub totals: DocumentTotals,
    /// Mirrors the payment guard so a template can disable the button.
    pub can_make_payment: bool,
}

/// How item entry identifies a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "by", content = "value")]
pub enum ProductKey {
    Id(String),
    Barcode(String),
}

/// Answer of the price lookup used to prefill the item form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub available: i64,
}

impl From<&Product> for PriceQuote {
    fn from(product: &Product) -> Self {
        PriceQuote {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.unit_price(),
            available: product.quantity,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
