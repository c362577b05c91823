//! # Error Types
//!
//! Domain-specific error types for shopdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopdesk-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations of the sale engine    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shopdesk-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SaleError        - What SaleEngine callers see (Core | Db)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SaleError → forms/views layer     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (document number, product, amounts)
//! 3. Every variant classifies into one [`ErrorKind`] for programmatic handling
//! 4. Nothing here panics; every failure is returned to the caller

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::stock::shortage_message;

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable classification of a failure.
///
/// ## Usage in the forms/views layer
/// ```text
/// InsufficientStock  → re-render item form with the message
/// InvalidDiscount    → discount field error
/// EmptySale/ZeroTotal→ disable the "make payment" button
/// Conflict           → retry the request
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InsufficientStock,
    InvalidDiscount,
    EmptySale,
    ZeroTotal,
    ValidationFailed,
    NotFound,
    Conflict,
    InvalidStatus,
    InvalidInput,
    Storage,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the sale engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown document, item, product or customer id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Requested quantity exceeds what is on hand.
    ///
    /// ## User-facing nuance
    /// Same kind for both cases, different wording:
    /// ```text
    /// available = 0  → "Stock unavailable for Milk."
    /// available = 3  → "Insufficient stock for Milk. Only 3 units available."
    /// ```
    #[error("{}", shortage_message(.product, *.available))]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Discount larger than the current subtotal.
    #[error("Discount cannot exceed subtotal (discount {discount}, subtotal {subtotal})")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    /// Discount that is negative, unparsable, or set on a document kind
    /// without a discount field. Also raised when a line amount, subtotal
    /// or total leaves the i64 range.
    #[error("Invalid discount amount: {reason}")]
    InvalidAmount { reason: String },

    /// Payment attempted on a document without items.
    #[error("Cannot make payment for an empty sale ({number}). Please add at least one item.")]
    EmptySale { number: String },

    /// Payment attempted on a document whose total is not positive.
    #[error("Cannot make payment for a sale with zero total ({number}). Please add items.")]
    ZeroTotal { number: String },

    /// Model-level invariant violations found at the paid-transition boundary.
    #[error("Cannot mark as paid: {}", .messages.join(", "))]
    ValidationFailed { messages: Vec<String> },

    /// Operation not allowed in the document's current status.
    #[error("Document {number} is {status}: {reason}")]
    InvalidStatus {
        number: String,
        status: String,
        reason: String,
    },

    /// Concurrent writers collided (e.g. a duplicate document number).
    ///
    /// Should not happen under the engine's locking discipline; when it
    /// does, nothing was written and the request can simply be retried.
    #[error("Conflicting update on {what}, please retry")]
    Conflict { what: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::DiscountExceedsSubtotal { .. } | CoreError::InvalidAmount { .. } => {
                ErrorKind::InvalidDiscount
            }
            CoreError::EmptySale { .. } => ErrorKind::EmptySale,
            CoreError::ZeroTotal { .. } => ErrorKind::ZeroTotal,
            CoreError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            CoreError::InvalidStatus { .. } => ErrorKind::InvalidStatus,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::InvalidInput,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or storage is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., phone digits, email shape, decimal text).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate phone or barcode).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A walk-in name that contradicts the registered owner of the phone.
    #[error(
        "Customer already exists with this phone number ({phone}). \
         Please use the existing customer name '{existing_name}' or choose a different phone number."
    )]
    PhoneOwnedByOther { phone: String, existing_name: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
