//! # Validation Module
//!
//! Input validation for the sale engine's commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Forms/views (outside this workspace)                         │
//! │  ├── Field presence, widget types                                      │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: SaleEngine command entry                                     │
//! │  └── THIS MODULE: quantity, price, phone, names, barcodes              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Payment boundary (document::validate_for_payment)            │
//! │  └── Whole-document invariants before status = paid                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), NOT NULL                                   │
//! │  └── UNIQUE (phone, barcode, document number)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopdesk_core::validation::{validate_phone, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! validate_phone("03001234567").unwrap();
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Customer phone numbers are exactly this many digits.
pub const PHONE_DIGITS: usize = 11;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 100)
}

/// Validates a customer name (registered or walk-in).
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_required_text("customer_name", name, 100)
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Exactly 11 characters, all ASCII digits
///
/// ## Example
/// ```rust
/// use shopdesk_core::validation::validate_phone;
///
/// assert!(validate_phone("03001234567").is_ok());
/// assert!(validate_phone("0300-1234567").is_err());
/// assert!(validate_phone("0300123456").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: format!("must be exactly {} digits", PHONE_DIGITS),
        });
    }

    Ok(())
}

/// Trims an optional phone and drops it if blank; validates the rest.
pub fn normalize_contact_number(phone: Option<&str>) -> ValidationResult<Option<String>> {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            validate_phone(p)?;
            Ok(Some(p.to_string()))
        }
        None => Ok(None),
    }
}

/// Validates an email address shape.
///
/// Only the structural `local@domain.tld` check; providers are not restricted.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a barcode.
///
/// ## Rules
/// - 1 to 64 characters
/// - Letters, digits and hyphens only
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, numbers and hyphens".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must be at least 1 (no upper bound besides stock)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Document: Add Item                                                     │
/// │                                                                         │
/// │  User enters quantity: 5                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → stock ledger reserve                                    │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level for a new product.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use shopdesk_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
