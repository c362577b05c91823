//! # Document Rules
//!
//! Pure rules for POS tickets and invoices: totals recompute, discount
//! bounds, the payment guard and status transitions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► UNPAID ──add/remove item, discount──► UNPAID               │
//! │                 │                                                       │
//! │                 │ make_payment (guarded)                                │
//! │                 ▼                                                       │
//! │               PAID ◄──── set_status(paid) runs the same guard           │
//! │                 ▲                                                       │
//! │                 │ make_payment                                          │
//! │   (invoice) OVERDUE ◄── set_status(overdue), invoices only              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches storage. The engine loads the rows inside its
//! transaction, asks these functions, and writes back what they return.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Document, DocumentKind, DocumentStatus, Item};
use crate::validation::{validate_phone, validate_price_cents, validate_quantity};

// =============================================================================
// Totals
// =============================================================================

/// The money fields of a document after a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl Totals {
    /// Full re-sum of the current item amounts.
    ///
    /// Never incremental: the result depends only on the set of amounts,
    /// so any interleaving of add/remove converges to the same subtotal.
    /// A subtotal or total that does not fit in i64 is `InvalidAmount`.
    pub fn recompute<I>(amounts: I, discount: Money) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal = checked_subtotal(amounts)?;
        let total = subtotal
            .checked_sub(discount)
            .ok_or_else(|| CoreError::invalid_amount("total overflows"))?;
        Ok(Totals {
            subtotal,
            discount,
            total,
        })
    }

    /// Recompute from loaded item rows.
    pub fn from_items(items: &[Item], discount: Money) -> CoreResult<Self> {
        Self::recompute(items.iter().map(Item::amount), discount)
    }

    /// Recompute, clamping the discount if the subtotal fell below it.
    ///
    /// Returns the totals and whether clamping happened.
    pub fn recompute_clamped<I>(amounts: I, discount: Money) -> CoreResult<(Self, bool)>
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal = checked_subtotal(amounts)?;
        if discount > subtotal {
            let clamped = Totals {
                subtotal,
                discount: subtotal,
                total: Money::zero(),
            };
            return Ok((clamped, true));
        }
        Ok((Self::recompute([subtotal], discount)?, false))
    }
}

/// Σ amounts, or `InvalidAmount` if the sum leaves the i64 range.
pub fn checked_subtotal<I>(amounts: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    Money::checked_sum(amounts).ok_or_else(|| CoreError::invalid_amount("subtotal overflows"))
}

/// Amount of a line: quantity × unit price.
pub fn line_amount(quantity: i64, unit_price: Money) -> CoreResult<Money> {
    validate_quantity(quantity)?;
    validate_price_cents(unit_price.cents())?;
    unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| CoreError::invalid_amount("line amount overflows"))
}

// =============================================================================
// Discount
// =============================================================================

/// Parses discount text from a form field.
///
/// Blank input means "no discount".
pub fn parse_discount(input: &str) -> CoreResult<Money> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Money::zero());
    }
    input
        .parse::<Money>()
        .map_err(|e| CoreError::invalid_amount(e.to_string()))
}

/// Checks a new discount against the document's current subtotal.
///
/// ```text
/// discount < 0          → InvalidAmount
/// discount > subtotal   → DiscountExceedsSubtotal
/// kind without discount → InvalidAmount
/// ```
pub fn check_discount(kind: DocumentKind, discount: Money, subtotal: Money) -> CoreResult<()> {
    if !kind.supports_discount() {
        if discount.is_zero() {
            return Ok(());
        }
        return Err(CoreError::invalid_amount("invoices have no discount field"));
    }
    if discount.is_negative() {
        return Err(CoreError::invalid_amount("discount cannot be negative"));
    }
    if discount > subtotal {
        return Err(CoreError::DiscountExceedsSubtotal { discount, subtotal });
    }
    Ok(())
}

// =============================================================================
// Payment Guard
// =============================================================================

/// Whether a "make payment" action would currently pass the pre-checks.
pub fn can_make_payment(document: &Document, item_count: usize) -> bool {
    document.status != DocumentStatus::Paid && item_count > 0 && document.total().is_positive()
}

/// The payment guard.
///
/// Checked in this order so the cheapest, most common rejections surface
/// with their specific messages:
/// 1. no items → `EmptySale`
/// 2. total ≤ 0 → `ZeroTotal`
/// 3. full document validation → `ValidationFailed`
pub fn check_payment(document: &Document, items: &[Item]) -> CoreResult<()> {
    if items.is_empty() {
        return Err(CoreError::EmptySale {
            number: document.number.clone(),
        });
    }
    if !document.total().is_positive() {
        return Err(CoreError::ZeroTotal {
            number: document.number.clone(),
        });
    }

    let messages = validate_for_payment(document, items);
    if !messages.is_empty() {
        return Err(CoreError::ValidationFailed { messages });
    }
    Ok(())
}

/// Whole-document validation run at the paid boundary.
///
/// Returns every violation found; empty means valid.
pub fn validate_for_payment(document: &Document, items: &[Item]) -> Vec<String> {
    let mut messages = Vec::new();

    if document.customer_name.trim().is_empty() {
        messages.push("customer name is required".to_string());
    }
    if let Some(phone) = document.contact_number.as_deref() {
        if let Err(e) = validate_phone(phone) {
            messages.push(e.to_string());
        }
    }

    for item in items {
        if item.quantity < 1 {
            messages.push(format!("{}: quantity must be at least 1", item.name_snapshot));
        }
        if item.unit_price_cents < 0 {
            messages.push(format!("{}: unit price cannot be negative", item.name_snapshot));
        }
        if item.unit_price().checked_multiply_quantity(item.quantity) != Some(item.amount()) {
            messages.push(format!(
                "{}: amount {} does not equal quantity × unit price",
                item.name_snapshot,
                item.amount()
            ));
        }
    }

    match checked_subtotal(items.iter().map(Item::amount)) {
        Ok(expected) if document.subtotal() != expected => {
            messages.push(format!(
                "subtotal {} does not match items {}",
                document.subtotal(),
                expected
            ));
        }
        Ok(_) => {}
        Err(e) => messages.push(e.to_string()),
    }
    if document.discount().is_negative() || document.discount() > document.subtotal() {
        messages.push(format!(
            "discount {} must be between 0 and subtotal {}",
            document.discount(),
            document.subtotal()
        ));
    }
    if !document.kind.supports_discount() && !document.discount().is_zero() {
        messages.push("invoices cannot carry a discount".to_string());
    }
    if document.subtotal().checked_sub(document.discount()) != Some(document.total()) {
        messages.push(format!(
            "total {} does not equal subtotal minus discount",
            document.total()
        ));
    }

    messages
}

// =============================================================================
// Status Transitions
// =============================================================================

/// What the engine must do to honour a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals current status; nothing to write.
    Unchanged,
    /// Plain label change.
    Relabel(DocumentStatus),
    /// Into `paid`: run the payment guard first.
    Pay,
}

/// Decides how a `set_status` request is handled.
pub fn plan_status_change(document: &Document, target: DocumentStatus) -> CoreResult<Transition> {
    if !document.kind.allows(target) {
        return Err(CoreError::InvalidStatus {
            number: document.number.clone(),
            status: document.status.to_string(),
            reason: format!("{} documents cannot be {}", document.kind, target),
        });
    }
    if document.status == target {
        return Ok(Transition::Unchanged);
    }
    if target == DocumentStatus::Paid {
        return Ok(Transition::Pay);
    }
    Ok(Transition::Relabel(target))
}

/// `make_payment` is only meaningful on something still owed.
pub fn ensure_payable(document: &Document) -> CoreResult<()> {
    if document.status == DocumentStatus::Paid {
        return Err(CoreError::InvalidStatus {
            number: document.number.clone(),
            status: document.status.to_string(),
            reason: "payment already recorded".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
