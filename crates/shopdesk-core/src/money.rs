//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Document totals are re-summed from line amounts on every change.       │
//! │  With floats:  0.1 + 0.2 = 0.30000000000000004                          │
//! │  Re-summing would drift and the "subtotal == Σ amount" check fails.     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    amount = quantity × unit_price_cents   (exact)                       │
//! │    subtotal = Σ amount                    (exact, order independent)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopdesk_core::money::Money;
//!
//! let price = Money::from_cents(1000); // 10.00
//! let line = price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line.cents(), 2000);
//!
//! // Arithmetic is checked; overflow is `None`, never a panic.
//! assert!(Money::from_cents(i64::MAX).checked_add(line).is_none());
//!
//! // Form input arrives as text
//! let discount: Money = "3.00".parse().unwrap();
//! assert_eq!(discount.cents(), 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: `subtotal - discount` is representable; the document
///   guards keep stored totals non-negative
/// - **Checked arithmetic only**: no operator impls, every sum or product
///   goes through a `checked_*` method and overflow surfaces as `None`
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// Product.unit_price ──► Item.unit_price (snapshot) ──► Item.amount
///                                                           │
///                          Document.subtotal = Σ amount ◄───┘
///                                 │
///                                 ▼
///                   Document.total = subtotal - discount
///                                 │
///                                 ▼
///             Customer.total_purchases / outstanding_balance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use shopdesk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Sums amounts, returning `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use shopdesk_core::money::Money;
    ///
    /// let amounts = [Money::from_cents(200), Money::from_cents(50)];
    /// assert_eq!(Money::checked_sum(amounts), Some(Money::from_cents(250)));
    /// ```
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses decimal text such as `"12"`, `"12.5"` or `"12.50"`.
///
/// ## Rules
/// - Optional leading `-`
/// - At most two fractional digits (no silent rounding)
/// - Anything else is `ValidationError::InvalidFormat`
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must be a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("too large"))?
        };
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("must be a number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("must be a number"))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`"12.50"`); the currency symbol is a
/// presentation concern handled by `StoreConfig::format_currency`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_decimal_text() {
        assert_eq!("3".parse::<Money>().unwrap().cents(), 300);
        assert_eq!("3.5".parse::<Money>().unwrap().cents(), 350);
        assert_eq!("12.00".parse::<Money>().unwrap().cents(), 1200);
        assert_eq!(" 0.07 ".parse::<Money>().unwrap().cents(), 7);
        assert_eq!(".25".parse::<Money>().unwrap().cents(), 25);
        assert_eq!("-1.25".parse::<Money>().unwrap().cents(), -125);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("1,00".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(300);

        assert_eq!(a.checked_add(b), Some(Money::from_cents(1300)));
        assert_eq!(a.checked_sub(b), Some(Money::from_cents(700)));
        assert_eq!(a.checked_multiply_quantity(3), Some(Money::from_cents(3000)));
    }

    #[test]
    fn test_checked_add_and_sub_overflow() {
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_none());
        assert!(Money::zero().checked_sub(Money::from_cents(i64::MIN)).is_none());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_none());
    }

    #[test]
    fn test_sum_is_order_independent() {
        let amounts = [Money::from_cents(2000), Money::from_cents(150), Money::from_cents(999)];
        let forward = Money::checked_sum(amounts);
        let backward = Money::checked_sum(amounts.iter().rev().copied());
        assert_eq!(forward, backward);
        assert_eq!(forward, Some(Money::from_cents(3149)));
    }

    #[test]
    fn test_sum_overflow_is_none() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert!(Money::checked_sum([half, half]).is_none());
        assert_eq!(Money::checked_sum(std::iter::empty()), Some(Money::zero()));
    }

    #[test]
    fn test_checked_multiply_overflow() {
        assert!(Money::from_cents(i64::MAX).checked_multiply_quantity(2).is_none());
        assert_eq!(
            Money::from_cents(250).checked_multiply_quantity(4),
            Some(Money::from_cents(1000))
        );
    }
}
