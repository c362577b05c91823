//! # Document Numbering
//!
//! Business numbers are `{PREFIX}-{sequence}` with the sequence zero-padded
//! to at least three digits:
//!
//! ```text
//! POS-001, POS-002, ... POS-999, POS-1000
//! INV-001, INV-002, ...
//! ```
//!
//! The numeric `sequence` is the source of truth. Ordering and "next value"
//! are always derived from it, never from the formatted string, so
//! `POS-1000` correctly follows `POS-999`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::DocumentKind;

/// Minimum width of the numeric part.
pub const SEQUENCE_WIDTH: usize = 3;

/// A parsed document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentNumber {
    pub kind: DocumentKind,
    pub sequence: i64,
}

impl DocumentNumber {
    pub fn new(kind: DocumentKind, sequence: i64) -> Self {
        DocumentNumber { kind, sequence }
    }

    /// The number that follows this one.
    pub fn next(&self) -> Self {
        DocumentNumber {
            kind: self.kind,
            sequence: self.sequence + 1,
        }
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:0width$}",
            self.kind.prefix(),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for DocumentNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "number".to_string(),
            reason: format!("'{}' is not of the form POS-001 or INV-001", s),
        };

        let (prefix, digits) = s.split_once('-').ok_or_else(invalid)?;
        let kind = match prefix {
            "POS" => DocumentKind::Pos,
            "INV" => DocumentKind::Invoice,
            _ => return Err(invalid()),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let sequence: i64 = digits.parse().map_err(|_| invalid())?;
        if sequence < 1 {
            return Err(invalid());
        }

        Ok(DocumentNumber { kind, sequence })
    }
}

/// Formats the number for `sequence` of `kind`.
pub fn format_number(kind: DocumentKind, sequence: i64) -> String {
    DocumentNumber::new(kind, sequence).to_string()
}
