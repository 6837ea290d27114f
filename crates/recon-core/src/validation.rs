//! # Validation Module
//!
//! Precondition checks shared by every ledger operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / handler)                                        │
//! │  └── Immediate feedback, not trusted                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: recon-core (THIS MODULE + ledger planning)                   │
//! │  ├── Required fields        → MissingField                             │
//! │  └── Quantity vs balance    → InvalidQuantity                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on counters (Invariants R and S)                │
//! │  └── CHECK quantity > 0, unit_price > 0 on stock_movements             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use recon_core::validation::{require_text, validate_transfer_quantity};
//!
//! assert!(require_text("vendor_id", "ven-1").is_ok());
//! assert!(validate_transfer_quantity("quantity", 3, 4).is_ok());
//! assert!(validate_transfer_quantity("quantity", 5, 4).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};

/// Maximum length of free-text fields (reasons, justifications, references).
pub const MAX_TEXT_LEN: usize = 500;

/// Maximum length of a report search string.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// Field Validators
// =============================================================================

/// Requires a non-blank string and returns it trimmed.
pub fn require_text<'a>(field: &str, value: &'a str) -> LedgerResult<&'a str> {
    let value = value.trim();

    if value.is_empty() {
        return Err(LedgerError::missing(field));
    }

    if value.len() > MAX_TEXT_LEN {
        return Err(LedgerError::invalid_input(
            field,
            format!("must be at most {} characters", MAX_TEXT_LEN),
        ));
    }

    Ok(value)
}

/// Requires an optional string to be present and non-blank.
pub fn require_some_text<'a>(field: &str, value: Option<&'a str>) -> LedgerResult<&'a str> {
    match value {
        Some(v) => require_text(field, v),
        None => Err(LedgerError::missing(field)),
    }
}

/// Requires a date to be present.
pub fn require_date(field: &str, value: Option<NaiveDate>) -> LedgerResult<NaiveDate> {
    value.ok_or_else(|| LedgerError::missing(field))
}

/// Requires a value to be zero or more.
pub fn require_non_negative(field: &str, value: i64) -> LedgerResult<()> {
    if value < 0 {
        return Err(LedgerError::invalid_quantity(field, value, 0));
    }
    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a bucket-to-bucket transfer quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed the source bucket's current balance
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Rejected item: Scrap                                                   │
/// │                                                                         │
/// │  User enters quantity: 5, net rejected is 4                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_transfer_quantity("quantity", 5, 4) ← THIS FUNCTION          │
/// │       │                                                                 │
/// │       ├── qty <= 0?        → InvalidQuantity                           │
/// │       ├── qty > available? → InvalidQuantity { available: 4 }          │
/// │       └── OK → plan the transfer                                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_transfer_quantity(field: &str, requested: i64, available: i64) -> LedgerResult<()> {
    if requested <= 0 || requested > available {
        return Err(LedgerError::invalid_quantity(field, requested, available.max(0)));
    }
    Ok(())
}

/// Validates the short portion of a vendor return: `0 <= short <= received`.
pub fn validate_short_portion(short_portion: i64, received: i64) -> LedgerResult<()> {
    if short_portion < 0 || short_portion > received {
        return Err(LedgerError::invalid_quantity("short_portion", short_portion, received));
    }
    Ok(())
}

/// Validates an optional report search string and returns it trimmed.
///
/// Blank input means "no search".
pub fn validate_search(search: Option<&str>) -> LedgerResult<Option<String>> {
    let Some(raw) = search else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_SEARCH_LEN {
        return Err(LedgerError::invalid_input(
            "search",
            format!("must be at most {} characters", MAX_SEARCH_LEN),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("reason", "  broken seal ").unwrap(), "broken seal");
        assert!(matches!(
            require_text("reason", "   "),
            Err(LedgerError::MissingField { .. })
        ));
        assert!(matches!(
            require_text("reason", &"x".repeat(MAX_TEXT_LEN + 1)),
            Err(LedgerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_require_some_text() {
        assert!(require_some_text("approved_by", Some("mgr-1")).is_ok());
        assert!(matches!(
            require_some_text("approved_by", None),
            Err(LedgerError::MissingField { .. })
        ));
    }

    #[test]
    fn test_transfer_quantity_bounds() {
        assert!(validate_transfer_quantity("quantity", 1, 1).is_ok());
        assert!(validate_transfer_quantity("quantity", 0, 5).is_err());
        assert!(validate_transfer_quantity("quantity", -2, 5).is_err());

        let err = validate_transfer_quantity("quantity", 5, 4).unwrap_err();
        assert_eq!(err, LedgerError::invalid_quantity("quantity", 5, 4));
    }

    #[test]
    fn test_short_portion_bounds() {
        assert!(validate_short_portion(0, 6).is_ok());
        assert!(validate_short_portion(6, 6).is_ok());
        assert!(validate_short_portion(7, 6).is_err());
        assert!(validate_short_portion(-1, 6).is_err());
    }

    #[test]
    fn test_search_normalization() {
        assert_eq!(validate_search(None).unwrap(), None);
        assert_eq!(validate_search(Some("   ")).unwrap(), None);
        assert_eq!(validate_search(Some(" inv-1 ")).unwrap(), Some("inv-1".into()));
        assert!(validate_search(Some(&"a".repeat(101))).is_err());
    }
}
