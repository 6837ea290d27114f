//! # Error Types
//!
//! Ledger error taxonomy for recon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  recon-core errors (this file)                                         │
//! │  └── LedgerError      - Every failure a ledger operation can surface   │
//! │       ├── InvalidQuantity        (precondition, caller re-queries)     │
//! │       ├── MissingField           (precondition, caller resupplies)     │
//! │       ├── InvalidInput           (unknown enum value, bad range)       │
//! │       ├── RecordNotFound                                               │
//! │       ├── ConcurrentModification (stale snapshot, caller retries)      │
//! │       ├── StockLogFailure        (paired movement failed, rolled back) │
//! │       └── Storage                (any other persistence failure)       │
//! │                                                                         │
//! │  recon-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures → LedgerError      │
//! │                                                                         │
//! │  Flow: precondition/DbError → LedgerError → caller                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract
//! Every variant leaves the ledger in its prior, valid state. There is no
//! fatal class and nothing is retried inside the crate.

use thiserror::Error;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors returned by ledger operations and report queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Requested transfer quantity is non-positive or exceeds the source
    /// bucket's current balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Send to vendor (qty: 5)
    ///      │
    ///      ▼
    /// Check net rejected: available=4
    ///      │
    ///      ▼
    /// InvalidQuantity { field: "quantity", requested: 5, available: 4 }
    ///      │
    ///      ▼
    /// UI re-queries balances and offers at most 4
    /// ```
    #[error("Invalid {field}: requested {requested}, available {available}")]
    InvalidQuantity {
        field: String,
        requested: i64,
        available: i64,
    },

    /// A required correlating field (vendor, brand, date, approver...) was
    /// absent or blank.
    #[error("{field} is required")]
    MissingField { field: String },

    /// A value was present but not acceptable (unknown scrap reason,
    /// inverted date range, ...).
    #[error("{field} is invalid: {reason}")]
    InvalidInput { field: String, reason: String },

    /// No line item with this ID exists for the caller's tenant.
    #[error("Line item not found: {0}")]
    RecordNotFound(String),

    /// The record changed between the precondition check and the commit.
    #[error("Line item {record_id} was modified concurrently, re-fetch and retry")]
    ConcurrentModification { record_id: String },

    /// The correlated stock movement could not be appended; the whole
    /// operation was rolled back.
    #[error("Stock movement append failed: {0}")]
    StockLogFailure(String),

    /// Any other persistence failure; the operation was rolled back.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Creates a MissingField error.
    pub fn missing(field: impl Into<String>) -> Self {
        LedgerError::MissingField {
            field: field.into(),
        }
    }

    /// Creates an InvalidQuantity error.
    pub fn invalid_quantity(field: impl Into<String>, requested: i64, available: i64) -> Self {
        LedgerError::InvalidQuantity {
            field: field.into(),
            requested,
            available,
        }
    }

    /// Creates an InvalidInput error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true when the caller can fix the request and try again
    /// without re-reading anything but balances.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidQuantity { .. }
                | LedgerError::MissingField { .. }
                | LedgerError::InvalidInput { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LedgerError::invalid_quantity("quantity", 5, 4);
        assert_eq!(err.to_string(), "Invalid quantity: requested 5, available 4");

        let err = LedgerError::missing("approved_by");
        assert_eq!(err.to_string(), "approved_by is required");
    }

    #[test]
    fn test_precondition_classification() {
        assert!(LedgerError::missing("vendor_id").is_precondition());
        assert!(LedgerError::invalid_quantity("quantity", 0, 3).is_precondition());
        assert!(!LedgerError::StockLogFailure("disk full".into()).is_precondition());
        assert!(!LedgerError::ConcurrentModification {
            record_id: "li-1".into()
        }
        .is_precondition());
    }
}
