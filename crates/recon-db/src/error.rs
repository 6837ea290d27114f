//! # Database Error Types
//!
//! Error types for database operations and their mapping into ledger errors.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError (recon-core) ← What ledger callers match on               │
//! │       │                                                                 │
//! │       ├── Busy / Locked        → ConcurrentModification                │
//! │       ├── NotFound             → RecordNotFound                        │
//! │       └── everything else      → Storage                               │
//! │                                                                         │
//! │  StockLogError (stock log seam)                                        │
//! │       └── any failure          → StockLogFailure                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use recon_core::LedgerError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU code for a tenant
    /// - Re-inserting an existing ID
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Line item referencing a SKU that is not in the catalog
    /// - History row referencing a missing movement
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    ///
    /// The conservation checks on `line_items` and the positivity checks on
    /// `stock_movements` end up here.
    #[error("Check constraint violated: {message}")]
    CheckViolation { message: String },

    /// Another writer holds the database lock.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns true when the failure came from lock contention.
    pub fn is_contention(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }

    /// Converts into a ledger error for an operation on `record_id`.
    ///
    /// Lock contention means another writer got to the record first.
    pub fn into_ledger(self, record_id: &str) -> LedgerError {
        match self {
            DbError::Busy(_) => LedgerError::ConcurrentModification {
                record_id: record_id.to_string(),
            },
            DbError::NotFound { id, .. } => LedgerError::RecordNotFound(id),
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint / lock type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
                //   "database is locked" / "database table is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Read paths with no record in hand map contention to an unnamed record.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        err.into_ledger("unknown")
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Stock Log Errors
// =============================================================================

/// Failures of a [`StockMovementLog`](crate::repository::stock_movement::StockMovementLog)
/// append.
#[derive(Debug, Error)]
pub enum StockLogError {
    /// Quantity or unit price was not strictly positive.
    #[error("Invalid amount: quantity {quantity}, unit price {unit_price_cents}")]
    InvalidAmount { quantity: i64, unit_price_cents: i64 },

    /// The log itself could not be written.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl StockLogError {
    /// Converts into a ledger error for an operation on `record_id`.
    pub fn into_ledger(self, record_id: &str) -> LedgerError {
        match self {
            StockLogError::Db(db) if db.is_contention() => db.into_ledger(record_id),
            other => LedgerError::StockLogFailure(other.to_string()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
