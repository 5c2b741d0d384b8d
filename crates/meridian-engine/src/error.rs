//! # Engine Error Type
//!
//! Unified error taxonomy for engine operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Meridian POS                           │
//! │                                                                         │
//! │  Caller                      Engine                                     │
//! │  ──────                      ──────                                     │
//! │                                                                         │
//! │  add_item_by_barcode(...)                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Operation                                                       │  │
//! │  │  Result<T, EngineError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Validation?  ── ValidationError ──► InvalidInput ──────────────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database?    ── DbError::Busy ────► ConflictRetryable ─────────►│  │
//! │  │         │        DbError::NotFound ► NotFound                    │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Callers branch on category: ConflictRetryable means "retry the        │
//! │  whole operation, nothing was applied"; everything else is final.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use meridian_core::ValidationError;
use meridian_db::DbError;

/// Machine-readable error category.
///
/// Stable across releases so callers can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed validation (malformed or out of range)
    InvalidInput,

    /// A referenced entity ID is malformed or points outside the branch
    InvalidReference,

    /// Entity does not exist in the caller's branch
    NotFound,

    /// Operation not permitted in the entity's current lifecycle state
    InvalidState,

    /// Requested quantity exceeds available stock
    InsufficientStock,

    /// Unique business identifier already taken
    Duplicate,

    /// Transient contention; the operation applied nothing and is safe
    /// to retry as-is
    ConflictRetryable,

    /// Storage-level failure
    Storage,
}

/// Error returned by every engine operation.
///
/// Operations are transactional: when any variant of this error is
/// returned, NO effects of the failed operation are visible.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced identifier is malformed or crosses branch scope.
    #[error("Invalid {field} reference: {id}")]
    InvalidReference { field: String, id: String },

    /// Entity not found within the caller's branch.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The entity's lifecycle state forbids this operation
    /// (e.g. mutating a completed invoice).
    #[error("{0}")]
    InvalidState(String),

    /// Not enough stock to satisfy the request.
    #[error("Insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A unique business identifier is already taken.
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Transient write contention. Nothing was applied; retry the
    /// operation.
    #[error("Operation conflicted with a concurrent writer, retry: {0}")]
    ConflictRetryable(String),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        EngineError::InvalidState(message.into())
    }

    /// Creates an InvalidReference error.
    pub fn invalid_reference(field: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::InvalidReference {
            field: field.into(),
            id: id.into(),
        }
    }

    /// Returns the machine-readable category for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::InvalidInput(_) => ErrorCode::InvalidInput,
            EngineError::InvalidReference { .. } => ErrorCode::InvalidReference,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::InvalidState(_) => ErrorCode::InvalidState,
            EngineError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            EngineError::Duplicate { .. } => ErrorCode::Duplicate,
            EngineError::ConflictRetryable(_) => ErrorCode::ConflictRetryable,
            EngineError::Storage(_) => ErrorCode::Storage,
        }
    }

    /// Whether the failed operation can be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConflictRetryable(_))
    }
}

/// Converts validation errors to engine errors.
impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },

            DbError::UniqueViolation { field, value } => EngineError::Duplicate { field, value },

            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                EngineError::InvalidReference {
                    field: "reference".to_string(),
                    id: message,
                }
            }

            // The stock floor is normally enforced by the guarded UPDATE
            // before the CHECK can fire; if it fires anyway, the write
            // was rolled back and the state is consistent.
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                EngineError::InvalidState(message)
            }

            DbError::Busy(msg) => EngineError::ConflictRetryable(msg),
            DbError::PoolExhausted => {
                EngineError::ConflictRetryable("connection pool exhausted".to_string())
            }

            DbError::ConnectionFailed(e)
            | DbError::MigrationFailed(e)
            | DbError::QueryFailed(e)
            | DbError::Internal(e) => {
                tracing::error!("Database error: {}", e);
                EngineError::Storage(e)
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
