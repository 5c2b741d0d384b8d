//! # Request Context
//!
//! Explicit caller identity for every engine operation.
//!
//! ## Why Explicit?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every operation is parameterized by WHO is calling:                    │
//! │                                                                         │
//! │    RequestContext { branch_id, user_id }                                │
//! │                                                                         │
//! │  branch_id scopes every read and write. Two branches can hold the      │
//! │  same barcode; an invoice from branch A is invisible to branch B.      │
//! │  There is no ambient "current branch" global - the scope travels       │
//! │  with the call, which also makes concurrent multi-branch tests         │
//! │  trivial to write.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Identity of the caller: which branch the operation is scoped to and
/// which user performs it (recorded on created entities).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Branch every lookup and write is scoped to.
    pub branch_id: String,

    /// Acting user, stamped onto created products and invoices.
    pub user_id: String,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(branch_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        RequestContext {
            branch_id: branch_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Rejects contexts with empty identity fields before any I/O.
    pub fn validate(&self) -> EngineResult<()> {
        if self.branch_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "branch_id is required".to_string(),
            ));
        }
        if self.user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("user_id is required".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
