use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::DbError;

/// Why a delegator may not hand over a scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{delegator}' does not hold '{action}' on '{resource}'")]
    PermissionNotHeld {
        delegator: String,
        resource: String,
        action: String,
    },
}

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("Delegation validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Delegating from '{delegator}' to '{delegate}' would create a cycle")]
    CycleDetected { delegator: String, delegate: String },

    #[error("Delegation chain is longer than {max_depth} hops")]
    ChainTooDeep { max_depth: usize },

    #[error("Expiry {0} is not in the future")]
    InvalidExpiry(DateTime<Utc>),

    #[error("Invalid delegation request: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl DelegationError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation",
            Self::CycleDetected { .. } => "cycle",
            Self::ChainTooDeep { .. } => "chain_too_deep",
            Self::InvalidExpiry(_) => "invalid_expiry",
            Self::InvalidInput(_) => "invalid_input",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<validator::ValidationErrors> for DelegationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidInput(errors.to_string())
    }
}
