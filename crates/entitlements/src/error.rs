//! Entitlement error types

use thiserror::Error;

/// Entitlement-specific errors.
/// Denials are NOT errors: a missing subscription or an exceeded limit is a
/// modeled outcome carried in `FeatureAccessResult`, never raised here.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Unknown limit dimension: {0}")]
    UnknownDimension(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for EntitlementError {
    fn from(err: sqlx::Error) -> Self {
        EntitlementError::Database(err.to_string())
    }
}

pub type EntitlementResult<T> = Result<T, EntitlementError>;
