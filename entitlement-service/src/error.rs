//! Domain error taxonomy for the metering core.

use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the metering core.
///
/// Limit exhaustion is deliberately absent: a denied record attempt is a
/// normal outcome reported through `RecordResult`, not an error.
#[derive(Debug, Error)]
pub enum MeteringError {
    #[error("unknown tier: {0}")]
    UnknownTier(String),

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("billing period conflict for account {account_id}: {detail}")]
    PeriodStateConflict { account_id: Uuid, detail: String },
}

impl From<MeteringError> for AppError {
    fn from(err: MeteringError) -> Self {
        use MeteringError::*;
        match err {
            e @ (UnknownTier(_) | UnknownResourceType(_)) => {
                AppError::BadRequest(anyhow::Error::new(e))
            }
            e @ AccountNotFound(_) => AppError::NotFound(anyhow::Error::new(e)),
            e @ PeriodStateConflict { .. } => AppError::Conflict(anyhow::Error::new(e)),
        }
    }
}
