//! Usage and entitlement handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{EntitlementResult, RecordResult, ResourceType, UsageOverview};
use crate::startup::AppState;

/// Current-period usage across all resource types.
pub async fn get_usage(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<UsageOverview>, AppError> {
    let overview = state.meter.usage_overview(account_id).await?;
    Ok(Json(overview))
}

/// Advisory entitlement check for one resource type.
pub async fn check_entitlement(
    State(state): State<AppState>,
    Path((account_id, resource_type)): Path<(Uuid, String)>,
) -> Result<Json<EntitlementResult>, AppError> {
    let resource = ResourceType::parse(&resource_type)?;
    let result = state.meter.check(account_id, resource).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordUsageRequest {
    pub resource_type: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Record usage after the gated action succeeded. The check-and-append is
/// atomic in the store; on denial nothing is persisted.
pub async fn record_usage(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<RecordUsageRequest>,
) -> Result<Json<RecordResult>, AppError> {
    payload.validate()?;
    let resource = ResourceType::parse(&payload.resource_type)?;

    let result = state
        .meter
        .record(account_id, resource, payload.quantity)
        .await?;
    Ok(Json(result))
}
