//! Plan catalog handlers.

use std::collections::BTreeMap;

use axum::{extract::Path, Json};
use serde::Serialize;
use service_core::error::AppError;

use crate::models::{Limit, Plan, ResourceType, Tier};
use crate::services::catalog;

/// One catalog entry as presented to clients.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub tier: Tier,
    pub name: &'static str,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    pub limits: BTreeMap<&'static str, Limit>,
    pub features: &'static [&'static str],
    pub popular: bool,
}

#[derive(Debug, Serialize)]
pub struct ListPlansResponse {
    pub plans: Vec<PlanResponse>,
}

fn to_response(plan: &Plan) -> PlanResponse {
    let mut limits = BTreeMap::new();
    for resource in ResourceType::ALL {
        limits.insert(resource.as_str(), plan.limits.for_resource(resource));
    }
    PlanResponse {
        tier: plan.tier,
        name: plan.name,
        monthly_price_cents: plan.monthly_price_cents,
        yearly_price_cents: plan.yearly_price_cents,
        limits,
        features: plan.features,
        popular: plan.popular,
    }
}

/// List the plan catalog, ascending by price.
pub async fn list_plans() -> Json<ListPlansResponse> {
    let plans = catalog::plans().iter().map(to_response).collect();
    Json(ListPlansResponse { plans })
}

/// Get one catalog entry by tier name.
pub async fn get_plan(Path(tier): Path<String>) -> Result<Json<PlanResponse>, AppError> {
    let tier = Tier::parse(&tier)?;
    Ok(Json(to_response(catalog::get_plan(tier))))
}
