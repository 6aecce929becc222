//! Usage consumption endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dealcrm_entitlements::{AccessEvaluator, TenantSubscription};
use dealcrm_shared::LimitDimension;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IncrementRequest {
    #[serde(default = "default_amount")]
    pub amount: i64,
}

fn default_amount() -> i64 {
    1
}

impl Default for IncrementRequest {
    fn default() -> Self {
        Self { amount: 1 }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementResponse {
    pub applied: bool,
    pub dimension: LimitDimension,
    pub current_usage: i64,
    pub limit: i64,
}

/// Consume units of a resource, refusing at the ceiling.
///
/// The pre-check gives the caller a denial with counter values; the
/// database-side increment re-checks under a row lock, so a concurrent
/// request that lost the race is also refused rather than pushed over.
pub async fn increment_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(dimension): Path<String>,
    body: Option<Json<IncrementRequest>>,
) -> ApiResult<Json<IncrementResponse>> {
    let dimension = LimitDimension::from_str(&dimension)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown usage dimension: {}", dimension)))?;
    let Json(req) = body.unwrap_or_default();
    if req.amount <= 0 {
        return Err(ApiError::Validation(format!(
            "amount must be positive, got {}",
            req.amount
        )));
    }

    let subscription = state.store.get(auth.tenant_id).await?;
    let check = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .check_usage_limit(dimension);
    if !check.has_access {
        return Err(ApiError::UsageDenied(check));
    }

    let applied = state
        .store
        .increment_usage(auth.tenant_id, dimension, req.amount)
        .await?;
    if !applied {
        // Lost a race: re-read so the denial carries the real counters
        return Err(usage_denial(&state, &auth, dimension).await?);
    }

    Ok(Json(IncrementResponse {
        applied: true,
        dimension,
        current_usage: check.current_usage.unwrap_or(0) + req.amount,
        limit: check.limit.unwrap_or(-1),
    }))
}

async fn usage_denial(
    state: &AppState,
    auth: &AuthUser,
    dimension: LimitDimension,
) -> Result<ApiError, ApiError> {
    let subscription = state.store.get(auth.tenant_id).await?;
    let result = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .check_usage_limit(dimension);
    Ok(ApiError::UsageDenied(result))
}

#[derive(Deserialize)]
pub struct SendCampaignRequest {
    pub subject: String,
    pub segment: String,
}

/// Queue an email campaign. The route is gated on the campaigns feature
/// and monthly send capacity; the guards attach the subscription they
/// already loaded.
pub async fn send_campaign(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(subscription): Extension<Arc<TenantSubscription>>,
    Json(req): Json<SendCampaignRequest>,
) -> ApiResult<Json<Value>> {
    if req.subject.trim().is_empty() {
        return Err(ApiError::Validation("subject must not be empty".to_string()));
    }

    let applied = state
        .store
        .increment_usage(auth.tenant_id, LimitDimension::EmailCampaignsMonthly, 1)
        .await?;
    if !applied {
        return Err(usage_denial(&state, &auth, LimitDimension::EmailCampaignsMonthly).await?);
    }

    tracing::info!(
        tenant_id = %auth.tenant_id,
        plan = %subscription.plan_id,
        segment = %req.segment,
        "campaign queued"
    );

    Ok(Json(json!({
        "queued": true,
        "subject": req.subject,
        "segment": req.segment,
    })))
}
