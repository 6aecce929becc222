//! Entitlement query endpoints
//!
//! Read-only views of a tenant's access: these always answer 200 with the
//! evaluation outcome, refused or not. Enforcement (403/429) happens in
//! the guard middleware on the routes that do work.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use dealcrm_entitlements::{
    AccessEvaluator, FeatureAccessResult, FeatureAccessSummary, FeatureId, SubscriptionSnapshot,
};
use dealcrm_shared::{LimitDimension, UsageCounter};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Everything the tenant can and cannot do, in one response
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<FeatureAccessSummary>> {
    let summary = state
        .store
        .feature_access_summary(auth.tenant_id, &state.config.upgrade_url_base)
        .await?;
    Ok(Json(summary))
}

/// Evaluate access to a single feature
pub async fn get_feature(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feature_id): Path<String>,
) -> ApiResult<Json<FeatureAccessResult>> {
    let feature = FeatureId::from_str(&feature_id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown feature: {}", feature_id)))?;

    let subscription = state.store.get(auth.tenant_id).await?;
    let result = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .has_feature_access(feature);
    Ok(Json(result))
}

/// Subscription state without any feature question attached
pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<SubscriptionSnapshot>> {
    let subscription = state.store.get(auth.tenant_id).await?;
    let snapshot = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .subscription_status();
    Ok(Json(snapshot))
}

/// Usage counters for every tracked dimension
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<BTreeMap<LimitDimension, UsageCounter>>> {
    let subscription = state.store.get(auth.tenant_id).await?;
    let stats = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .usage_stats()
        .ok_or(ApiError::NotFound)?;
    Ok(Json(stats))
}
