//! Entitlement guard middleware
//!
//! Route-level adapters over the access evaluator. A guarded route never
//! sees a request from a tenant that failed the check: feature refusals
//! leave as 403, capacity refusals as 429, and only infrastructure
//! failures surface as 500. When a check passes, the loaded subscription
//! is attached to the request so handlers don't fetch it twice.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};

use dealcrm_entitlements::{AccessEvaluator, FeatureId};
use dealcrm_shared::LimitDimension;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Refuse the request unless the tenant may use `feature`
pub async fn require_feature(
    feature: FeatureId,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subscription = state.store.get(auth.tenant_id).await?;
    let result = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .has_feature_access(feature);

    if !result.has_access {
        tracing::debug!(
            tenant_id = %auth.tenant_id,
            feature = %feature,
            reason = %result.reason,
            "feature access refused"
        );
        return Err(ApiError::FeatureDenied(result));
    }

    if let Some(sub) = subscription {
        req.extensions_mut().insert(Arc::new(sub));
    }
    Ok(next.run(req).await)
}

/// Refuse the request when the tenant's counter for `dimension` is at or
/// over its ceiling
pub async fn require_usage_capacity(
    dimension: LimitDimension,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subscription = state.store.get(auth.tenant_id).await?;
    let result = AccessEvaluator::new(subscription.as_ref(), &state.config.upgrade_url_base)
        .check_usage_limit(dimension);

    if !result.has_access {
        tracing::debug!(
            tenant_id = %auth.tenant_id,
            dimension = %dimension,
            reason = %result.reason,
            "usage capacity refused"
        );
        return Err(ApiError::UsageDenied(result));
    }

    if let Some(sub) = subscription {
        req.extensions_mut().insert(Arc::new(sub));
    }
    Ok(next.run(req).await)
}
