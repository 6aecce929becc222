//! Health check endpoints
//!
//! Readiness means the subscription table is reachable, since every
//! guarded request starts with a subscription lookup.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use dealcrm_entitlements::{FeatureId, PlanId};

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub subscriptions: &'static str,
    pub catalog_features: usize,
    pub plans: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let subscriptions_ok = subscription_table_reachable(&state).await;

    let (code, status) = if subscriptions_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            subscriptions: if subscriptions_ok { "reachable" } else { "unreachable" },
            catalog_features: FeatureId::all().len(),
            plans: PlanId::all().len(),
        }),
    )
}

/// Liveness (just returns 200 if the server is running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness: ready only once the subscription store can answer
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if subscription_table_reachable(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn subscription_table_reachable(state: &AppState) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM tenant_subscriptions")
        .fetch_one(&state.pool)
        .await
        .is_ok()
}
