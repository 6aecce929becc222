//! API routes

pub mod entitlements;
pub mod health;
pub mod plans;
pub mod usage;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    routing::{get, post},
    Extension, Router,
};

use dealcrm_entitlements::FeatureId;
use dealcrm_shared::LimitDimension;

use crate::{
    auth::{require_auth, AuthUser},
    guards,
    state::AppState,
};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Public API routes (no auth required) - under /api/v1
    let public_api_routes = Router::new()
        .route("/plans", get(plans::list_plans))
        .route("/plans/quote", post(plans::quote)) // Must be before :plan_id
        .route("/plans/:plan_id", get(plans::get_plan))
        .route("/plans/:plan_id/validate-limits", post(plans::validate_limits))
        .route("/features", get(plans::list_features))
        .route("/features/validate", post(plans::validate_features));

    // Campaign sends are double-gated: the feature must be available and
    // the monthly send counter must be under its ceiling
    let campaign_routes = Router::new()
        .route("/campaigns/send", post(usage::send_campaign))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            |state: State<AppState>, auth: Extension<AuthUser>, req: Request, next: Next| async move {
                guards::require_usage_capacity(
                    LimitDimension::EmailCampaignsMonthly,
                    state,
                    auth,
                    req,
                    next,
                )
                .await
            },
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            |state: State<AppState>, auth: Extension<AuthUser>, req: Request, next: Next| async move {
                guards::require_feature(FeatureId::EmailCampaigns, state, auth, req, next).await
            },
        ));

    // Protected API routes (auth required) - under /api/v1
    let protected_api_routes = Router::new()
        .route("/entitlements/summary", get(entitlements::get_summary))
        .route("/entitlements/features/:feature_id", get(entitlements::get_feature))
        .route("/entitlements/status", get(entitlements::get_status))
        .route("/entitlements/usage", get(entitlements::get_usage))
        .route("/usage/:dimension/increment", post(usage::increment_usage))
        .merge(campaign_routes)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Combine API routes under /api/v1 prefix
    let api_v1_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    // connect_lazy never opens a connection, so routes that stay off the
    // database are testable without one
    fn test_state() -> AppState {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/dealcrm_test").unwrap();
        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: "postgres://localhost/dealcrm_test".to_string(),
            jwt_secret: "test-jwt-secret-must-be-at-least-32-characters-long".to_string(),
            jwt_expiry_hours: 24,
            upgrade_url_base: "/billing/upgrade".to_string(),
        };
        AppState::new(pool, config)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_plans_is_public() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/plans")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let plans = body.as_array().unwrap();
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[0]["id"], "starter");
        assert_eq!(plans[1]["monthlyPrice"], 79);
    }

    #[tokio::test]
    async fn test_unknown_plan_is_bad_request() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/plans/platinum")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quote_professional_yearly() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/plans/quote")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"plan": "professional", "billingCycle": "yearly"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["planCost"], 790);
        assert_eq!(body["total"], 790);
        assert_eq!(body["discount"], 17);
    }

    #[tokio::test]
    async fn test_quote_rejects_unavailable_package() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/plans/quote")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"plan": "business", "billingCycle": "monthly", "addOnPackages": ["automation_plus"]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_entitlements_require_auth() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/entitlements/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_feature_catalog_listing() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/features")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), FeatureId::all().len());
    }

    #[tokio::test]
    async fn test_validate_features_reports_missing_dependency() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/features/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"features": ["contract_management"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["missing"][0], "quote_generation");
    }
}
