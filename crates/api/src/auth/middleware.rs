//! Request authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use dealcrm_shared::{TenantId, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated identity inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: String,
}

/// Require a valid bearer token and attach [`AuthUser`] to the request
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::debug!("Token validation failed: {}", e);
        ApiError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthUser {
        user_id: UserId(claims.sub),
        tenant_id: TenantId(claims.tenant_id),
        role: claims.role,
    });

    Ok(next.run(req).await)
}
