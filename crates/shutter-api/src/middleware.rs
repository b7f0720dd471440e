use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::render::parse_uuid;
use crate::run_db;

/// The session owner, attached to every authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
}

/// Resolve the bearer token in the Authorization header to its session.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid token"))?
        .to_string();

    let lookup = token.clone();
    let user = run_db(&state, move |db| Ok(db.get_session_user(&lookup)?))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session not found or expired"))?;

    req.extensions_mut().insert(AuthUser {
        id: parse_uuid(&user.id, "user id"),
        username: user.username,
        email: user.email,
        token,
    });
    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
