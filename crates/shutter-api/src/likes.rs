use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use shutter_types::api::LikeResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::run_db;

/// POST /posts/{post_id}/like. Idempotent: a repeat like answers 200 and
/// stores nothing.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    let added = run_db(&state, move |db| {
        if db.get_post(&pid)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(db.insert_like(&Uuid::new_v4().to_string(), &uid, &pid)?)
    })
    .await?;

    if !added {
        return Ok((
            StatusCode::OK,
            Json(LikeResponse {
                message: "Post already liked".into(),
                liked: true,
            }),
        ));
    }

    debug!("{} liked post {}", user.id, post_id);
    Ok((
        StatusCode::CREATED,
        Json(LikeResponse {
            message: "Post liked successfully".into(),
            liked: true,
        }),
    ))
}

/// DELETE /posts/{post_id}/like
pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    run_db(&state, move |db| {
        if db.get_post(&pid)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        if !db.delete_like(&uid, &pid)? {
            return Err(ApiError::not_found("Like not found"));
        }
        Ok(())
    })
    .await?;

    debug!("{} unliked post {}", user.id, post_id);
    Ok(Json(LikeResponse {
        message: "Post unliked successfully".into(),
        liked: false,
    }))
}
