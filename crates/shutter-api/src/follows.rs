use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use shutter_types::api::{FollowResponse, FollowStatusResponse, MessageResponse, MutualResponse};
use shutter_types::models::UserSummary;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::render::user_summary;
use crate::run_db;

/// POST /follows/{user_id}. Following twice is a no-op, not an error.
pub async fn follow_user(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    if user.id == target_id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let follower = user.id.to_string();
    let followee = target_id.to_string();
    let created = run_db(&state, move |db| {
        if db.get_user_by_id(&followee)?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(db.create_follow(&Uuid::new_v4().to_string(), &follower, &followee)?)
    })
    .await?;

    if !created {
        return Ok((
            StatusCode::OK,
            Json(FollowResponse {
                message: "Already followed".into(),
                following: true,
            }),
        ));
    }

    info!("{} followed {}", user.id, target_id);
    Ok((
        StatusCode::CREATED,
        Json(FollowResponse {
            message: "Followed user".into(),
            following: true,
        }),
    ))
}

/// DELETE /follows/{user_id}
pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let follower = user.id.to_string();
    let followee = target_id.to_string();
    let deleted = run_db(&state, move |db| Ok(db.delete_follow(&follower, &followee)?)).await?;

    if !deleted {
        return Err(ApiError::not_found("Follow relationship not found"));
    }

    info!("{} unfollowed {}", user.id, target_id);
    Ok(Json(MessageResponse::new("Unfollowed user")))
}

/// GET /follows/followers/{user_id}
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    follow_list(state, user_id, Direction::Followers).await
}

/// GET /follows/following/{user_id}
pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    follow_list(state, user_id, Direction::Following).await
}

/// GET /follows/status/{user_id}: does the caller follow this user.
pub async fn follow_status(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<FollowStatusResponse>> {
    let (follower, followee) = (user.id.to_string(), target_id.to_string());
    let is_following = run_db(&state, move |db| Ok(db.is_following(&follower, &followee)?)).await?;
    Ok(Json(FollowStatusResponse { is_following }))
}

/// GET /follows/mutual/{user_id}
pub async fn mutual_status(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<MutualResponse>> {
    let (me, them) = (user.id.to_string(), target_id.to_string());
    let (is_following, is_followed_by) = run_db(&state, move |db| {
        Ok((db.is_following(&me, &them)?, db.is_following(&them, &me)?))
    })
    .await?;

    Ok(Json(MutualResponse {
        is_mutual: is_following && is_followed_by,
        is_following,
        is_followed_by,
    }))
}

enum Direction {
    Followers,
    Following,
}

async fn follow_list(
    state: AppState,
    user_id: Uuid,
    direction: Direction,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let id = user_id.to_string();
    let rows = run_db(&state, move |db| {
        if db.get_user_by_id(&id)?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(match direction {
            Direction::Followers => db.get_followers(&id)?,
            Direction::Following => db.get_following(&id)?,
        })
    })
    .await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| user_summary(row, &state.public_url))
            .collect(),
    ))
}
