use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use shutter_db::Database;
use shutter_types::api::{
    CommentCountResponse, CommentResponse, CreateCommentRequest, MessageResponse,
    UpdateCommentRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::render::{comment_response, comment_tree};
use crate::run_db;

/// Whether `user_id` may comment on `post_id`: the post owner always may,
/// anyone else only while they and the owner follow each other.
pub fn can_comment(db: &Database, user_id: &str, post_id: &str) -> ApiResult<()> {
    let post = db
        .get_post(post_id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if post.user_id == user_id || db.is_mutual(user_id, &post.user_id)? {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You can only comment on posts of users you mutually follow",
        ))
    }
}

/// POST /posts/{post_id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim().to_string();
    let parent_id = req
        .parent_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let comment_id = Uuid::new_v4().to_string();
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    let row = run_db(&state, move |db| {
        can_comment(db, &uid, &pid)?;

        if content.is_empty() {
            return Err(ApiError::bad_request("Comment content is required"));
        }
        if let Some(parent) = parent_id.as_deref() {
            let parent = db
                .get_comment(parent)?
                .ok_or_else(|| ApiError::bad_request("Parent comment not found"))?;
            if parent.post_id != pid {
                return Err(ApiError::bad_request("Parent comment belongs to another post"));
            }
        }

        db.insert_comment(&comment_id, &pid, &uid, &content, parent_id.as_deref())?;
        db.get_comment(&comment_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("comment {} vanished after insert", comment_id)))
    })
    .await
    .inspect_err(|e| {
        if matches!(e, ApiError::Forbidden(_)) {
            warn!("{} tried to comment on post {} without mutual follow", user.id, post_id);
        }
    })?;

    info!("{} commented on post {}", user.id, post_id);
    Ok((
        StatusCode::CREATED,
        Json(comment_response(row, &state.public_url)),
    ))
}

/// GET /posts/{post_id}/comments: the whole thread, replies nested.
pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let pid = post_id.to_string();
    let rows = run_db(&state, move |db| {
        if db.get_post(&pid)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(db.list_comments_for_post(&pid)?)
    })
    .await?;

    Ok(Json(comment_tree(rows, &state.public_url)))
}

/// GET /posts/{post_id}/comment-count
pub async fn get_comment_count(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<CommentCountResponse>> {
    let pid = post_id.to_string();
    let count = run_db(&state, move |db| {
        if db.get_post(&pid)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(db.count_comments(&pid)?)
    })
    .await?;

    Ok(Json(CommentCountResponse { count }))
}

/// PUT /comments/{comment_id}: author only.
pub async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }

    let (uid, cid) = (user.id.to_string(), comment_id.to_string());
    let row = run_db(&state, move |db| {
        require_comment_owner(db, &cid, &uid)?;
        db.update_comment_content(&cid, &content)?;
        db.get_comment(&cid)?
            .ok_or_else(|| ApiError::not_found("Comment not found"))
    })
    .await?;

    Ok(Json(comment_response(row, &state.public_url)))
}

/// DELETE /comments/{comment_id}: author only; replies go with it.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (uid, cid) = (user.id.to_string(), comment_id.to_string());
    run_db(&state, move |db| {
        require_comment_owner(db, &cid, &uid)?;
        db.delete_comment(&cid)?;
        Ok(())
    })
    .await?;

    info!("{} deleted comment {}", user.id, comment_id);
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

fn require_comment_owner(db: &Database, comment_id: &str, user_id: &str) -> ApiResult<()> {
    let comment = db
        .get_comment(comment_id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if comment.user_id != user_id {
        return Err(ApiError::forbidden("You can only modify your own comments"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> (Database, String, String, String) {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&alice, "alice", "alice@x.com", "hash").unwrap();
        db.create_user(&bob, "bob", "bob@x.com", "hash").unwrap();

        let post = Uuid::new_v4().to_string();
        let category = db.list_categories().unwrap().remove(0).id;
        db.insert_post(&post, &alice, "/uploads/p.png", "hello", &category)
            .unwrap();
        (db, alice, bob, post)
    }

    #[test]
    fn owner_may_always_comment() {
        let (db, alice, _, post) = db_with_users();
        assert!(can_comment(&db, &alice, &post).is_ok());
    }

    #[test]
    fn one_way_follow_is_not_enough() {
        let (db, alice, bob, post) = db_with_users();
        db.create_follow("f1", &bob, &alice).unwrap();

        let err = can_comment(&db, &bob, &post).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        db.create_follow("f2", &alice, &bob).unwrap();
        assert!(can_comment(&db, &bob, &post).is_ok());
    }

    #[test]
    fn missing_post_is_not_found() {
        let (db, alice, _, _) = db_with_users();
        let err = can_comment(&db, &alice, "missing").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn only_the_author_owns_a_comment() {
        let (db, alice, bob, post) = db_with_users();
        db.insert_comment("c1", &post, &alice, "mine", None).unwrap();

        assert!(require_comment_owner(&db, "c1", &alice).is_ok());
        assert_eq!(
            require_comment_owner(&db, "c1", &bob).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            require_comment_owner(&db, "nope", &alice).unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }
}
