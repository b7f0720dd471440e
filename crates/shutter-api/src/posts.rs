use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use shutter_db::Database;
use shutter_db::models::{PostAggregates, PostRow};
use shutter_types::api::{
    CreatePostResponse, MessageResponse, PostPageResponse, PostResponse, UpdatePostRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::pagination::{PageQuery, Pagination};
use crate::render::{post_response, post_responses};
use crate::run_db;
use crate::uploads::{ImageUpload, multipart_error, read_text};

const FEED_DEFAULT_LIMIT: u32 = 10;
pub(crate) const MAX_PAGE_LIMIT: u32 = 50;

const TRENDING_DEFAULT_HOURS: i64 = 24;
const TRENDING_MAX_HOURS: i64 = 720;
const TRENDING_LIMIT: u32 = 20;

/// Runs the viewer's aggregate lookups for a batch of post rows.
pub(crate) fn with_aggregates(
    db: &Database,
    viewer_id: &str,
    rows: Vec<PostRow>,
) -> ApiResult<(Vec<PostRow>, PostAggregates)> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let aggregates = db.post_aggregates(viewer_id, &ids)?;
    Ok((rows, aggregates))
}

/// GET /posts?page=&limit=
pub async fn get_posts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PostPageResponse>> {
    let pagination = Pagination::from_query(&query, FEED_DEFAULT_LIMIT, MAX_PAGE_LIMIT);
    let viewer = user.id.to_string();

    let (rows, aggregates, total) = run_db(&state, move |db| {
        let page = db.list_posts(pagination.limit, pagination.offset)?;
        let (rows, aggregates) = with_aggregates(db, &viewer, page.rows)?;
        Ok((rows, aggregates, page.total))
    })
    .await?;

    Ok(Json(PostPageResponse {
        posts: post_responses(rows, &aggregates, &state.public_url),
        page: pagination.page,
        limit: pagination.limit,
        total,
        has_more: pagination.has_more(total),
    }))
}

/// GET /posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<PostResponse>> {
    let (viewer, pid) = (user.id.to_string(), post_id.to_string());
    let (row, aggregates) = run_db(&state, move |db| {
        let row = db
            .get_post(&pid)?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        let aggregates = db.post_aggregates(&viewer, std::slice::from_ref(&row.id))?;
        Ok((row, aggregates))
    })
    .await?;

    Ok(Json(post_response(row, &aggregates, &state.public_url)))
}

/// POST /posts: multipart `image`, `caption`, `category_id`.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut image: Option<ImageUpload> = None;
    let mut caption = String::new();
    let mut category_id = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "image" => image = Some(state.uploads.read_image(field).await?),
            "caption" => caption = read_text(field).await?.trim().to_string(),
            "category_id" => category_id = read_text(field).await?.trim().to_string(),
            _ => continue,
        }
    }

    let Some(image) = image else {
        return Err(ApiError::bad_request("Image is required"));
    };
    if caption.is_empty() || category_id.is_empty() {
        return Err(ApiError::bad_request("Caption and category are required"));
    }

    let category = category_id.clone();
    let known = run_db(&state, move |db| Ok(db.category_exists(&category)?)).await?;
    if !known {
        return Err(ApiError::bad_request("Invalid category"));
    }

    let image_url = state.uploads.save_image("post", &image).await?;

    let post_id = Uuid::new_v4().to_string();
    let viewer = user.id.to_string();
    let stored_url = image_url.clone();
    let created = run_db(&state, move |db| {
        db.insert_post(&post_id, &viewer, &stored_url, &caption, &category_id)?;
        let row = db
            .get_post(&post_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post {} vanished after insert", post_id)))?;
        let aggregates = db.post_aggregates(&viewer, std::slice::from_ref(&row.id))?;
        Ok((row, aggregates))
    })
    .await;

    let (row, aggregates) = match created {
        Ok(created) => created,
        Err(e) => {
            // Row never landed, so the file would be unreachable
            state.uploads.remove(&image_url).await;
            return Err(e);
        }
    };

    info!("{} created post {}", user.id, row.id);
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully".into(),
            post: post_response(row, &aggregates, &state.public_url),
        }),
    ))
}

/// PUT /posts/{post_id}: owner only; absent fields keep their value.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let caption = req.caption.map(|c| c.trim().to_string());
    if caption.as_deref() == Some("") {
        return Err(ApiError::bad_request("Caption cannot be empty"));
    }
    let category_id = req.category_id.map(|c| c.trim().to_string());

    let (viewer, pid) = (user.id.to_string(), post_id.to_string());
    let (row, aggregates) = run_db(&state, move |db| {
        let post = require_post_owner(db, &pid, &viewer)?;

        if let Some(category) = category_id.as_deref() {
            if !db.category_exists(category)? {
                return Err(ApiError::bad_request("Invalid category"));
            }
        }

        let caption = caption.unwrap_or(post.caption);
        let category = category_id.unwrap_or(post.category_id);
        db.update_post(&pid, &caption, &category)?;

        let row = db
            .get_post(&pid)?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        let aggregates = db.post_aggregates(&viewer, std::slice::from_ref(&row.id))?;
        Ok((row, aggregates))
    })
    .await?;

    Ok(Json(post_response(row, &aggregates, &state.public_url)))
}

/// DELETE /posts/{post_id}: owner only. Removes the image file as well.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (viewer, pid) = (user.id.to_string(), post_id.to_string());
    let image_url = run_db(&state, move |db| {
        let post = require_post_owner(db, &pid, &viewer)?;
        db.delete_post(&pid)?;
        Ok(post.image_url)
    })
    .await?;

    state.uploads.remove(&image_url).await;

    info!("{} deleted post {}", user.id, post_id);
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub hours: Option<String>,
}

/// Window size in hours: default 24, clamped to 1..=720.
pub fn trending_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|h| h.trim().parse::<i64>().ok())
        .unwrap_or(TRENDING_DEFAULT_HOURS)
        .clamp(1, TRENDING_MAX_HOURS)
}

/// GET /posts/trending?hours=
pub async fn trending(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TrendingQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let hours = trending_hours(query.hours.as_deref());
    let since = shutter_db::timestamp_hours_ago(hours);
    let viewer = user.id.to_string();

    let (rows, aggregates) = run_db(&state, move |db| {
        let rows = db.trending_posts(&since, TRENDING_LIMIT)?;
        let ids: Vec<String> = rows.iter().map(|r| r.post.id.clone()).collect();
        let aggregates = db.post_aggregates(&viewer, &ids)?;
        Ok((rows, aggregates))
    })
    .await?;

    let posts = rows
        .into_iter()
        .map(|row| {
            let mut post = post_response(row.post, &aggregates, &state.public_url);
            post.recent_likes = Some(row.recent_likes);
            post
        })
        .collect();

    Ok(Json(posts))
}

fn require_post_owner(db: &Database, post_id: &str, user_id: &str) -> ApiResult<PostRow> {
    let post = db
        .get_post(post_id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    if post.user_id != user_id {
        warn!("{} tried to modify post {} owned by {}", user_id, post_id, post.user_id);
        return Err(ApiError::forbidden("You can only modify your own posts"));
    }
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_window_is_clamped() {
        assert_eq!(trending_hours(None), 24);
        assert_eq!(trending_hours(Some("abc")), 24);
        assert_eq!(trending_hours(Some("0")), 1);
        assert_eq!(trending_hours(Some("-5")), 1);
        assert_eq!(trending_hours(Some("48")), 48);
        assert_eq!(trending_hours(Some("100000")), 720);
    }

    #[test]
    fn only_the_owner_may_modify_a_post() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&alice, "alice", "alice@x.com", "hash").unwrap();
        db.create_user(&bob, "bob", "bob@x.com", "hash").unwrap();
        let category = db.list_categories().unwrap().remove(0).id;
        db.insert_post("p1", &alice, "/uploads/p.png", "mine", &category)
            .unwrap();

        assert_eq!(require_post_owner(&db, "p1", &alice).unwrap().caption, "mine");
        assert_eq!(
            require_post_owner(&db, "p1", &bob).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            require_post_owner(&db, "p2", &alice).unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn aggregates_cover_exactly_the_given_rows() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        db.create_user(&alice, "alice", "alice@x.com", "hash").unwrap();
        let category = db.list_categories().unwrap().remove(0).id;
        db.insert_post("p1", &alice, "/uploads/1.png", "one", &category).unwrap();
        db.insert_post("p2", &alice, "/uploads/2.png", "two", &category).unwrap();
        db.insert_like("l1", &alice, "p1").unwrap();
        db.insert_like("l2", &alice, "p2").unwrap();

        let only_p1 = vec![db.get_post("p1").unwrap().unwrap()];
        let (rows, aggregates) = with_aggregates(&db, &alice, only_p1).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(aggregates.liked.contains("p1"));
        assert!(!aggregates.liked.contains("p2"));
        assert_eq!(aggregates.like_counts.get("p1"), Some(&1));
    }
}
