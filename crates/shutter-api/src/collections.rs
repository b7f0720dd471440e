use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use shutter_db::Database;
use shutter_db::models::CollectionRow;
use shutter_types::api::{
    AddPostToCollectionRequest, BookmarkStatusResponse, CollectionDetailResponse,
    CollectionResponse, CreateCollectionRequest, CreateCollectionResponse, MessageResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::posts::with_aggregates;
use crate::render::{collection_response, parse_uuid, post_responses};
use crate::run_db;

/// GET /collections
pub async fn list_collections(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let uid = user.id.to_string();
    let rows = run_db(&state, move |db| Ok(db.list_collections(&uid)?)).await?;
    Ok(Json(rows.into_iter().map(collection_response).collect()))
}

/// POST /collections
pub async fn create_collection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.collection_name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Collection name is required"));
    }

    let id = Uuid::new_v4().to_string();
    let uid = user.id.to_string();
    let row = run_db(&state, move |db| {
        db.create_collection(&id, &uid, &name)?;
        owned_collection(db, &id, &uid)
    })
    .await?;

    info!("{} created collection {}", user.id, row.id);
    Ok((
        StatusCode::CREATED,
        Json(CreateCollectionResponse {
            message: "Collection created successfully".into(),
            collection: collection_response(row),
        }),
    ))
}

/// GET /collections/{collection_id}: the collection and its posts.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<CollectionDetailResponse>> {
    let (uid, cid) = (user.id.to_string(), collection_id.to_string());
    let (collection, rows, aggregates) = run_db(&state, move |db| {
        let collection = owned_collection(db, &cid, &uid)?;
        let (rows, aggregates) = with_aggregates(db, &uid, db.posts_in_collection(&cid)?)?;
        Ok((collection, rows, aggregates))
    })
    .await?;

    Ok(Json(CollectionDetailResponse {
        collection: collection_response(collection),
        posts: post_responses(rows, &aggregates, &state.public_url),
    }))
}

/// DELETE /collections/{collection_id}
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (uid, cid) = (user.id.to_string(), collection_id.to_string());
    let deleted = run_db(&state, move |db| Ok(db.delete_collection(&cid, &uid)?)).await?;
    if !deleted {
        return Err(ApiError::not_found("Collection not found"));
    }

    info!("{} deleted collection {}", user.id, collection_id);
    Ok(Json(MessageResponse::new("Collection deleted successfully")))
}

/// POST /collections/{collection_id}/posts `{post_id}`
pub async fn add_post(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<AddPostToCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let post_id = req
        .post_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Post ID is required"))?;

    let (uid, cid) = (user.id.to_string(), collection_id.to_string());
    run_db(&state, move |db| {
        owned_collection(db, &cid, &uid)?;
        if db.get_post(&post_id)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        if !db.add_post_to_collection(&Uuid::new_v4().to_string(), &cid, &post_id)? {
            return Err(ApiError::conflict("Post already in collection"));
        }
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Post added to collection")),
    ))
}

/// DELETE /collections/{collection_id}/posts/{post_id}
pub async fn remove_post(
    State(state): State<AppState>,
    Path((collection_id, post_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (uid, cid, pid) = (
        user.id.to_string(),
        collection_id.to_string(),
        post_id.to_string(),
    );
    run_db(&state, move |db| {
        owned_collection(db, &cid, &uid)?;
        if !db.remove_post_from_collection(&cid, &pid)? {
            return Err(ApiError::not_found("Post not found in collection"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Post removed from collection")))
}

/// GET /collections/with-posts/{post_id}
pub async fn collections_with_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    let rows = run_db(&state, move |db| Ok(db.collections_with_post(&uid, &pid)?)).await?;
    Ok(Json(rows.into_iter().map(collection_response).collect()))
}

/// GET /collections/without-post/{post_id}: targets for the save picker.
pub async fn collections_without_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    let rows = run_db(&state, move |db| Ok(db.collections_without_post(&uid, &pid)?)).await?;
    Ok(Json(rows.into_iter().map(collection_response).collect()))
}

/// GET /collections/check-post/{post_id}
pub async fn check_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<BookmarkStatusResponse>> {
    let (uid, pid) = (user.id.to_string(), post_id.to_string());
    let rows = run_db(&state, move |db| Ok(db.collections_with_post(&uid, &pid)?)).await?;

    Ok(Json(BookmarkStatusResponse {
        is_bookmarked: !rows.is_empty(),
        collection_ids: rows
            .iter()
            .map(|r| parse_uuid(&r.id, "collection id"))
            .collect(),
    }))
}

fn owned_collection(db: &Database, collection_id: &str, user_id: &str) -> ApiResult<CollectionRow> {
    db.get_collection(collection_id, user_id)?
        .ok_or_else(|| ApiError::not_found("Collection not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_collections_look_missing() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&alice, "alice", "alice@x.com", "hash").unwrap();
        db.create_user(&bob, "bob", "bob@x.com", "hash").unwrap();
        db.create_collection("c1", &alice, "Favourites").unwrap();

        assert_eq!(owned_collection(&db, "c1", &alice).unwrap().name, "Favourites");
        assert_eq!(
            owned_collection(&db, "c1", &bob).unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }
}
