pub mod auth;
pub mod categories;
pub mod collections;
pub mod comments;
pub mod error;
pub mod extract;
pub mod follows;
pub mod likes;
pub mod middleware;
pub mod pagination;
pub mod posts;
pub mod render;
pub mod search;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tracing::error;

use shutter_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_auth;

/// Slack on top of the image limit for the other multipart fields.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Runs a storage closure on the blocking pool. The SQLite connection is
/// synchronous and must never be held across an await on a runtime thread.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("Database task failed: {}", e);
            ApiError::Internal(e.into())
        })?
}

/// Every API route. Static files and transport layers (CORS, tracing) are
/// added by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/categories", get(categories::list_categories));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        // Users
        .route("/users/profile", get(users::my_profile))
        .route(
            "/users/{user}",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/users/{user}/posts", get(users::get_user_posts))
        // Follow graph
        .route(
            "/follows/{user_id}",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route("/follows/followers/{user_id}", get(follows::get_followers))
        .route("/follows/following/{user_id}", get(follows::get_following))
        .route("/follows/status/{user_id}", get(follows::follow_status))
        .route("/follows/mutual/{user_id}", get(follows::mutual_status))
        // Posts
        .route("/posts", get(posts::get_posts).post(posts::create_post))
        .route("/posts/trending", get(posts::trending))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/like",
            post(likes::like_post).delete(likes::unlike_post),
        )
        .route(
            "/posts/{post_id}/comments",
            get(comments::get_post_comments).post(comments::create_comment),
        )
        .route("/posts/{post_id}/comment-count", get(comments::get_comment_count))
        .route(
            "/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        // Collections
        .route(
            "/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/collections/{collection_id}",
            get(collections::get_collection).delete(collections::delete_collection),
        )
        .route("/collections/{collection_id}/posts", post(collections::add_post))
        .route(
            "/collections/{collection_id}/posts/{post_id}",
            delete(collections::remove_post),
        )
        .route(
            "/collections/with-posts/{post_id}",
            get(collections::collections_with_post),
        )
        .route(
            "/collections/without-post/{post_id}",
            get(collections::collections_without_post),
        )
        .route("/collections/check-post/{post_id}", get(collections::check_post))
        // Search
        .route("/search/posts", get(search::search_posts))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    let body_limit = state.uploads.max_bytes() + FORM_OVERHEAD_BYTES;

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
