use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::debug;

use shutter_types::api::SearchResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::pagination::Pagination;
use crate::posts::{MAX_PAGE_LIMIT, with_aggregates};
use crate::render::post_responses;
use crate::run_db;

const SEARCH_DEFAULT_LIMIT: u32 = 3;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /search/posts?q=&page=&limit=
pub async fn search_posts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    if term.is_empty() {
        return Err(ApiError::bad_request("Search term is required"));
    }

    let pagination = Pagination::new(
        query.page.as_deref(),
        query.limit.as_deref(),
        SEARCH_DEFAULT_LIMIT,
        MAX_PAGE_LIMIT,
    );
    let viewer = user.id.to_string();
    let needle = term.clone();

    let (rows, aggregates, total) = run_db(&state, move |db| {
        let page = db.search_posts(&needle, pagination.limit, pagination.offset)?;
        let (rows, aggregates) = with_aggregates(db, &viewer, page.rows)?;
        Ok((rows, aggregates, page.total))
    })
    .await?;

    debug!("search '{}' matched {} posts", term, total);
    Ok(Json(SearchResponse {
        search_term: term,
        posts: post_responses(rows, &aggregates, &state.public_url),
        total_results: total,
        has_more: pagination.has_more(total),
        page: pagination.page,
    }))
}
