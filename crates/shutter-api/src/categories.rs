use axum::{Json, extract::State};

use shutter_types::models::Category;

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::render::category;
use crate::run_db;

/// GET /categories (public)
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let rows = run_db(&state, |db| Ok(db.list_categories()?)).await?;
    Ok(Json(rows.into_iter().map(category).collect()))
}
