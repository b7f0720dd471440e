use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
};
use tracing::info;
use uuid::Uuid;

use shutter_db::Database;
use shutter_db::models::UserRow;
use shutter_types::api::{PostPageResponse, ProfileResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::pagination::{PageQuery, Pagination};
use crate::posts::{MAX_PAGE_LIMIT, with_aggregates};
use crate::render::{absolute_url, parse_timestamp, parse_uuid, post_responses};
use crate::run_db;
use crate::uploads::{ImageUpload, multipart_error, read_text};

const USER_POSTS_DEFAULT_LIMIT: u32 = 3;

struct Profile {
    user: UserRow,
    followers: u64,
    following: u64,
    is_following: bool,
}

impl Profile {
    fn load(db: &Database, user: UserRow, viewer_id: &str) -> ApiResult<Self> {
        let (followers, following) = db.follow_counts(&user.id)?;
        let is_following = user.id != viewer_id && db.is_following(viewer_id, &user.id)?;
        Ok(Self {
            user,
            followers,
            following,
            is_following,
        })
    }

    fn into_response(self, base: &str) -> ProfileResponse {
        ProfileResponse {
            user_id: parse_uuid(&self.user.id, "user id"),
            username: self.user.username,
            email: self.user.email,
            profile_picture: self.user.profile_picture.map(|p| absolute_url(base, &p)),
            bio: self.user.bio,
            followers_count: self.followers,
            following_count: self.following,
            is_following: self.is_following,
            created_at: parse_timestamp(&self.user.created_at),
        }
    }
}

/// GET /users/profile: the caller's own profile.
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let uid = user.id.to_string();
    let profile = run_db(&state, move |db| {
        let row = db
            .get_user_by_id(&uid)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Profile::load(db, row, &uid)
    })
    .await?;

    Ok(Json(profile.into_response(&state.public_url)))
}

/// GET /users/{username}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let viewer = user.id.to_string();
    let profile = run_db(&state, move |db| {
        let row = db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Profile::load(db, row, &viewer)
    })
    .await?;

    Ok(Json(profile.into_response(&state.public_url)))
}

/// GET /users/{username}/posts?page=&limit=
pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PostPageResponse>> {
    let pagination = Pagination::from_query(&query, USER_POSTS_DEFAULT_LIMIT, MAX_PAGE_LIMIT);
    let viewer = user.id.to_string();

    let (rows, aggregates, total) = run_db(&state, move |db| {
        let owner = db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let page = db.list_posts_by_user(&owner.id, pagination.limit, pagination.offset)?;
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

/// PUT /users/{user_id}: multipart `bio`, `profile_picture`, `remove_picture`.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProfileResponse>> {
    let uid = user_id.to_string();
    let lookup = uid.clone();
    let existing = run_db(&state, move |db| Ok(db.get_user_by_id(&lookup)?))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.id != user_id {
        return Err(ApiError::forbidden("You can only update your own profile"));
    }

    let mut bio: Option<String> = None;
    let mut picture: Option<ImageUpload> = None;
    let mut remove_picture = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "bio" => bio = Some(read_text(field).await?.trim().to_string()),
            "profile_picture" => picture = Some(state.uploads.read_image(field).await?),
            "remove_picture" => remove_picture = read_text(field).await?.trim() == "true",
            _ => continue,
        }
    }

    let new_picture = match &picture {
        Some(image) => Some(state.uploads.save_image("profile", image).await?),
        None => None,
    };

    let bio = match bio {
        Some(b) if b.is_empty() => None,
        Some(b) => Some(b),
        None => existing.bio.clone(),
    };
    let stored_picture = match (&new_picture, remove_picture) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => None,
        (None, false) => existing.profile_picture.clone(),
    };

    let updated = run_db(&state, move |db| {
        if !db.update_profile(&uid, bio.as_deref(), stored_picture.as_deref())? {
            return Err(ApiError::not_found("User not found"));
        }
        let row = db
            .get_user_by_id(&uid)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Profile::load(db, row, &uid)
    })
    .await;

    let profile = match updated {
        Ok(profile) => profile,
        Err(e) => {
            if let Some(path) = &new_picture {
                state.uploads.remove(path).await;
            }
            return Err(e);
        }
    };

    // Old file is only dropped once the row points elsewhere
    if new_picture.is_some() || remove_picture {
        if let Some(old) = &existing.profile_picture {
            state.uploads.remove(old).await;
        }
    }

    info!("{} updated their profile", user.id);
    Ok(Json(profile.into_response(&state.public_url)))
}
