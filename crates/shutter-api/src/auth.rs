use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use shutter_db::Database;
use shutter_types::api::{
    AccountUser, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::render::parse_uuid;
use crate::run_db;
use crate::uploads::UploadStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub uploads: UploadStore,
    /// Prefix that turns stored `/uploads/...` paths into absolute URLs.
    pub public_url: String,
}

const MIN_PASSWORD_LEN: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username, email, and password are required"));
    }
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Err(ApiError::bad_request("Username must be between 3 and 32 characters"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password must be at least 6 characters long"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    let user_id = Uuid::new_v4();
    let password = req.password;
    let (name, mail) = (username.clone(), email.clone());

    run_db(&state, move |db| {
        if db.get_user_by_username(&name)?.is_some() {
            return Err(ApiError::conflict("Username already taken"));
        }
        if db.get_user_by_email(&mail)?.is_some() {
            return Err(ApiError::conflict("Email already registered"));
        }

        // Hash with Argon2id (CPU-bound, stays off the async threads)
        let password_hash = hash_password(&password)?;
        db.create_user(&user_id.to_string(), &name, &mail, &password_hash)?;
        Ok(())
    })
    .await?;

    info!("Registered user {} ({})", username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered".into(),
            user: AccountUser {
                user_id,
                username,
                email,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let password = req.password;
    let (user, token) = run_db(&state, move |db| {
        let user = db
            .get_user_by_email(&email)?
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

        if !verify_password(&password, &user.password)? {
            return Err(ApiError::unauthorized("Invalid email or password"));
        }

        // One session per user: the new token replaces any earlier one
        let token = Uuid::new_v4().to_string();
        db.replace_session(&user.id, &token)?;
        Ok((user, token))
    })
    .await?;

    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        message: "Login success".into(),
        token,
        user: AccountUser {
            user_id: parse_uuid(&user.id, "user id"),
            username: user.username,
            email: user.email,
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let token = user.token.clone();
    run_db(&state, move |db| Ok(db.delete_session(&token)?)).await?;

    info!("User {} logged out", user.username);
    Ok(Json(MessageResponse::new("Logged out")))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
