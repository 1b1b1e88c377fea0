use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use chrono::TimeDelta;
use legitrack_store::lock;
use tracing::info;

use crate::auth::{bearer_token, generate_token, hash_password, hash_token, now, verify_password};
use crate::error::ApiError;
use crate::models::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::state::AppState;

/// Longest accepted username or email, in characters.
const MAX_FIELD_CHARS: usize = 150;

/// `POST /auth/register`.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    let email = payload.email.trim();
    if username.is_empty() || email.is_empty() || payload.password.trim().is_empty() {
        return Err(ApiError::bad_request(
            "username, email and password required",
        ));
    }
    if username.chars().count() > MAX_FIELD_CHARS || email.chars().count() > MAX_FIELD_CHARS {
        return Err(ApiError::bad_request(format!(
            "username and email must be at most {MAX_FIELD_CHARS} characters"
        )));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("invalid email"));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = lock(&state.store)?.create_user(username, email, &password_hash, now())?;
    info!(user = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

/// `POST /auth/login`. `username` may also be the account's email.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let login = payload.username.trim();
    if login.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("username and password required"));
    }

    let user = lock(&state.store)?
        .find_user_by_login(login)?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;
    if !verify_password(&user.password_hash, &payload.password) {
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let ttl = TimeDelta::from_std(state.token_ttl)
        .map_err(|e| ApiError::internal(format!("token lifetime out of range: {e}")))?;
    let token = generate_token();
    let issued = now();
    let expires_at = issued
        .checked_add_signed(ttl)
        .ok_or_else(|| ApiError::internal("token lifetime out of range"))?;
    {
        let store = lock(&state.store)?;
        store.purge_expired_tokens(issued)?;
        store.insert_token(user.id, &hash_token(&token), expires_at, issued)?;
    }
    info!(user = user.id, "token issued");

    Ok(Json(TokenResponse {
        token,
        token_type: "bearer".to_string(),
        expires_in: state.token_ttl.as_secs(),
    }))
}

/// `POST /auth/logout`. Revoking an unknown token is not an error.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;
    lock(&state.store)?.delete_token(&hash_token(&token))?;
    Ok(StatusCode::NO_CONTENT)
}
