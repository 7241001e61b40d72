use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{hash_password, validate_registration, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::ACCESS_TOKEN_COOKIE;

use super::super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
}

/// Creates a new user account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    validate_registration(&request.username, &request.email, &request.password)?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .create(&request.username, &request.email, &password_hash)
        .await?;

    tracing::info!(username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }),
    ))
}

/// Verifies credentials and issues an access token.
///
/// The token is returned in the body for bearer clients and set as an
/// HttpOnly cookie for browsers. Unknown username and wrong password are the
/// same failure.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let user = state
        .users
        .by_username(&request.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    verify_password(&request.password, &user.password_hash)?;

    let token = state.signer.issue(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&token, state.signer.ttl_secs())?,
    );

    tracing::info!(username = %user.username, "User logged in");

    Ok((
        headers,
        Json(LoginResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            username: user.username,
        }),
    ))
}

/// Tells the client to discard its credential.
///
/// Tokens are stateless, so this only clears the cookie; there is no
/// server-side revocation list.
pub async fn logout() -> AppResult<(HeaderMap, Json<Value>)> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0)?);

    Ok((headers, Json(json!({ "message": "Logged out" }))))
}

fn session_cookie(token: &str, max_age: i64) -> AppResult<HeaderValue> {
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ACCESS_TOKEN_COOKIE, token, max_age
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("Invalid cookie header: {}", e)))
}
