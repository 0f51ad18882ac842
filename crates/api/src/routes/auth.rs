use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use careercompass_db::models::{User, UserRole};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub avatar: Option<String>,
}

fn to_user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        email: user.email,
        display_name: user.display_name,
        role: user.role,
        avatar: user.avatar,
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<serde_json::Value>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let role = body.role.unwrap_or_default();
    if role == UserRole::Admin {
        return Err(ApiError::BadRequest(
            "Cannot self-register as admin".to_string(),
        ));
    }

    let password_hash = state.auth.hash_password(&body.password)?;
    let user = state
        .users
        .create(body.email.clone(), body.display_name.clone(), password_hash, role)
        .await
        .map_err(|e| match e {
            careercompass_services::dao::base::DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Email already registered".to_string())
            }
            other => other.into(),
        })?;

    let user_id = user.id.expect("persisted user has an id");
    let tokens = state.auth.generate_tokens(user_id, &user.email, user.role)?;

    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    headers.insert(header::SET_COOKIE, cookie.parse().unwrap());

    let response = serde_json::json!({
        "success": true,
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "expires_in": tokens.expires_in,
        "user": to_user_response(user),
    });

    Ok((StatusCode::CREATED, headers, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("No password set".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user.id.expect("persisted user has an id");
    let tokens = state.auth.generate_tokens(user_id, &user.email, user.role)?;

    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    headers.insert(header::SET_COOKIE, cookie.parse().unwrap());

    let response = serde_json::json!({
        "success": true,
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "expires_in": tokens.expires_in,
        "user": to_user_response(user),
    });

    Ok((headers, Json(response)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;
    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

    let user = state.users.find_by_id(user_id).await?;
    let tokens = state.auth.generate_tokens(user_id, &user.email, user.role)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "expires_in": tokens.expires_in,
    })))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state.users.find_by_id(auth.user_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "user": to_user_response(user),
    })))
}
