//! Account and profile handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::dto::{
    ApiResponse, HandleAvailability, HealthResponse, LoginRequest, SignupRequest, UserResponse,
};
use super::error::ApiResult;
use super::identity::CurrentUser;
use super::state::AppState;
use crate::domain::shared::UserId;

/// Health check endpoint
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Register a new user
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    info!("API: Signup for handle {}", req.handle);
    let user = state.users.signup(req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

pub async fn check_handle(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<ApiResponse<HandleAvailability>>> {
    let available = state.users.handle_available(&handle).await?;
    Ok(Json(ApiResponse::success(HandleAvailability {
        handle,
        available,
    })))
}

/// Get a user's public profile
pub async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users.get(&UserId::new(id)).await?;
    Ok(Json(ApiResponse::success(user.into())))
}
