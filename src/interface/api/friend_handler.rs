//! Friend graph handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::dto::{
    ApiResponse, FriendRequestBody, FriendRequestResponse, FriendStatusResponse, UserResponse,
};
use super::error::ApiResult;
use super::identity::CurrentUser;
use super::metrics_handler::record_friend_request;
use super::state::AppState;
use crate::domain::friendship::PendingRequests;
use crate::domain::shared::UserId;

pub async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let friends = state.friendships.list_friends(&user).await?;
    Ok(Json(ApiResponse::success(
        friends.into_iter().map(UserResponse::from).collect(),
    )))
}

pub async fn friend_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(other): Path<String>,
) -> ApiResult<Json<ApiResponse<FriendStatusResponse>>> {
    let other = UserId::new(other);
    let status = state.friendships.status(&user, &other).await?;
    Ok(Json(ApiResponse::success(FriendStatusResponse {
        user_id: other,
        status,
    })))
}

pub async fn list_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ApiResponse<PendingRequests>>> {
    let requests = state.friendships.list_requests(&user).await?;
    Ok(Json(ApiResponse::success(requests)))
}

/// Send a friend request; answers `now_friends` on a reciprocal request
pub async fn send_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<FriendRequestBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<FriendRequestResponse>>)> {
    info!("API: Friend request {} -> {}", user, req.to_user_id);
    let outcome = state.friendships.request(&user, &req.to_user_id).await?;
    record_friend_request(outcome.as_str());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FriendRequestResponse { outcome })),
    ))
}

pub async fn accept_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(requester): Path<String>,
) -> ApiResult<Json<ApiResponse<FriendStatusResponse>>> {
    let requester = UserId::new(requester);
    state.friendships.accept(&user, &requester).await?;
    let status = state.friendships.status(&user, &requester).await?;
    Ok(Json(ApiResponse::success(FriendStatusResponse {
        user_id: requester,
        status,
    })))
}

pub async fn reject_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(requester): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .friendships
        .reject(&user, &UserId::new(requester))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(to): Path<String>,
) -> ApiResult<StatusCode> {
    state.friendships.cancel(&user, &UserId::new(to)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unfriend; succeeds whether or not the friendship existed
pub async fn remove_friend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(other): Path<String>,
) -> ApiResult<StatusCode> {
    state.friendships.remove(&user, &UserId::new(other)).await?;
    Ok(StatusCode::NO_CONTENT)
}
