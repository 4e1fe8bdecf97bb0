//! Direct message handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::dto::{
    ApiResponse, ListMessagesQuery, ListThreadsQuery, MarkReadRequest, MarkReadResponse,
    OpenThreadRequest, ThreadResponse,
};
use super::error::ApiResult;
use super::identity::CurrentUser;
use super::metrics_handler::record_dm_message;
use super::state::AppState;
use crate::domain::messaging::{DmMessage, MessageContent, MessagePage, PageRequest, ThreadSummary};
use crate::domain::shared::ThreadId;

pub async fn list_threads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ThreadSummary>>>> {
    let threads = state
        .messaging
        .list_threads(&user, query.offset, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(threads)))
}

/// Open (or reopen) the thread with a peer
pub async fn open_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<OpenThreadRequest>,
) -> ApiResult<Json<ApiResponse<ThreadResponse>>> {
    let thread = state
        .messaging
        .get_or_create_thread(&user, &req.peer_user_id)
        .await?;
    Ok(Json(ApiResponse::success(thread.into())))
}

pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ApiResponse<MessagePage>>> {
    let page = PageRequest {
        cursor: query.cursor,
        limit: query.limit,
    };
    let messages = state
        .messaging
        .list_messages(&ThreadId::from_uuid(thread_id), &user, &page)
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<Uuid>,
    Json(content): Json<MessageContent>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DmMessage>>)> {
    let message = state
        .messaging
        .append_message(&ThreadId::from_uuid(thread_id), &user, content)
        .await?;
    record_dm_message();
    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> ApiResult<Json<ApiResponse<MarkReadResponse>>> {
    let thread_id = ThreadId::from_uuid(thread_id);
    let up_to_seq = state
        .messaging
        .mark_read(&thread_id, &user, &req.last_read_message_id)
        .await?;
    Ok(Json(ApiResponse::success(MarkReadResponse {
        thread_id,
        up_to_seq,
    })))
}
