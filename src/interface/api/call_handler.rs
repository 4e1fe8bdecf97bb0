//! Call session handlers

use axum::{extract::State, Json};
use tracing::info;

use super::dto::{ApiResponse, CallSessionResponse, ChannelTokenRequest, InitiateCallRequest};
use super::error::{ApiError, ApiResult};
use super::identity::CurrentUser;
use super::metrics_handler::{record_call_initiated, record_credential_failure};
use super::state::AppState;
use crate::domain::call::{CallType, ChannelCredential};
use crate::domain::shared::DomainError;

/// Start a call with a friend
pub async fn initiate_call(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<InitiateCallRequest>,
) -> ApiResult<Json<ApiResponse<CallSessionResponse>>> {
    let call_type = match req.call_type.as_deref() {
        Some(raw) => raw.parse::<CallType>()?,
        None => CallType::default(),
    };
    info!("API: {} call {} -> {}", call_type, caller, req.recipient_id);

    let session = state
        .calls
        .initiate(&caller, &req.recipient_id, call_type)
        .await
        .map_err(track_signer_failure)?;
    record_call_initiated(call_type.as_str());
    Ok(Json(ApiResponse::success(session.into())))
}

/// Credential for a named channel
pub async fn channel_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChannelTokenRequest>,
) -> ApiResult<Json<ApiResponse<ChannelCredential>>> {
    let credential = state
        .calls
        .channel_credential(&user, &req.channel_name, req.role)
        .await
        .map_err(track_signer_failure)?;
    Ok(Json(ApiResponse::success(credential)))
}

fn track_signer_failure(e: DomainError) -> ApiError {
    if matches!(e, DomainError::Unavailable(_)) {
        record_credential_failure();
    }
    ApiError(e)
}
