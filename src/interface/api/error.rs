//! Mapping of domain errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use super::dto::ApiResponse;
use crate::domain::shared::DomainError;

/// Handler error: a domain error rendered as a JSON envelope
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API: {}", self.0);
        } else {
            debug!("API: {}", self.0);
        }

        let message = match &self.0 {
            // Driver details stay in the log
            DomainError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        let body: ApiResponse<()> = ApiResponse::error(message, self.0.kind());
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
