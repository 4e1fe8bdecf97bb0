//! Caller identity forwarded by the upstream gateway

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;
use crate::domain::shared::{DomainError, UserId};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| CurrentUser(UserId::new(id)))
            .ok_or_else(|| {
                ApiError(DomainError::Unauthorized(format!(
                    "missing {} header",
                    USER_ID_HEADER
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CurrentUser, ApiError> {
        let (mut parts, _) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_identity() {
        let request = Request::builder()
            .header(USER_ID_HEADER, " u1 ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), CurrentUser(UserId::new("u1")));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        let err = extract(request).await.unwrap_err();
        assert!(matches!(err.0, DomainError::Unauthorized(_)));

        let request = Request::builder()
            .header(USER_ID_HEADER, "")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }
}
