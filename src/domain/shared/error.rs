//! Domain errors

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable kind, used by the HTTP layer
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Unavailable(_) => "unavailable",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::ValidationError(_) => "validation",
            DomainError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            DomainError::NotFound("x".into()),
            DomainError::Conflict("x".into()),
            DomainError::Forbidden("x".into()),
            DomainError::Unavailable("x".into()),
            DomainError::Unauthorized("x".into()),
            DomainError::ValidationError("x".into()),
            DomainError::Internal("x".into()),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::Forbidden("users are not friends".to_string());
        assert_eq!(err.to_string(), "Forbidden: users are not friends");
    }
}
