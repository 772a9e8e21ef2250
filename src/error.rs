use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User already exists")]
    DuplicateUser,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("stored password digest is malformed")]
    MalformedDigest,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Missing or invalid Authorization header")]
    MissingToken,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Image storage is not configured")]
    StorageDisabled,

    #[error("credential store unavailable")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateUser | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::BadSignature
            | AppError::MalformedToken
            | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::StorageDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MalformedDigest | AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                AppError::StoreUnavailable(e) => error!(error = %e, "store failure"),
                AppError::Internal(e) => error!(error = ?e, "internal failure"),
                other => error!(error = %other, "server fault"),
            }
            // Keep internals out of the response body.
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Checks that a required request field is present and not blank.
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_boundary_contract() {
        assert_eq!(AppError::DuplicateUser.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::BadSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::MalformedDigest.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::StoreUnavailable(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::StorageDisabled.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("email", "a@b.c").is_ok());
        let err = require("email", "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "email is required"));
    }
}
