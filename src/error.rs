use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::ApiResponse;

/// Coarse classification the HTTP layer branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    InvalidArgument,
    UpstreamError,
    Unauthenticated,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Owner not found")]
    OwnerNotFound,

    #[error("Record {0} already exists")]
    AlreadyExists(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is still in use")]
    InUse(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unknown field `{field}` on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("Field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("Unsupported condition `{0}`")]
    InvalidCondition(String),

    #[error("Invalid product {0}")]
    InvalidProduct(Uuid),

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) | AppError::OwnerNotFound => ErrorKind::NotFound,
            AppError::AlreadyExists(_) | AppError::Conflict(_) | AppError::InUse(_) => {
                ErrorKind::Conflict
            }
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::BadRequest(_)
            | AppError::UnknownField { .. }
            | AppError::TypeMismatch { .. }
            | AppError::InvalidCondition(_)
            | AppError::InvalidProduct(_)
            | AppError::InvalidAddress => ErrorKind::InvalidArgument,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => {
                ErrorKind::Unauthenticated
            }
            AppError::Upstream(_) => ErrorKind::UpstreamError,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Upstream and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Upstream(_) => "Upstream service error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Upstream(detail) => tracing::warn!(detail = %detail, "upstream failure"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal failure"),
            _ => {}
        }

        let message = self.public_message();
        let body = ApiResponse::new(
            message.clone(),
            Some(ErrorData {
                error: message,
                kind: self.kind(),
            }),
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(AppError::NotFound("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("Email is already taken".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InUse("Category".into()).kind(), ErrorKind::Conflict);
        assert_eq!(AppError::InvalidAddress.kind(), ErrorKind::InvalidArgument);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_detail_is_not_exposed() {
        let err = AppError::Upstream("card_declined: raw provider payload".into());
        assert_eq!(err.public_message(), "Upstream service error");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn response_body_carries_kind() {
        let response = AppError::InUse("Category clothes".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Category clothes is still in use");
        assert_eq!(body["data"]["kind"], "conflict");
    }
}
