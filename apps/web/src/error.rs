//! Error types for the web API.
//!
//! ## Status Mapping
//! ```text
//! AppError::Validation       → 400  VALIDATION_ERROR
//! AppError::Unauthenticated  → 401  UNAUTHENTICATED
//! AppError::Forbidden        → 403  FORBIDDEN
//! AppError::NotFound         → 404  NOT_FOUND
//! AppError::Conflict         → 409  CONFLICT
//! AppError::Internal         → 500  INTERNAL_ERROR   (details logged only)
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lacteos_core::{CoreError, ValidationError};
use lacteos_db::DbError;
use tracing::error;

use crate::response::ApiResponse;

pub const LOGIN_REQUIRED: &str = "You must log in to access this page.";
pub const PERMISSION_DENIED: &str = "You do not have permission to access this page.";
pub const ADMIN_ONLY: &str = "Only administrators can access this page.";

/// Web API errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn login_required() -> Self {
        AppError::Unauthenticated(LOGIN_REQUIRED.to_string())
    }

    pub fn permission_denied() -> Self {
        AppError::Forbidden(PERMISSION_DENIED.to_string())
    }

    pub fn admin_only() -> Self {
        AppError::Forbidden(ADMIN_ONLY.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()>::error(self.code(), message);
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductInUse(_) => AppError::Conflict(err.to_string()),
            CoreError::Validation(inner) => inner.into(),
            CoreError::InsufficientStock { .. }
            | CoreError::EmptyPurchase
            | CoreError::NoValidItems
            | CoreError::AmountOverflow => AppError::Validation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => AppError::NotFound(format!("{} not found", entity)),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                AppError::Conflict(err.to_string())
            }
            DbError::Domain(core) => core.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}
