use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::users::repo::StoreError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub developer_message: String,
    pub code: &'static str,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "USR-0000001",
            AppError::Authentication(_) => "USR-0000002",
            AppError::Validation(_) => "USR-0000003",
            AppError::Authorization(_) => "USR-0000004",
            AppError::Conflict(_) => "USR-0000005",
            AppError::Timeout => "SYS-0000002",
            AppError::Internal(_) => "SYS-0000001",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, developer_message) = match self {
            AppError::Validation(m) => ("validation failed".to_string(), m.clone()),
            AppError::Authentication(m) => ("not authorized".to_string(), m.clone()),
            AppError::Authorization(m) => ("forbidden".to_string(), m.clone()),
            AppError::NotFound(m) => ("not found".to_string(), m.clone()),
            AppError::Conflict(m) => ("conflict".to_string(), m.clone()),
            AppError::Timeout => ("request timed out".to_string(), String::new()),
            // store/codec detail stays in the logs
            AppError::Internal(_) => ("internal system error".to_string(), String::new()),
        };
        ErrorBody {
            message,
            developer_message,
            code: self.code(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => AppError::Conflict(what),
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        AppError::Validation(r.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::Validation(r.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        AppError::Validation(r.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
