use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use food_types::domain::order::InvalidTransition;
use food_types::ports::order_repository::RepoError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A domain rule rejected the operation; retrying will not help.
    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    InUse(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        AppError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::InUse(what) => AppError::InUse(format!("{what} is in use and cannot be removed")),
            RepoError::Conflict(msg) | RepoError::Duplicate(msg) => AppError::BusinessRule(msg),
            RepoError::DbError(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<InvalidTransition> for AppError {
    fn from(e: InvalidTransition) -> Self {
        AppError::BusinessRule(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BusinessRule(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::InUse(m) => (StatusCode::CONFLICT, m.clone()),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };

        let body = serde_json::to_string(&ErrorBody { error: msg })
            .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}
