//! Mapping from tracker errors to HTTP responses

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] fixit_core::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("tracker state is unavailable")]
    Poisoned,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use fixit_core::Error as E;
        match self {
            ApiError::Core(e) => match e {
                E::Unauthenticated | E::InvalidCredentials => StatusCode::UNAUTHORIZED,
                E::Forbidden(_) => StatusCode::FORBIDDEN,
                E::NotFound { .. } => StatusCode::NOT_FOUND,
                E::DuplicateEmail(_) | E::AlreadyExists(_) => StatusCode::CONFLICT,
                E::InvalidStatus(_) | E::Validation(_) => StatusCode::BAD_REQUEST,
                E::Crypto(_) | E::Io(_) | E::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Poisoned | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.code(),
            ApiError::BadRequest(_) => "validation_error",
            ApiError::Poisoned | ApiError::Internal(_) => "internal",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiResponse::<()>::err(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}
