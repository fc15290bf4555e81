//! fixit-api: REST API server for the fixit facility issue tracker
//!
//! Exposes the [`Tracker`] over HTTP. Callers authenticate with
//! `Authorization: Bearer <token>`; every response uses the same
//! `{success, data | error, code}` envelope.

mod auth;
mod error;
mod handlers;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    Router,
    routing::{get, post},
};
use fixit_core::Tracker;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::BearerToken;
pub use error::ApiError;

/// Shared application state
pub struct AppState {
    tracker: RwLock<Tracker>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Arc<Self> {
        Arc::new(Self {
            tracker: RwLock::new(tracker),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tracker>, ApiError> {
        self.tracker.read().map_err(|_| ApiError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tracker>, ApiError> {
        self.tracker.write().map_err(|_| ApiError::Poisoned)
    }
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code),
        }
    }
}

/// Build the router with CORS and request tracing
pub fn router(state: Arc<AppState>) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me).patch(update_me))
        .route("/auth/password", post(change_password))
        .route("/issues", get(list_issues).post(create_issue))
        .route("/issues/stats", get(issue_stats))
        .route(
            "/issues/{id}",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/issues/{id}/status", post(set_status))
        .route("/issues/{id}/assign", post(assign_issue))
        .route("/issues/{id}/comments", post(add_comment))
        .route("/users", get(list_users))
        .route("/users/stats", get(user_stats))
        .route("/users/search", get(search_staff))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/toggle-status", post(toggle_user_status))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
