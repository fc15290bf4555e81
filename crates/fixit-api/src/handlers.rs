//! Route handlers
//!
//! The caller is resolved before the body or query is inspected, so a
//! missing session is always 401 and a non-admin on an admin route is
//! always 403. Reads take the tracker's read lock, mutations the write
//! lock for the whole call. No handler awaits while holding a guard.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use fixit_core::{
    AdminStats, AuthSession, Filter, Issue, IssueFilter, IssuePatch, Listing, NewIssue,
    ProfilePatch, Registration, User, UserListing, UserStats,
};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResponse, AppState, BearerToken};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Payload<T> = Result<Json<T>, JsonRejection>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

/// Empty `{}` payload for operations with nothing to return
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UsersBody {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct IssueBody {
    pub issue: Issue,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assigned_to: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Query parameters for listing issues; each is a value or `all`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<IssueFilter, fixit_core::Error> {
        Ok(IssueFilter {
            status: parse_filter(&self.status)?,
            category: parse_filter(&self.category)?,
            priority: parse_filter(&self.priority)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Resolve the caller before the request body or query is looked at
fn require_session(state: &AppState, token: &BearerToken) -> Result<(), ApiError> {
    state.read()?.authenticate(token.as_deref())?;
    Ok(())
}

/// Like `require_session`, and the caller must be an admin
fn require_admin(state: &AppState, token: &BearerToken, action: &str) -> Result<(), ApiError> {
    state
        .read()?
        .authenticate(token.as_deref())?
        .require_admin(action)?;
    Ok(())
}

/// Run password hashing or verification off the async workers, with no
/// lock held
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> fixit_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(result?)
}

fn parse_filter<T>(value: &Option<String>) -> Result<Filter<T>, fixit_core::Error>
where
    T: FromStr<Err = fixit_core::Error>,
{
    value.as_deref().unwrap_or_default().parse()
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ----------------------------------------------------------------------
// Authentication
// ----------------------------------------------------------------------

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Payload<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<AuthSession>>), ApiError> {
    let Json(registration) = payload?;
    let draft = state.read()?.prepare_registration(registration)?;
    let hashed = blocking(move || draft.hash()).await?;
    let session = state.write()?.complete_registration(hashed)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(session))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Payload<LoginRequest>,
) -> ApiResult<AuthSession> {
    let Json(req) = payload?;
    let attempt = state.read()?.begin_login(&req.email, &req.password)?;
    let user = blocking(move || attempt.verify()).await?;
    ok(state.write()?.complete_login(user)?)
}

pub async fn logout(State(state): State<Arc<AppState>>, token: BearerToken) -> ApiResult<Empty> {
    state.write()?.logout(token.as_deref());
    ok(Empty {})
}

pub async fn me(State(state): State<Arc<AppState>>, token: BearerToken) -> ApiResult<UserBody> {
    let user = state.read()?.profile(token.as_deref())?;
    ok(UserBody { user })
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    payload: Payload<ProfilePatch>,
) -> ApiResult<UserBody> {
    require_session(&state, &token)?;
    let Json(patch) = payload?;
    let user = state.write()?.update_profile(token.as_deref(), &patch)?;
    ok(UserBody { user })
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    payload: Payload<PasswordRequest>,
) -> ApiResult<Empty> {
    require_session(&state, &token)?;
    let Json(req) = payload?;
    state
        .write()?
        .change_password(token.as_deref(), &req.current_password, &req.new_password)?;
    ok(Empty {})
}

// ----------------------------------------------------------------------
// Issues
// ----------------------------------------------------------------------

pub async fn list_issues(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Listing> {
    require_session(&state, &token)?;
    let Query(query) = query?;
    let filter = query.filter()?;
    ok(state.read()?.list_issues(token.as_deref(), &filter)?)
}

pub async fn issue_stats(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<AdminStats> {
    ok(state.read()?.issue_stats(token.as_deref())?)
}

pub async fn get_issue(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> ApiResult<IssueBody> {
    let issue = state.read()?.get_issue(token.as_deref(), &id)?;
    ok(IssueBody { issue })
}

pub async fn create_issue(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    payload: Payload<NewIssue>,
) -> Result<(StatusCode, Json<ApiResponse<IssueBody>>), ApiError> {
    require_session(&state, &token)?;
    let Json(submission) = payload?;
    let issue = state.write()?.create_issue(token.as_deref(), submission)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(IssueBody { issue }))))
}

pub async fn update_issue(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
    payload: Payload<IssuePatch>,
) -> ApiResult<IssueBody> {
    require_session(&state, &token)?;
    let Json(patch) = payload?;
    let issue = state.write()?.update_issue(token.as_deref(), &id, &patch)?;
    ok(IssueBody { issue })
}

pub async fn delete_issue(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> ApiResult<Empty> {
    state.write()?.delete_issue(token.as_deref(), &id)?;
    ok(Empty {})
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
    payload: Payload<StatusRequest>,
) -> ApiResult<IssueBody> {
    require_admin(&state, &token, "change issue status")?;
    let Json(req) = payload?;
    let issue = state.write()?.set_status(
        token.as_deref(),
        &id,
        &req.status,
        req.comment.as_deref(),
    )?;
    ok(IssueBody { issue })
}

pub async fn assign_issue(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
    payload: Payload<AssignRequest>,
) -> ApiResult<IssueBody> {
    require_admin(&state, &token, "assign issues")?;
    let Json(req) = payload?;
    let issue = state.write()?.assign_issue(
        token.as_deref(),
        &id,
        &req.assigned_to,
        req.comment.as_deref(),
    )?;
    ok(IssueBody { issue })
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
    payload: Payload<CommentRequest>,
) -> ApiResult<IssueBody> {
    require_session(&state, &token)?;
    let Json(req) = payload?;
    let issue = state
        .write()?
        .add_comment(token.as_deref(), &id, &req.content)?;
    ok(IssueBody { issue })
}

// ----------------------------------------------------------------------
// User administration
// ----------------------------------------------------------------------

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    query: Result<Query<RoleQuery>, QueryRejection>,
) -> ApiResult<UserListing> {
    require_admin(&state, &token, "list users")?;
    let Query(query) = query?;
    let role = parse_filter(&query.role)?;
    ok(state.read()?.list_users(token.as_deref(), role)?)
}

pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<UserStats> {
    ok(state.read()?.user_stats(token.as_deref())?)
}

pub async fn search_staff(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<UsersBody> {
    require_admin(&state, &token, "search staff")?;
    let Query(query) = query?;
    let users = state.read()?.search_staff(token.as_deref(), &query.q)?;
    ok(UsersBody { users })
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> ApiResult<UserBody> {
    let user = state.read()?.get_user(token.as_deref(), &id)?;
    ok(UserBody { user })
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
    payload: Payload<ProfilePatch>,
) -> ApiResult<UserBody> {
    require_admin(&state, &token, "update users")?;
    let Json(patch) = payload?;
    let user = state.write()?.update_user(token.as_deref(), &id, &patch)?;
    ok(UserBody { user })
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> ApiResult<Empty> {
    state.write()?.delete_user(token.as_deref(), &id)?;
    ok(Empty {})
}

pub async fn toggle_user_status(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> ApiResult<UserBody> {
    let user = state.write()?.toggle_user_status(token.as_deref(), &id)?;
    ok(UserBody { user })
}
