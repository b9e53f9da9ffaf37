//! Admin-only surfaces. Every handler checks `Action::Administer` before it
//! touches the store.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Comment, ContactMessage, Notification, Post, Role, User};
use crate::error::{AppError, AppResult};
use crate::export::{self, ExportAnalytics, ExportData, ExportFormat};
use crate::extractors::CurrentUser;
use crate::policy::{authorize, Action};
use crate::state::AppState;
use crate::store::analytics::{self, Analytics, DashboardStats, DEFAULT_RANGE_DAYS};
use crate::store::{comments, messages, moderation, posts, users};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/users/{id}/role", put(set_role))
        .route("/admin/posts", get(list_posts))
        .route("/admin/posts/{id}/hide", post(hide_post))
        .route("/admin/posts/{id}/unhide", post(unhide_post))
        .route("/admin/comments", get(list_comments))
        .route("/admin/comments/{id}/hide", post(hide_comment))
        .route("/admin/comments/{id}/unhide", post(unhide_comment))
        .route("/admin/dashboard/stats", get(dashboard_stats))
        .route("/admin/analytics", get(analytics))
        .route("/admin/messages", get(list_messages))
        .route("/admin/messages/{id}/read", put(mark_message_read))
        .route("/admin/messages/{id}", delete(delete_message))
        .route("/admin/notifications", get(notifications))
        .route("/admin/export", post(export_data))
}

fn require_admin(user: &CurrentUser) -> AppResult<()> {
    authorize(Some(user.principal()), Action::Administer)
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub time_range: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    pub format: Option<String>,
    pub include_posts: bool,
    pub include_comments: bool,
    pub include_analytics: bool,
}

// -- Accounts --

async fn list_users(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Vec<User>>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(users::list_all(&conn)?))
}

async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;
    if id == user.id {
        return Err(AppError::validation("You cannot delete your own account"));
    }
    let mut conn = state.db.get()?;
    let report = moderation::delete_user_cascade(&mut conn, &id)?;
    Ok(Json(json!({
        "message": "User and related content deleted",
        "deleted": report,
    })))
}

async fn set_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> AppResult<Json<User>> {
    require_admin(&user)?;
    let role: Role = req
        .role
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| AppError::validation("Role must be one of admin, writer, user"))?;
    let conn = state.db.get()?;
    Ok(Json(users::set_role(&conn, &id, role)?))
}

// -- Content moderation --

async fn list_posts(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Vec<Post>>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(posts::all(&conn)?))
}

fn set_post_hidden(state: &AppState, user: &CurrentUser, id: &str, hidden: bool) -> AppResult<Json<Post>> {
    require_admin(user)?;
    let conn = state.db.get()?;
    let post = posts::get(&conn, id)?;
    moderation::set_post_hidden(&conn, &post.id, hidden)?;
    Ok(Json(posts::get(&conn, &post.id)?))
}

async fn hide_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    set_post_hidden(&state, &user, &id, true)
}

async fn unhide_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    set_post_hidden(&state, &user, &id, false)
}

async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Comment>>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(comments::all(&conn)?))
}

fn set_comment_hidden(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
    hidden: bool,
) -> AppResult<Json<Comment>> {
    require_admin(user)?;
    let conn = state.db.get()?;
    moderation::set_comment_hidden(&conn, id, hidden)?;
    Ok(Json(comments::get(&conn, id)?))
}

async fn hide_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Comment>> {
    set_comment_hidden(&state, &user, &id, true)
}

async fn unhide_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Comment>> {
    set_comment_hidden(&state, &user, &id, false)
}

// -- Dashboard --

async fn dashboard_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<DashboardStats>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(analytics::dashboard_stats(&conn)?))
}

/// `timeRange` is a number of days; anything unparsable means the default.
async fn analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Analytics>> {
    require_admin(&user)?;
    let days = query
        .time_range
        .as_deref()
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(DEFAULT_RANGE_DAYS);
    let conn = state.db.get()?;
    Ok(Json(analytics::analytics(&conn, days)?))
}

// -- Messages --

async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<ContactMessage>>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(messages::list(&conn)?))
}

async fn mark_message_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ContactMessage>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(messages::mark_read(&conn, &id)?))
}

async fn delete_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    messages::delete(&conn, &id)?;
    Ok(Json(json!({ "message": "Message deleted" })))
}

async fn notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    require_admin(&user)?;
    let conn = state.db.get()?;
    Ok(Json(messages::notifications(&conn, &user.id)?))
}

// -- Export --

async fn export_data(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ExportRequest>,
) -> AppResult<Response> {
    require_admin(&user)?;
    let format = ExportFormat::parse(req.format.as_deref());

    let data = {
        let conn = state.db.get()?;
        ExportData {
            posts: req.include_posts.then(|| posts::all(&conn)).transpose()?,
            comments: req.include_comments.then(|| comments::all(&conn)).transpose()?,
            analytics: req
                .include_analytics
                .then(|| analytics::total_views(&conn))
                .transpose()?
                .map(|total_views| ExportAnalytics { total_views }),
        }
    };
    let body = export::render(&data, format)?;
    tracing::info!(format = format.extension(), bytes = body.len(), "Exported site data");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format.content_disposition()),
        ],
        body,
    )
        .into_response())
}
