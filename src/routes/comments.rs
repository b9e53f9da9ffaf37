use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::{authorize, Action};
use crate::routes::posts::visible_post;
use crate::state::AppState;
use crate::store::engagement::{self, LikeToggle};
use crate::store::{comments, moderation};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/comments/{id}/like", post(like_comment))
        .route("/comments/{id}/hide", post(hide_comment))
        .route("/comments/{id}/unhide", post(unhide_comment))
}

#[derive(Deserialize)]
pub struct NewCommentRequest {
    pub post: Option<String>,
    pub content: Option<String>,
    pub parent: Option<String>,
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    authorize(Some(user.principal()), Action::Engage)?;
    let post_id = req
        .post
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Post is required"))?;

    let conn = state.db.get()?;
    let post = visible_post(&conn, post_id, Some(user.principal()))?;
    let comment = comments::add(
        &conn,
        &post.id,
        &user.id,
        req.content.as_deref().unwrap_or_default(),
        req.parent.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Replies to the deleted comment are left in place.
async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let comment = comments::get(&conn, &id)?;
    authorize(
        Some(user.principal()),
        Action::Manage {
            owner_id: &comment.author,
        },
    )?;
    comments::delete(&conn, &comment.id)?;
    Ok(Json(json!({ "message": "Comment deleted" })))
}

async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeToggle>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let mut conn = state.db.get()?;
    Ok(Json(engagement::toggle_comment_like(&mut conn, &id, &user.id)?))
}

fn set_hidden(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
    hidden: bool,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let comment = comments::get(&conn, id)?;
    authorize(
        Some(user.principal()),
        Action::Manage {
            owner_id: &comment.author,
        },
    )?;
    moderation::set_comment_hidden(&conn, &comment.id, hidden)?;
    let message = if hidden {
        "Comment hidden"
    } else {
        "Comment unhidden"
    };
    Ok(Json(json!({ "message": message })))
}

async fn hide_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    set_hidden(&state, &user, &id, true)
}

async fn unhide_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    set_hidden(&state, &user, &id, false)
}
