use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::policy::{authorize, can_see, Action, Principal};
use crate::state::AppState;
use crate::store::engagement::{self, LikeToggle};
use crate::store::posts::{self, NewPost, PostChanges, PostFilter, Scope};
use crate::store::{comments, moderation, Page, Paged};
use crate::threading::CommentNode;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/draft", post(create_draft))
        .route("/posts/search", get(search_posts))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/view", post(record_view))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/hide", post(hide_post))
        .route("/posts/{id}/unhide", post(unhide_post))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/posts/{id}/comments/{parent_id}/reply", post(reply))
        .route("/posts/{id}/comments/{parent_id}/replies", post(reply))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Body for create and update. Tags may be a JSON array or a comma string.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub category: Option<String>,
    pub published: Option<bool>,
}

impl PostRequest {
    fn into_new_post(self, published: bool) -> NewPost {
        NewPost {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            tags: self.tags.as_ref().map(posts::parse_tags).unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            published,
        }
    }

    fn into_changes(self) -> PostChanges {
        PostChanges {
            tags: self.tags.as_ref().map(posts::parse_tags),
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            image_url: self.image_url,
            category: self.category,
            published: self.published,
        }
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
    pub parent: Option<String>,
}

fn filter_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve a post the caller is allowed to see. Invisible posts are a 404 so
/// drafts and hidden posts do not leak their existence.
pub(crate) fn visible_post(
    conn: &rusqlite::Connection,
    id_or_slug: &str,
    viewer: Option<Principal<'_>>,
) -> AppResult<Post> {
    let post = posts::get(conn, id_or_slug)?;
    if !can_see(viewer, &post.author, post.published && !post.hidden) {
        return Err(AppError::not_found("Post"));
    }
    Ok(post)
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paged<Post>>> {
    let filter = PostFilter {
        category: filter_empty(query.category),
        tag: filter_empty(query.tag),
        author: filter_empty(query.author),
        scope: Scope::Public,
    };
    let conn = state.db.get()?;
    let page = posts::list(&conn, &filter, Page::new(query.page, query.limit))?;
    Ok(Json(page))
}

async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Paged<Post>>> {
    let q = query.q.unwrap_or_default();
    let conn = state.db.get()?;
    let page = posts::search(&conn, &q, Scope::Public, Page::new(query.page, query.limit))?;
    Ok(Json(page))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    authorize(Some(user.principal()), Action::Author)?;
    let published = req.published.unwrap_or(false);
    let conn = state.db.get()?;
    let post = posts::create(&conn, &user.id, req.into_new_post(published))?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn create_draft(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    authorize(Some(user.principal()), Action::Author)?;
    let conn = state.db.get()?;
    let post = posts::create(&conn, &user.id, req.into_new_post(false))?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Reading a post counts as a view. A failed increment is logged and the
/// read still succeeds.
async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    authorize(viewer.principal(), Action::Read)?;
    let conn = state.db.get()?;
    let mut post = visible_post(&conn, &id, viewer.principal())?;

    match posts::record_view(&conn, &post.id) {
        Ok(views) => post.views = views,
        Err(e) => tracing::warn!(post_id = %post.id, "Failed to record view: {}", e),
    }
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<PostRequest>,
) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    let post = posts::get(&conn, &id)?;
    authorize(Some(user.principal()), Action::Manage { owner_id: &post.author })?;
    let updated = posts::update(&conn, &post.id, req.into_changes())?;
    Ok(Json(updated))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let post = posts::get(&conn, &id)?;
    authorize(Some(user.principal()), Action::Manage { owner_id: &post.author })?;
    posts::delete(&conn, &post.id)?;
    Ok(Json(json!({ "message": "Post deleted" })))
}

async fn record_view(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    authorize(viewer.principal(), Action::RecordView)?;
    let conn = state.db.get()?;
    let post = visible_post(&conn, &id, viewer.principal())?;
    let views = posts::record_view(&conn, &post.id)?;
    Ok(Json(json!({ "views": views })))
}

async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeToggle>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let mut conn = state.db.get()?;
    let post = visible_post(&conn, &id, Some(user.principal()))?;
    let toggle = engagement::toggle_post_like(&mut conn, &post.id, &user.id)?;
    Ok(Json(toggle))
}

fn set_hidden(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
    hidden: bool,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let post = posts::get(&conn, id)?;
    authorize(Some(user.principal()), Action::Manage { owner_id: &post.author })?;
    moderation::set_post_hidden(&conn, &post.id, hidden)?;
    let message = if hidden { "Post hidden" } else { "Post unhidden" };
    Ok(Json(json!({ "message": message })))
}

async fn hide_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    set_hidden(&state, &user, &id, true)
}

async fn unhide_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    set_hidden(&state, &user, &id, false)
}

async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentNode<Comment>>>> {
    authorize(viewer.principal(), Action::Read)?;
    let conn = state.db.get()?;
    let post = visible_post(&conn, &id, viewer.principal())?;
    Ok(Json(comments::thread_for_post(&conn, &post.id)?))
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    authorize(Some(user.principal()), Action::Engage)?;
    let conn = state.db.get()?;
    let post = visible_post(&conn, &id, Some(user.principal()))?;
    let comment = comments::add(
        &conn,
        &post.id,
        &user.id,
        req.content.as_deref().unwrap_or_default(),
        req.parent.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn reply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, parent_id)): Path<(String, String)>,
    Json(req): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    authorize(Some(user.principal()), Action::Engage)?;
    let conn = state.db.get()?;
    let post = visible_post(&conn, &id, Some(user.principal()))?;
    let comment = comments::add(
        &conn,
        &post.id,
        &user.id,
        req.content.as_deref().unwrap_or_default(),
        Some(&parent_id),
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}
