use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Comment, Post, User};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::policy::{authorize, can_see, Action};
use crate::routes::posts::visible_post;
use crate::state::AppState;
use crate::store::engagement::{self, BookmarkToggle, LikeToggle};
use crate::store::posts::{self, Scope};
use crate::store::users::{self, ProfileChanges};
use crate::store::comments;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me).put(update_me))
        .route("/users/me/bookmarks", get(my_bookmarks))
        .route("/users/me/bookmarks/{post_id}", post(toggle_bookmark))
        .route("/users/me/likes", get(my_likes))
        .route("/users/me/likes/{post_id}", post(toggle_like))
        .route("/users/me/posts", get(my_posts))
        .route("/users/me/comments", get(my_comments))
        .route("/users/{id}", get(profile))
        .route("/users/{id}/posts", get(user_posts))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(users::get(&conn, &user.id)?))
}

async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProfileRequest>,
) -> AppResult<Json<serde_json::Value>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let conn = state.db.get()?;
    let updated = users::update_profile(
        &conn,
        &user.id,
        ProfileChanges {
            username: req.username,
            bio: req.bio,
            profile_picture: req.profile_picture,
        },
    )?;
    Ok(Json(json!({ "message": "Profile updated", "user": updated })))
}

async fn profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(users::get(&conn, &id)?))
}

/// Drop posts that went private since the user engaged with them.
fn still_visible(user: &CurrentUser, posts: Vec<Post>) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|p| can_see(Some(user.principal()), &p.author, p.published && !p.hidden))
        .collect()
}

async fn my_bookmarks(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let posts = posts::bookmarked_by(&conn, &user.id)?;
    Ok(Json(still_visible(&user, posts)))
}

async fn toggle_bookmark(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<BookmarkToggle>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let mut conn = state.db.get()?;
    let post = visible_post(&conn, &post_id, Some(user.principal()))?;
    Ok(Json(engagement::toggle_bookmark(&mut conn, &user.id, &post.id)?))
}

async fn my_likes(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let posts = posts::liked_by(&conn, &user.id)?;
    Ok(Json(still_visible(&user, posts)))
}

async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<LikeToggle>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let mut conn = state.db.get()?;
    let post = visible_post(&conn, &post_id, Some(user.principal()))?;
    Ok(Json(engagement::toggle_post_like(&mut conn, &post.id, &user.id)?))
}

async fn my_posts(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::by_author(&conn, &user.id, Scope::Everything)?))
}

async fn my_comments(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::by_author(&conn, &user.id)?))
}

/// Someone's posts. Owners and admins also see drafts and hidden posts.
async fn user_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    let scope = if can_see(viewer.principal(), &id, false) {
        Scope::Everything
    } else {
        Scope::Public
    };
    let conn = state.db.get()?;
    users::get(&conn, &id)?;
    Ok(Json(posts::by_author(&conn, &id, scope)?))
}
