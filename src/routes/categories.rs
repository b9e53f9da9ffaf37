use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::Category;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::policy::{authorize, Action};
use crate::state::AppState;
use crate::store::categories;

pub fn router() -> Router<AppState> {
    Router::new().route("/categories", get(list).post(create))
}

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let conn = state.db.get()?;
    Ok(Json(categories::list(&conn)?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    authorize(Some(user.principal()), Action::Administer)?;
    let conn = state.db.get()?;
    let category = categories::create(&conn, req.name.as_deref().unwrap_or_default())?;
    tracing::info!(name = %category.name, "Created category");
    Ok((StatusCode::CREATED, Json(category)))
}
