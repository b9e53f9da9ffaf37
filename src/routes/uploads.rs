use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::{authorize, Action};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/upload/delete", post(delete_image))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageRequest {
    pub image_url: Option<String>,
}

/// Accepts a multipart form with a single `image` file field.
async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    authorize(Some(user.principal()), Action::Engage)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        AppError::validation("Malformed upload")
    })? {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read upload body: {}", e);
            AppError::validation("Image could not be read or is too large")
        })?;

        let image_url = state
            .images
            .save(data, file_name.as_deref(), content_type.as_deref())
            .await?;
        return Ok((StatusCode::CREATED, Json(json!({ "imageUrl": image_url }))));
    }

    Err(AppError::validation("No image uploaded"))
}

async fn delete_image(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<DeleteImageRequest>,
) -> AppResult<Json<serde_json::Value>> {
    authorize(Some(user.principal()), Action::Engage)?;
    let image_url = req
        .image_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::validation("Image URL required"))?;

    if !state.images.delete(&image_url).await? {
        return Err(AppError::not_found("Image"));
    }
    Ok(Json(json!({ "message": "Image deleted" })))
}
