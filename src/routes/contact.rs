use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::mail::{self, Email};
use crate::state::AppState;
use crate::store::messages::{self, NewMessage};
use crate::store::users;

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", post(submit))
}

#[derive(Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Store the message, notify the first admin in-app, and email the configured
/// admin address (falling back to that admin's own email).
async fn submit(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let (saved, recipient) = {
        let conn = state.db.get()?;
        let saved = messages::save(
            &conn,
            NewMessage {
                name: &req.name,
                email: &req.email,
                subject: &req.subject,
                message: &req.message,
            },
        )?;

        let admin = users::first_admin(&conn)?;
        if let Some(admin) = &admin {
            messages::notify(
                &conn,
                &admin.id,
                "new_message",
                &format!("New message from {}", saved.name),
                Some(&saved.id),
            )?;
        }
        let recipient = state
            .config
            .mail
            .admin_address
            .clone()
            .or(admin.map(|a| a.email));
        (saved, recipient)
    };

    match recipient {
        Some(to) => {
            mail::dispatch(
                state.mailer.as_ref(),
                Email {
                    to,
                    subject: format!("New message: {}", saved.subject),
                    body: format!(
                        "Name: {}\nEmail: {}\n\n{}",
                        saved.name, saved.email, saved.message
                    ),
                },
            )
            .await
        }
        None => tracing::warn!(message_id = %saved.id, "No admin to notify about contact message"),
    }

    Ok(Json(json!({ "success": true, "id": saved.id })))
}
