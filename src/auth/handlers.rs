use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::auth::{password, session};
use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};
use crate::extractors::extract_token;
use crate::mail::{self, Email};
use crate::state::AppState;
use crate::store::users::{self, NewUser};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// Trimmed, non-empty value or nothing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `<frontend_url>/reset-password/<token>`, tolerating a base with or without
/// a trailing slash.
pub fn reset_link(frontend_url: &str, token: &str) -> AppResult<String> {
    let mut base = Url::parse(frontend_url)
        .map_err(|e| AppError::Internal(format!("Invalid frontend_url: {}", e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let link = base
        .join(&format!("reset-password/{}", token))
        .map_err(|e| AppError::Internal(format!("Invalid reset link: {}", e)))?;
    Ok(link.into())
}

fn signed_in(
    state: &AppState,
    status: StatusCode,
    message: &str,
    token: String,
    user: User,
) -> Response {
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": message, "token": token, "user": user })),
    )
        .into_response()
}

// -- Handlers --

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let (Some(username), Some(email), Some(pass), Some(confirm)) = (
        present(&req.username),
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Username, email, password, and confirm password are required",
        ));
    };
    if pass != confirm {
        return Err(AppError::validation("Passwords do not match"));
    }

    let hash = password::hash_blocking(pass.to_string()).await?;

    let (user, token) = {
        let conn = state.db.get()?;
        let user = users::create(
            &conn,
            NewUser {
                username,
                email,
                password_hash: &hash,
                role: Role::User,
            },
        )?;
        let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;
        (user, token)
    };

    mail::dispatch(
        state.mailer.as_ref(),
        Email {
            to: user.email.clone(),
            subject: "Welcome to folio".to_string(),
            body: format!(
                "Welcome {}! Thanks for joining. You can now comment on posts, \
                 like and bookmark your favourites.",
                user.username
            ),
        },
    )
    .await;

    Ok(signed_in(
        &state,
        StatusCode::CREATED,
        "User registered successfully",
        token,
        user,
    ))
}

/// POST /api/auth/login
///
/// Accepts either a username or an email.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let login = present(&req.username).or(present(&req.email));
    let pass = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(login), Some(pass)) = (login, pass) else {
        return Err(AppError::validation(
            "Username/email and password are required",
        ));
    };

    let creds = {
        let conn = state.db.get()?;
        users::credentials(&conn, login)?
    };
    let creds = creds.ok_or(AppError::InvalidCredentials)?;
    if !password::verify_blocking(pass.to_string(), creds.password_hash).await? {
        tracing::info!(login = %login, "Rejected login");
        return Err(AppError::InvalidCredentials);
    }

    let (user, token) = {
        let conn = state.db.get()?;
        let token = session::create_session(&conn, &creds.id, state.config.auth.session_hours)?;
        (users::get(&conn, &creds.id)?, token)
    };
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(signed_in(&state, StatusCode::OK, "Login successful", token, user))
}

/// POST /api/auth/logout. Drops the presented session, if any.
pub async fn logout(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = extract_token(&parts, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(cookie_name))],
        Json(json!({ "message": "Logout successful" })),
    )
        .into_response())
}

/// POST /api/auth/forgot-password
///
/// The token is stored before the email goes out and stays valid even when
/// delivery fails.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let email = present(&req.email).ok_or_else(|| AppError::validation("Email is required"))?;

    let token = session::generate_token();
    let user = {
        let conn = state.db.get()?;
        let user = users::find_by_email(&conn, email)?
            .ok_or_else(|| AppError::NotFound("No user found with that email".into()))?;
        users::set_reset_token(&conn, &user.id, &token, state.config.auth.reset_token_minutes)?;
        user
    };

    let link = reset_link(&state.config.mail.frontend_url, &token)?;
    mail::dispatch(
        state.mailer.as_ref(),
        Email {
            to: user.email,
            subject: "Password Reset Request".to_string(),
            body: format!(
                "You requested a password reset. Open this link to choose a new password: {}\n\n\
                 The link expires in {} minutes. If you did not ask for this, ignore this email.",
                link, state.config.auth.reset_token_minutes
            ),
        },
    )
    .await;

    Ok(Json(json!({ "message": "Password reset email sent" })))
}

/// POST /api/auth/reset-password/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let pass = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Token and new password are required"))?;
    if let Some(confirm) = req.confirm_password.as_deref() {
        if confirm != pass {
            return Err(AppError::validation("Passwords do not match"));
        }
    }

    let hash = password::hash_blocking(pass.to_string()).await?;
    let conn = state.db.get()?;
    let user_id = users::consume_reset_token(&conn, &token, &hash)?;
    // Old sessions die with the old password.
    session::delete_user_sessions(&conn, &user_id)?;
    tracing::info!(user_id = %user_id, "Password reset");

    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}
