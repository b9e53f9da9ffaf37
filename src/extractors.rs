use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::session;
use crate::db::models::Role;
use crate::error::AppError;
use crate::policy::Principal;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn principal(&self) -> Principal<'_> {
        Principal {
            id: &self.id,
            role: self.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session token is presented.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated)?;

        let conn = state.db.get()?;
        let owner = session::lookup(&conn, token)?.ok_or(AppError::Unauthenticated)?;

        Ok(CurrentUser {
            id: owner.id,
            username: owner.username,
            role: owner.role,
        })
    }
}

/// Optional user extractor. Yields None instead of a 401 for anonymous requests.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn principal(&self) -> Option<Principal<'_>> {
        self.0.as_ref().map(CurrentUser::principal)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthenticated) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Bearer token from `Authorization`, falling back to the session cookie.
pub fn extract_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    bearer_token(parts).or_else(|| cookie_value(parts, cookie_name))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}
