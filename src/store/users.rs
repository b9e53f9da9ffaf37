use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{engagement_ids, new_id};
use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, username, email, role, bio, profile_picture, created_at, updated_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Fields a user may change on their own profile. `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// What login needs to check a password. Never serialized.
pub struct Credentials {
    pub id: String,
    pub password_hash: String,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        bio: row.get(4)?,
        profile_picture: row.get(5)?,
        bookmarks: Vec::new(),
        liked_posts: Vec::new(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn with_engagement(conn: &Connection, mut user: User) -> rusqlite::Result<User> {
    user.bookmarks = bookmark_ids(conn, &user.id)?;
    user.liked_posts = liked_post_ids(conn, &user.id)?;
    Ok(user)
}

pub fn bookmark_ids(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    engagement_ids(
        conn,
        "SELECT post_id FROM bookmarks WHERE user_id = ?1 ORDER BY created_at, rowid",
        user_id,
    )
}

/// Posts the user has liked, read from the like table itself so it can never
/// disagree with the posts' own like sets.
pub fn liked_post_ids(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    engagement_ids(
        conn,
        "SELECT post_id FROM post_likes WHERE user_id = ?1 ORDER BY created_at, rowid",
        user_id,
    )
}

pub fn find(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            map_user,
        )
        .optional()?;
    match user {
        Some(user) => Ok(Some(with_engagement(conn, user)?)),
        None => Ok(None),
    }
}

pub fn get(conn: &Connection, id: &str) -> AppResult<User> {
    find(conn, id)?.ok_or_else(|| AppError::not_found("User"))
}

pub fn list_all(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY created_at DESC, rowid DESC",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map([], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    users
        .into_iter()
        .map(|u| with_engagement(conn, u).map_err(AppError::from))
        .collect()
}

pub fn create(conn: &Connection, new: NewUser<'_>) -> AppResult<User> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
        params![new.username, new.email],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::validation("Username or email already exists"));
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, new.username, new.email, new.password_hash, new.role],
    )?;
    tracing::info!(user_id = %id, username = %new.username, "Registered user");
    get(conn, &id)
}

/// Look up by username or email, whichever the caller typed.
pub fn credentials(conn: &Connection, login: &str) -> AppResult<Option<Credentials>> {
    let creds = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1 OR email = ?1",
            params![login],
            |row| {
                Ok(Credentials {
                    id: row.get(0)?,
                    password_hash: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(creds)
}

pub fn update_profile(conn: &Connection, id: &str, changes: ProfileChanges) -> AppResult<User> {
    if let Some(username) = &changes.username {
        if username.trim().is_empty() {
            return Err(AppError::validation("Username cannot be empty"));
        }
    }

    let rows = conn.execute(
        "UPDATE users SET
            username = COALESCE(?2, username),
            bio = COALESCE(?3, bio),
            profile_picture = COALESCE(?4, profile_picture),
            updated_at = datetime('now')
         WHERE id = ?1",
        params![
            id,
            changes.username.as_deref().map(str::trim),
            changes.bio,
            changes.profile_picture
        ],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("User"));
    }
    get(conn, id)
}

pub fn set_role(conn: &Connection, id: &str, role: Role) -> AppResult<User> {
    let rows = conn.execute(
        "UPDATE users SET role = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id, role],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("User"));
    }
    tracing::info!(user_id = %id, role = %role, "Changed user role");
    get(conn, id)
}

pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    match id {
        Some(id) => find(conn, &id),
        None => Ok(None),
    }
}

/// Store a reset token that expires `minutes` from now, replacing any earlier one.
pub fn set_reset_token(conn: &Connection, id: &str, token: &str, minutes: u64) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET reset_token = ?2, reset_expires_at = datetime('now', ?3) WHERE id = ?1",
        params![id, token, format!("+{} minutes", minutes)],
    )?;
    Ok(())
}

/// Swap in a new password hash if `token` is live, clearing the token.
/// Returns the id of the user whose password changed.
pub fn consume_reset_token(conn: &Connection, token: &str, password_hash: &str) -> AppResult<String> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE reset_token = ?1 AND reset_expires_at > datetime('now')",
            params![token],
            |row| row.get(0),
        )
        .optional()?;
    let id = id.ok_or_else(|| AppError::validation("Invalid or expired reset token"))?;

    conn.execute(
        "UPDATE users SET password_hash = ?2, reset_token = NULL, reset_expires_at = NULL,
                updated_at = datetime('now')
         WHERE id = ?1",
        params![id, password_hash],
    )?;
    Ok(id)
}

/// The earliest-created admin, used as the recipient of site notifications.
pub fn first_admin(conn: &Connection) -> AppResult<Option<User>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE role = 'admin' ORDER BY created_at, rowid LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match id {
        Some(id) => find(conn, &id),
        None => Ok(None),
    }
}
