use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Role;

/// Who a live session token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOwner {
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve an unexpired token to its owner.
pub fn lookup(conn: &Connection, token: &str) -> rusqlite::Result<Option<SessionOwner>> {
    conn.query_row(
        "SELECT u.id, u.username, u.role FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(SessionOwner {
                id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop every session of a user, e.g. after a password reset.
pub fn delete_user_sessions(conn: &Connection, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed_user(conn: &Connection) {
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, role)
             VALUES ('u1', 'alice', 'alice@example.com', 'x', 'writer')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn created_session_resolves_to_owner() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed_user(&conn);

        let token = create_session(&conn, "u1", 1).unwrap();
        let owner = lookup(&conn, &token).unwrap().unwrap();
        assert_eq!(owner.id, "u1");
        assert_eq!(owner.username, "alice");
        assert_eq!(owner.role, Role::Writer);
    }

    #[test]
    fn deleted_session_no_longer_resolves() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed_user(&conn);

        let token = create_session(&conn, "u1", 1).unwrap();
        delete_session(&conn, &token).unwrap();
        assert!(lookup(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_session_does_not_resolve() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed_user(&conn);

        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at)
             VALUES ('s1', 'u1', 'stale', datetime('now', '-1 hours'))",
            [],
        )
        .unwrap();
        assert!(lookup(&conn, "stale").unwrap().is_none());
    }
}
