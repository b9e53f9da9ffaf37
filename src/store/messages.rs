//! Contact-form messages and the notifications they raise for admins.

use rusqlite::{params, Connection, Row};

use super::new_id;
use crate::db::models::{ContactMessage, Notification};
use crate::error::{AppError, AppResult};

pub struct NewMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<ContactMessage> {
    Ok(ContactMessage {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn save(conn: &Connection, new: NewMessage<'_>) -> AppResult<ContactMessage> {
    let missing: Vec<&str> = [
        ("name", new.name),
        ("email", new.email),
        ("subject", new.subject),
        ("message", new.message),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(field, _)| field)
    .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !new.email.contains('@') {
        return Err(AppError::validation("A valid email is required"));
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO messages (id, name, email, subject, message) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            new.name.trim(),
            new.email.trim(),
            new.subject.trim(),
            new.message.trim()
        ],
    )?;
    get(conn, &id)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<ContactMessage> {
    conn.query_row(
        "SELECT id, name, email, subject, message, is_read, created_at FROM messages WHERE id = ?1",
        params![id],
        map_message,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found("Message"),
        other => other.into(),
    })
}

pub fn list(conn: &Connection) -> AppResult<Vec<ContactMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, subject, message, is_read, created_at
         FROM messages ORDER BY created_at DESC, rowid DESC",
    )?;
    let messages = stmt
        .query_map([], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub fn mark_read(conn: &Connection, id: &str) -> AppResult<ContactMessage> {
    let rows = conn.execute("UPDATE messages SET is_read = 1 WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::not_found("Message"));
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::not_found("Message"));
    }
    Ok(())
}

pub fn notify(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    content: &str,
    related_id: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, content, related_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new_id(), user_id, kind, content, related_id],
    )?;
    Ok(())
}

pub fn notifications(conn: &Connection, user_id: &str) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, content, related_id, is_read, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let list = stmt
        .query_map(params![user_id], |row| {
            Ok(Notification {
                id: row.get(0)?,
                user_id: row.get(1)?,
                kind: row.get(2)?,
                content: row.get(3)?,
                related_id: row.get(4)?,
                is_read: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::test_pool;
    use crate::store::fixtures;

    fn hello() -> NewMessage<'static> {
        NewMessage {
            name: "Reader",
            email: "reader@example.com",
            subject: "Hi",
            message: "Nice blog",
        }
    }

    #[test]
    fn save_list_read_delete() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let saved = save(&conn, hello()).unwrap();
        assert!(!saved.is_read);
        assert_eq!(list(&conn).unwrap().len(), 1);

        assert!(mark_read(&conn, &saved.id).unwrap().is_read);
        delete(&conn, &saved.id).unwrap();
        assert!(list(&conn).unwrap().is_empty());
        assert!(matches!(delete(&conn, &saved.id), Err(AppError::NotFound(_))));
        assert!(matches!(mark_read(&conn, &saved.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn save_validates_fields() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let err = save(
            &conn,
            NewMessage {
                subject: "",
                message: " ",
                ..hello()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.ends_with("subject, message")));

        let err = save(
            &conn,
            NewMessage {
                email: "not-an-email",
                ..hello()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn notifications_are_per_user() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let admin = fixtures::user(&conn, "root", Role::Admin);
        let other = fixtures::user(&conn, "other", Role::User);

        notify(&conn, &admin, "message", "New contact message", Some("m1")).unwrap();
        let list = notifications(&conn, &admin).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, "message");
        assert_eq!(list[0].related_id.as_deref(), Some("m1"));
        assert!(notifications(&conn, &other).unwrap().is_empty());
    }
}
