use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub fn set_post_hidden(conn: &Connection, post_id: &str, hidden: bool) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE posts SET hidden = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![post_id, hidden],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("Post"));
    }
    tracing::info!(post_id = %post_id, hidden, "Changed post visibility");
    Ok(())
}

pub fn set_comment_hidden(conn: &Connection, comment_id: &str, hidden: bool) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE comments SET hidden = ?2 WHERE id = ?1",
        params![comment_id, hidden],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("Comment"));
    }
    tracing::info!(comment_id = %comment_id, hidden, "Changed comment visibility");
    Ok(())
}

/// What an account deletion took with it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub posts: usize,
    pub comments: usize,
}

/// Remove a user and everything they authored, atomically.
///
/// Order matters because `author_id` has no ON DELETE action: the user's
/// comments go first (wherever they sit in a thread), then their posts, whose
/// own comments, likes and bookmarks cascade. Deleting the user row then
/// cascades sessions, likes, bookmarks and notifications. Replies other people
/// wrote under a deleted comment survive and thread as roots.
pub fn delete_user_cascade(conn: &mut Connection, user_id: &str) -> AppResult<CascadeReport> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::not_found("User"));
    }

    let comments = tx.execute("DELETE FROM comments WHERE author_id = ?1", params![user_id])?;
    let posts = tx.execute("DELETE FROM posts WHERE author_id = ?1", params![user_id])?;
    tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    tx.commit()?;

    tracing::info!(user_id = %user_id, posts, comments, "Deleted user and authored content");
    Ok(CascadeReport { posts, comments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::test_pool;
    use crate::store::{comments, fixtures, posts, users};

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn hide_and_unhide_post() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let post = fixtures::post(&conn, "p1", &author);

        set_post_hidden(&conn, &post, true).unwrap();
        assert!(posts::get(&conn, &post).unwrap().hidden);
        set_post_hidden(&conn, &post, false).unwrap();
        assert!(!posts::get(&conn, &post).unwrap().hidden);

        assert!(matches!(
            set_post_hidden(&conn, "missing", true),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn hide_comment_toggles_flag() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let post = fixtures::post(&conn, "p1", &author);
        let comment = fixtures::comment(&conn, "c1", &post, &author, None);

        set_comment_hidden(&conn, &comment, true).unwrap();
        assert!(comments::get(&conn, &comment).unwrap().hidden);
        assert!(comments::visible_for_post(&conn, &post).unwrap().is_empty());
        assert!(matches!(
            set_comment_hidden(&conn, "missing", true),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn cascade_removes_authored_content_and_keeps_foreign_replies() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let writer = fixtures::user(&conn, "w", Role::Writer);
        let doomed = fixtures::user(&conn, "d", Role::Writer);
        let bystander = fixtures::user(&conn, "b", Role::User);

        let kept_post = fixtures::post(&conn, "kept", &writer);
        let doomed_post = fixtures::post(&conn, "doomed", &doomed);
        let root = fixtures::comment(&conn, "root", &kept_post, &doomed, None);
        fixtures::comment(&conn, "reply", &kept_post, &bystander, Some(&root));
        fixtures::comment(&conn, "on-doomed", &doomed_post, &bystander, None);
        conn.execute(
            "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            params![kept_post, doomed],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO bookmarks (user_id, post_id) VALUES (?1, ?2)",
            params![bystander, doomed_post],
        )
        .unwrap();

        let report = delete_user_cascade(&mut conn, &doomed).unwrap();
        assert_eq!(report, CascadeReport { posts: 1, comments: 1 });

        assert!(users::find(&conn, &doomed).unwrap().is_none());
        assert!(posts::find(&conn, &doomed_post).unwrap().is_none());
        assert_eq!(count(&conn, "post_likes"), 0);
        assert_eq!(count(&conn, "bookmarks"), 0);

        let forest = comments::thread_for_post(&conn, &kept_post).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].comment.id, "reply");
    }

    #[test]
    fn cascade_on_missing_user_is_not_found() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        assert!(matches!(
            delete_user_cascade(&mut conn, "ghost"),
            Err(AppError::NotFound(_))
        ));
    }
}
