//! Like and bookmark toggles. Each toggle is one SQLite transaction: check the
//! target exists, flip membership, count. The user side (`likedPosts`,
//! `bookmarks`) reads the same rows, so there is no second copy to keep in
//! step.

use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

use super::users;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
    pub bookmarks: Vec<String>,
}

fn exists(tx: &Transaction<'_>, sql: &str, id: &str) -> rusqlite::Result<bool> {
    tx.query_row(sql, params![id], |row| row.get(0))
}

/// Delete the membership row if present, otherwise insert it.
/// Returns true when the row now exists.
fn flip(tx: &Transaction<'_>, delete_sql: &str, insert_sql: &str, a: &str, b: &str) -> rusqlite::Result<bool> {
    if tx.execute(delete_sql, params![a, b])? > 0 {
        return Ok(false);
    }
    tx.execute(insert_sql, params![a, b])?;
    Ok(true)
}

pub fn toggle_post_like(conn: &mut Connection, post_id: &str, user_id: &str) -> AppResult<LikeToggle> {
    let tx = conn.transaction()?;
    if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)", post_id)? {
        return Err(AppError::not_found("Post"));
    }

    let liked = flip(
        &tx,
        "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
        "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
        post_id,
        user_id,
    )?;
    let likes_count = tx.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    tracing::debug!(post_id = %post_id, user_id = %user_id, liked, "Toggled post like");
    Ok(LikeToggle { liked, likes_count })
}

pub fn toggle_comment_like(
    conn: &mut Connection,
    comment_id: &str,
    user_id: &str,
) -> AppResult<LikeToggle> {
    let tx = conn.transaction()?;
    if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)", comment_id)? {
        return Err(AppError::not_found("Comment"));
    }

    let liked = flip(
        &tx,
        "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
        "INSERT INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)",
        comment_id,
        user_id,
    )?;
    let likes_count = tx.query_row(
        "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1",
        params![comment_id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    Ok(LikeToggle { liked, likes_count })
}

pub fn toggle_bookmark(conn: &mut Connection, user_id: &str, post_id: &str) -> AppResult<BookmarkToggle> {
    let tx = conn.transaction()?;
    if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)", post_id)? {
        return Err(AppError::not_found("Post"));
    }

    let bookmarked = flip(
        &tx,
        "DELETE FROM bookmarks WHERE user_id = ?1 AND post_id = ?2",
        "INSERT INTO bookmarks (user_id, post_id) VALUES (?1, ?2)",
        user_id,
        post_id,
    )?;
    let bookmarks = users::bookmark_ids(&tx, user_id)?;
    tx.commit()?;

    Ok(BookmarkToggle {
        bookmarked,
        bookmarks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::test_pool;
    use crate::store::{fixtures, posts};

    #[test]
    fn liking_twice_restores_original_state() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let reader = fixtures::user(&conn, "r", Role::User);
        let post = fixtures::post(&conn, "p1", &author);

        let first = toggle_post_like(&mut conn, &post, &reader).unwrap();
        assert_eq!(first, LikeToggle { liked: true, likes_count: 1 });
        let second = toggle_post_like(&mut conn, &post, &reader).unwrap();
        assert_eq!(second, LikeToggle { liked: false, likes_count: 0 });
    }

    #[test]
    fn liked_posts_and_post_likes_agree() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let reader = fixtures::user(&conn, "r", Role::User);
        let post = fixtures::post(&conn, "p1", &author);

        toggle_post_like(&mut conn, &post, &reader).unwrap();
        assert_eq!(users::get(&conn, &reader).unwrap().liked_posts, vec![post.clone()]);
        assert_eq!(posts::get(&conn, &post).unwrap().likes, vec![reader.clone()]);

        toggle_post_like(&mut conn, &post, &reader).unwrap();
        assert!(users::get(&conn, &reader).unwrap().liked_posts.is_empty());
        assert!(posts::get(&conn, &post).unwrap().likes.is_empty());
    }

    #[test]
    fn missing_targets_are_not_found() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let reader = fixtures::user(&conn, "r", Role::User);

        assert!(matches!(
            toggle_post_like(&mut conn, "nope", &reader),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            toggle_comment_like(&mut conn, "nope", &reader),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            toggle_bookmark(&mut conn, &reader, "nope"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn comment_likes_count_distinct_users() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let a = fixtures::user(&conn, "a", Role::User);
        let b = fixtures::user(&conn, "b", Role::User);
        let post = fixtures::post(&conn, "p1", &author);
        let comment = fixtures::comment(&conn, "c1", &post, &author, None);

        toggle_comment_like(&mut conn, &comment, &a).unwrap();
        let toggle = toggle_comment_like(&mut conn, &comment, &b).unwrap();
        assert_eq!(toggle.likes_count, 2);
        let toggle = toggle_comment_like(&mut conn, &comment, &a).unwrap();
        assert_eq!(toggle, LikeToggle { liked: false, likes_count: 1 });
    }

    #[test]
    fn bookmarks_keep_insertion_order() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let author = fixtures::user(&conn, "w", Role::Writer);
        let reader = fixtures::user(&conn, "r", Role::User);
        let p1 = fixtures::post(&conn, "p1", &author);
        let p2 = fixtures::post(&conn, "p2", &author);

        toggle_bookmark(&mut conn, &reader, &p2).unwrap();
        let toggle = toggle_bookmark(&mut conn, &reader, &p1).unwrap();
        assert!(toggle.bookmarked);
        assert_eq!(toggle.bookmarks, vec![p2.clone(), p1.clone()]);

        let toggle = toggle_bookmark(&mut conn, &reader, &p2).unwrap();
        assert!(!toggle.bookmarked);
        assert_eq!(toggle.bookmarks, vec![p1]);
    }
}
