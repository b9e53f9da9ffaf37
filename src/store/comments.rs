use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{engagement_ids, new_id};
use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::threading::{build_forest, CommentNode};

const MAX_COMMENT_CHARS: usize = 2000;

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username, c.content,
        c.parent_id, c.hidden, c.created_at
     FROM comments c JOIN users u ON u.id = c.author_id";

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post: row.get(1)?,
        author: row.get(2)?,
        author_username: row.get(3)?,
        content: row.get(4)?,
        parent: row.get(5)?,
        likes: Vec::new(),
        hidden: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn like_ids(conn: &Connection, comment_id: &str) -> rusqlite::Result<Vec<String>> {
    engagement_ids(
        conn,
        "SELECT user_id FROM comment_likes WHERE comment_id = ?1 ORDER BY created_at, rowid",
        comment_id,
    )
}

fn query_comments(
    conn: &Connection,
    sql: &str,
    arg: Option<&str>,
) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = match arg {
        Some(arg) => stmt.query_map(params![arg], map_comment)?,
        None => stmt.query_map([], map_comment)?,
    };
    let mut comments = rows.collect::<Result<Vec<_>, _>>()?;
    for comment in &mut comments {
        comment.likes = like_ids(conn, &comment.id)?;
    }
    Ok(comments)
}

pub fn find(conn: &Connection, id: &str) -> AppResult<Option<Comment>> {
    let comment = conn
        .query_row(
            &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
            params![id],
            map_comment,
        )
        .optional()?;
    match comment {
        Some(mut comment) => {
            comment.likes = like_ids(conn, &comment.id)?;
            Ok(Some(comment))
        }
        None => Ok(None),
    }
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Comment> {
    find(conn, id)?.ok_or_else(|| AppError::not_found("Comment"))
}

fn post_exists(conn: &Connection, post_id: &str) -> AppResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Add a comment to a post, optionally as a reply.
///
/// The post must exist (404). A parent must exist (404) and sit on the same
/// post (400). Everything is checked before the insert.
pub fn add(
    conn: &Connection,
    post_id: &str,
    author_id: &str,
    content: &str,
    parent_id: Option<&str>,
) -> AppResult<Comment> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Content is required"));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    if !post_exists(conn, post_id)? {
        return Err(AppError::not_found("Post"));
    }
    if let Some(parent_id) = parent_id {
        let parent = find(conn, parent_id)?
            .ok_or_else(|| AppError::not_found("Parent comment"))?;
        if parent.post != post_id {
            return Err(AppError::validation(
                "Parent comment belongs to a different post",
            ));
        }
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, content, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, post_id, author_id, content, parent_id],
    )?;
    tracing::debug!(comment_id = %id, post_id = %post_id, reply = parent_id.is_some(), "Added comment");
    get(conn, &id)
}

/// Hard delete. Replies stay and surface as roots on the next read.
pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::not_found("Comment"));
    }
    Ok(())
}

/// Visible comments of a post in creation order, ready for threading.
pub fn visible_for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<Comment>> {
    query_comments(
        conn,
        &format!(
            "{} WHERE c.post_id = ?1 AND c.hidden = 0 ORDER BY c.created_at, c.rowid",
            COMMENT_SELECT
        ),
        Some(post_id),
    )
}

/// The reply forest for a post. 404 when the post does not exist.
pub fn thread_for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<CommentNode<Comment>>> {
    if !post_exists(conn, post_id)? {
        return Err(AppError::not_found("Post"));
    }
    Ok(build_forest(visible_for_post(conn, post_id)?))
}

pub fn by_author(conn: &Connection, author_id: &str) -> AppResult<Vec<Comment>> {
    query_comments(
        conn,
        &format!(
            "{} WHERE c.author_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
            COMMENT_SELECT
        ),
        Some(author_id),
    )
}

/// Every comment including hidden ones, newest first.
pub fn all(conn: &Connection) -> AppResult<Vec<Comment>> {
    query_comments(
        conn,
        &format!("{} ORDER BY c.created_at DESC, c.rowid DESC", COMMENT_SELECT),
        None,
    )
}
