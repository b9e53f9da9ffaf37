use rusqlite::{params, Connection};

use super::new_id;
use crate::db::models::Category;
use crate::error::{AppError, AppResult};

/// Categories by name, each with the number of posts filed under it.
pub fn list(conn: &Connection) -> AppResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name,
                (SELECT COUNT(*) FROM posts p WHERE p.category = c.name)
         FROM categories c ORDER BY c.name",
    )?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                post_count: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn create(conn: &Connection, name: &str) -> AppResult<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Category name is required"));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
        params![name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::validation("Category already exists"));
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO categories (id, name) VALUES (?1, ?2)",
        params![id, name],
    )?;
    Ok(Category {
        id,
        name: name.to_string(),
        post_count: 0,
    })
}

pub fn count(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?)
}
