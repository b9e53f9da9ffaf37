use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{engagement_ids, like_pattern, new_id, Page, Paged};
use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::slug::slugify;

const POST_SELECT: &str = "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.image_url, p.tags,
        p.category, p.author_id, u.username, p.published, p.published_at, p.views, p.hidden,
        p.created_at, p.updated_at
     FROM posts p JOIN users u ON u.id = p.author_id";

const ORDER_NEWEST: &str = "ORDER BY p.published_at DESC, p.created_at DESC, p.rowid DESC";

#[derive(Debug, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub category: String,
    pub published: bool,
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub published: Option<bool>,
}

/// Which posts a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Published and not hidden.
    #[default]
    Public,
    /// Drafts and hidden posts too.
    Everything,
}

#[derive(Debug, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub scope: Scope,
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let tags: String = row.get(6)?;
    let tags = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        image_url: row.get(5)?,
        tags,
        category: row.get(7)?,
        author: row.get(8)?,
        author_username: row.get(9)?,
        published: row.get(10)?,
        published_at: row.get(11)?,
        views: row.get(12)?,
        likes: Vec::new(),
        hidden: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn with_likes(conn: &Connection, mut posts: Vec<Post>) -> rusqlite::Result<Vec<Post>> {
    for post in &mut posts {
        post.likes = like_ids(conn, &post.id)?;
    }
    Ok(posts)
}

pub fn like_ids(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    engagement_ids(
        conn,
        "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY created_at, rowid",
        post_id,
    )
}

fn query_posts(conn: &Connection, sql: &str, args: &[String]) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(params_from_iter(args.iter()), map_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(with_likes(conn, posts)?)
}

fn slug_taken(conn: &Connection, slug: &str, except_id: Option<&str>) -> AppResult<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1 AND id IS NOT ?2)",
        params![slug, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn slug_for(title: &str) -> AppResult<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(AppError::validation(
            "Title must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

fn encode_tags(tags: &[String]) -> AppResult<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(serde_json::to_string(&cleaned)?)
}

/// Accepts either a JSON array or a comma-separated string.
pub fn parse_tags(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        serde_json::Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn create(conn: &Connection, author_id: &str, new: NewPost) -> AppResult<Post> {
    let missing: Vec<&str> = [
        ("title", &new.title),
        ("content", &new.content),
        ("excerpt", &new.excerpt),
        ("category", &new.category),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let slug = slug_for(&new.title)?;
    if slug_taken(conn, &slug, None)? {
        return Err(AppError::validation("slug already exists"));
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO posts (id, title, slug, content, excerpt, image_url, tags, category,
                            author_id, published, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                 CASE WHEN ?10 THEN datetime('now') END)",
        params![
            id,
            new.title.trim(),
            slug,
            new.content,
            new.excerpt,
            new.image_url,
            encode_tags(&new.tags)?,
            new.category.trim(),
            author_id,
            new.published,
        ],
    )?;
    tracing::info!(post_id = %id, slug = %slug, published = new.published, "Created post");
    get(conn, &id)
}

/// Look a post up by id or slug regardless of visibility. An id match wins
/// over a post whose slug happens to equal that id.
pub fn find(conn: &Connection, id_or_slug: &str) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!(
                "{} WHERE p.id = ?1 OR p.slug = ?1 ORDER BY p.id = ?1 DESC LIMIT 1",
                POST_SELECT
            ),
            params![id_or_slug],
            map_post,
        )
        .optional()?;
    match post {
        Some(mut post) => {
            post.likes = like_ids(conn, &post.id)?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

pub fn get(conn: &Connection, id_or_slug: &str) -> AppResult<Post> {
    find(conn, id_or_slug)?.ok_or_else(|| AppError::not_found("Post"))
}

pub fn update(conn: &Connection, post_id: &str, changes: PostChanges) -> AppResult<Post> {
    let current = get(conn, post_id)?;

    for (name, value) in [
        ("title", &changes.title),
        ("content", &changes.content),
        ("excerpt", &changes.excerpt),
        ("category", &changes.category),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::validation(format!("{} cannot be empty", name)));
        }
    }

    let slug = match &changes.title {
        Some(title) => {
            let slug = slug_for(title)?;
            if slug != current.slug && slug_taken(conn, &slug, Some(&current.id))? {
                return Err(AppError::validation("slug already exists"));
            }
            Some(slug)
        }
        None => None,
    };
    let tags = changes.tags.as_deref().map(encode_tags).transpose()?;

    // published_at is stamped on the first publish and never cleared.
    conn.execute(
        "UPDATE posts SET
            title = COALESCE(?2, title),
            slug = COALESCE(?3, slug),
            content = COALESCE(?4, content),
            excerpt = COALESCE(?5, excerpt),
            image_url = COALESCE(?6, image_url),
            tags = COALESCE(?7, tags),
            category = COALESCE(?8, category),
            published_at = CASE WHEN ?9 = 1 AND published_at IS NULL
                                THEN datetime('now') ELSE published_at END,
            published = COALESCE(?9, published),
            updated_at = datetime('now')
         WHERE id = ?1",
        params![
            current.id,
            changes.title.as_deref().map(str::trim),
            slug,
            changes.content,
            changes.excerpt,
            changes.image_url,
            tags,
            changes.category.as_deref().map(str::trim),
            changes.published,
        ],
    )?;
    get(conn, &current.id)
}

/// Comments, likes and bookmarks of the post go with it.
pub fn delete(conn: &Connection, post_id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    if rows == 0 {
        return Err(AppError::not_found("Post"));
    }
    tracing::info!(post_id = %post_id, "Deleted post");
    Ok(())
}

/// Atomically bump the view counter and return the new value.
pub fn record_view(conn: &Connection, post_id: &str) -> AppResult<i64> {
    conn.query_row(
        "UPDATE posts SET views = views + 1 WHERE id = ?1 RETURNING views",
        params![post_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Post"))
}

fn paged(
    conn: &Connection,
    clauses: &[String],
    args: &[String],
    page: Page,
) -> AppResult<Paged<Post>> {
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM posts p {}", where_sql),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;
    let posts = query_posts(
        conn,
        &format!(
            "{} {} {} LIMIT {} OFFSET {}",
            POST_SELECT,
            where_sql,
            ORDER_NEWEST,
            page.limit,
            page.offset()
        ),
        args,
    )?;

    Ok(Paged {
        posts,
        total,
        page: page.page,
        total_pages: page.total_pages(total),
    })
}

fn scope_clause(scope: Scope, clauses: &mut Vec<String>) {
    if scope == Scope::Public {
        clauses.push("p.published = 1 AND p.hidden = 0".to_string());
    }
}

pub fn list(conn: &Connection, filter: &PostFilter, page: Page) -> AppResult<Paged<Post>> {
    let mut clauses = Vec::new();
    let mut args: Vec<String> = Vec::new();
    scope_clause(filter.scope, &mut clauses);

    if let Some(category) = &filter.category {
        args.push(category.clone());
        clauses.push(format!("p.category = ?{}", args.len()));
    }
    if let Some(tag) = &filter.tag {
        args.push(tag.clone());
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(p.tags) WHERE json_each.value = ?{})",
            args.len()
        ));
    }
    if let Some(author) = &filter.author {
        args.push(author.clone());
        clauses.push(format!("p.author_id = ?{}", args.len()));
    }

    paged(conn, &clauses, &args, page)
}

/// Case-insensitive substring search over title, body, excerpt, category and tags.
pub fn search(conn: &Connection, query: &str, scope: Scope, page: Page) -> AppResult<Paged<Post>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::validation("Search query is required"));
    }

    let mut clauses = Vec::new();
    scope_clause(scope, &mut clauses);
    clauses.push(
        "(p.title LIKE ?1 ESCAPE '\\' OR p.content LIKE ?1 ESCAPE '\\'
          OR p.excerpt LIKE ?1 ESCAPE '\\' OR p.category LIKE ?1 ESCAPE '\\'
          OR p.tags LIKE ?1 ESCAPE '\\')"
            .to_string(),
    );
    paged(conn, &clauses, &[like_pattern(query)], page)
}

pub fn by_author(conn: &Connection, author_id: &str, scope: Scope) -> AppResult<Vec<Post>> {
    let mut clauses = vec!["p.author_id = ?1".to_string()];
    scope_clause(scope, &mut clauses);
    query_posts(
        conn,
        &format!(
            "{} WHERE {} ORDER BY p.created_at DESC, p.rowid DESC",
            POST_SELECT,
            clauses.join(" AND ")
        ),
        &[author_id.to_string()],
    )
}

/// Every post, newest first. For admin screens and export.
pub fn all(conn: &Connection) -> AppResult<Vec<Post>> {
    query_posts(
        conn,
        &format!("{} ORDER BY p.created_at DESC, p.rowid DESC", POST_SELECT),
        &[],
    )
}

/// The user's bookmarked posts in bookmark order.
pub fn bookmarked_by(conn: &Connection, user_id: &str) -> AppResult<Vec<Post>> {
    query_posts(
        conn,
        &format!(
            "{} JOIN bookmarks b ON b.post_id = p.id WHERE b.user_id = ?1
             ORDER BY b.created_at, b.rowid",
            POST_SELECT
        ),
        &[user_id.to_string()],
    )
}

/// The user's liked posts in like order.
pub fn liked_by(conn: &Connection, user_id: &str) -> AppResult<Vec<Post>> {
    query_posts(
        conn,
        &format!(
            "{} JOIN post_likes l ON l.post_id = p.id WHERE l.user_id = ?1
             ORDER BY l.created_at, l.rowid",
            POST_SELECT
        ),
        &[user_id.to_string()],
    )
}
