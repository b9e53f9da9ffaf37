use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::AppResult;

pub const DEFAULT_RANGE_DAYS: u32 = 30;
const MAX_RANGE_DAYS: u32 = 365;
const TOP_POSTS: u32 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPost {
    pub id: String,
    pub title: String,
    pub published: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    /// Views across published posts only.
    pub total_views: i64,
    pub total_categories: i64,
    pub total_users: i64,
    pub total_comments: i64,
    pub recent_posts: Vec<RecentPost>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPost {
    pub id: String,
    pub title: String,
    pub views: i64,
    pub category: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_views: i64,
    pub total_posts: i64,
    /// Average views per post in the window, two decimals.
    pub engagement_rate: f64,
    pub top_posts: Vec<TopPost>,
    pub chart_labels: Vec<String>,
    pub chart_data: Vec<i64>,
}

fn scalar(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

pub fn dashboard_stats(conn: &Connection) -> AppResult<DashboardStats> {
    let mut stmt = conn.prepare(
        "SELECT id, title, published, created_at FROM posts
         ORDER BY created_at DESC, rowid DESC LIMIT 5",
    )?;
    let recent_posts = stmt
        .query_map([], |row| {
            Ok(RecentPost {
                id: row.get(0)?,
                title: row.get(1)?,
                published: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DashboardStats {
        total_posts: scalar(conn, "SELECT COUNT(*) FROM posts")?,
        published_posts: scalar(conn, "SELECT COUNT(*) FROM posts WHERE published = 1")?,
        draft_posts: scalar(conn, "SELECT COUNT(*) FROM posts WHERE published = 0")?,
        total_views: scalar(
            conn,
            "SELECT COALESCE(SUM(views), 0) FROM posts WHERE published = 1",
        )?,
        total_categories: scalar(conn, "SELECT COUNT(*) FROM categories")?,
        total_users: scalar(conn, "SELECT COUNT(*) FROM users")?,
        total_comments: scalar(conn, "SELECT COUNT(*) FROM comments")?,
        recent_posts,
    })
}

/// Views of published posts created in the last `days` days, bucketed per day.
pub fn analytics(conn: &Connection, days: u32) -> AppResult<Analytics> {
    analytics_as_of(conn, days, Utc::now().date_naive())
}

fn analytics_as_of(conn: &Connection, days: u32, today: NaiveDate) -> AppResult<Analytics> {
    let days = days.clamp(1, MAX_RANGE_DAYS);
    let start = today - Duration::days(i64::from(days) - 1);

    let mut stmt = conn.prepare(
        "SELECT date(created_at), COUNT(*), COALESCE(SUM(views), 0) FROM posts
         WHERE published = 1 AND date(created_at) BETWEEN ?1 AND ?2
         GROUP BY date(created_at)",
    )?;
    let per_day: HashMap<String, (i64, i64)> = stmt
        .query_map(
            params![start.to_string(), today.to_string()],
            |row| Ok((row.get(0)?, (row.get(1)?, row.get(2)?))),
        )?
        .collect::<Result<_, _>>()?;

    let mut chart_labels = Vec::with_capacity(days as usize);
    let mut chart_data = Vec::with_capacity(days as usize);
    let (mut total_posts, mut total_views) = (0, 0);
    for offset in 0..days {
        let day = start + Duration::days(i64::from(offset));
        let (posts, views) = per_day.get(&day.to_string()).copied().unwrap_or((0, 0));
        total_posts += posts;
        total_views += views;
        chart_labels.push(day.format("%a").to_string());
        chart_data.push(views);
    }

    let engagement_rate = if total_posts > 0 {
        (total_views as f64 / total_posts as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let mut stmt = conn.prepare(
        "SELECT id, title, views, category FROM posts WHERE published = 1
         ORDER BY views DESC, created_at DESC LIMIT ?1",
    )?;
    let top_posts = stmt
        .query_map(params![TOP_POSTS], |row| {
            Ok(TopPost {
                id: row.get(0)?,
                title: row.get(1)?,
                views: row.get(2)?,
                category: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Analytics {
        total_views,
        total_posts,
        engagement_rate,
        top_posts,
        chart_labels,
        chart_data,
    })
}

/// Sum of views over every post, for export.
pub fn total_views(conn: &Connection) -> AppResult<i64> {
    Ok(scalar(conn, "SELECT COALESCE(SUM(views), 0) FROM posts")?)
}
