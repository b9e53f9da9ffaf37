//! Site export as JSON, CSV or XML. JSON carries everything selected; CSV and
//! XML only describe posts.

use serde::Serialize;

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Xml,
}

impl ExportFormat {
    /// Unknown or missing formats fall back to JSON.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("csv") => ExportFormat::Csv,
            Some("xml") => ExportFormat::Xml,
            _ => ExportFormat::Json,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xml => "application/xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=blog_export.{}", self.extension())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAnalytics {
    pub total_views: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct ExportData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<ExportAnalytics>,
}

impl ExportData {
    fn posts(&self) -> &[Post] {
        self.posts.as_deref().unwrap_or_default()
    }
}

pub fn render(data: &ExportData, format: ExportFormat) -> AppResult<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        ExportFormat::Csv => render_csv(data.posts()),
        ExportFormat::Xml => Ok(render_xml(data.posts())),
    }
}

fn render_csv(posts: &[Post]) -> AppResult<String> {
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Title", "Category", "Published", "Views"])
        .map_err(csv_err)?;
    for post in posts {
        writer
            .write_record([
                post.title.as_str(),
                post.category.as_str(),
                if post.published { "true" } else { "false" },
                post.views.to_string().as_str(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

fn render_xml(posts: &[Post]) -> String {
    let mut out = String::from("<posts>");
    for post in posts {
        out.push_str("<post><title>");
        out.push_str(&html_escape::encode_text(&post.title));
        out.push_str("</title><category>");
        out.push_str(&html_escape::encode_text(&post.category));
        out.push_str("</category></post>");
    }
    out.push_str("</posts>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, category: &str, published: bool, views: i64) -> Post {
        Post {
            id: "p1".into(),
            title: title.into(),
            slug: "slug".into(),
            content: "body".into(),
            excerpt: "excerpt".into(),
            image_url: String::new(),
            tags: vec![],
            category: category.into(),
            author: "u1".into(),
            author_username: "alice".into(),
            published,
            published_at: None,
            views,
            likes: vec![],
            hidden: false,
            created_at: "2025-01-01 00:00:00".into(),
            updated_at: "2025-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn format_parsing_defaults_to_json() {
        assert_eq!(ExportFormat::parse(Some("CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse(Some("xml")), ExportFormat::Xml);
        assert_eq!(ExportFormat::parse(Some("yaml")), ExportFormat::Json);
        assert_eq!(ExportFormat::parse(None), ExportFormat::Json);
        assert_eq!(
            ExportFormat::Csv.content_disposition(),
            "attachment; filename=blog_export.csv"
        );
    }

    #[test]
    fn csv_has_header_and_quotes_when_needed() {
        let data = ExportData {
            posts: Some(vec![post("Hello, World!", "tech", true, 3)]),
            ..Default::default()
        };
        let csv = render(&data, ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "Title,Category,Published,Views\n\"Hello, World!\",tech,true,3\n"
        );
    }

    #[test]
    fn xml_escapes_markup() {
        let data = ExportData {
            posts: Some(vec![post("Tom & <Jerry>", "toons", false, 0)]),
            ..Default::default()
        };
        let xml = render(&data, ExportFormat::Xml).unwrap();
        assert_eq!(
            xml,
            "<posts><post><title>Tom &amp; &lt;Jerry&gt;</title><category>toons</category></post></posts>"
        );
    }

    #[test]
    fn json_only_includes_selected_sections() {
        let data = ExportData {
            analytics: Some(ExportAnalytics { total_views: 42 }),
            ..Default::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&render(&data, ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["analytics"]["totalViews"], 42);
        assert!(json.get("posts").is_none());
        assert!(json.get("comments").is_none());
    }

    #[test]
    fn csv_without_posts_is_just_the_header() {
        let csv = render(&ExportData::default(), ExportFormat::Csv).unwrap();
        assert_eq!(csv, "Title,Category,Published,Views\n");
    }
}
