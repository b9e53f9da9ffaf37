use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail rejected: {0}")]
    Rejected(String),
}

/// Outbound email. Callers treat delivery as fire-and-forget: a failure is
/// logged and never undoes the action that triggered the message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes every message to the log and nowhere else.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Email dispatched (log transport)"
        );
        tracing::debug!("Email body:\n{}", email.body);
        Ok(())
    }
}

/// Drops one RFC 822-style `.eml` file per message into a directory.
pub struct OutboxMailer {
    from: String,
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(from: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            dir: dir.into(),
        }
    }

    fn render(&self, email: &Email) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\n\r\n{}\r\n",
            header_value(&self.from),
            header_value(&email.to),
            header_value(&email.subject),
            chrono::Utc::now().to_rfc2822(),
            email.body
        )
    }
}

/// Line breaks would start a new header, so they become spaces.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if email.to.trim().is_empty() {
            return Err(MailError::Rejected("empty recipient".into()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}.eml", uuid::Uuid::now_v7()));
        tokio::fs::write(&path, self.render(&email)).await?;
        tracing::info!(to = %email.to, path = %path.display(), "Email written to outbox");
        Ok(())
    }
}

/// Keeps messages in memory; handy for tests and dry runs.
#[derive(Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected("transport unavailable".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

pub fn from_config(config: &MailConfig, outbox: PathBuf) -> Arc<dyn Mailer> {
    match config.transport {
        MailTransport::Log => Arc::new(LogMailer::new(config.from.clone())),
        MailTransport::Outbox => Arc::new(OutboxMailer::new(config.from.clone(), outbox)),
    }
}

/// Send without letting a delivery failure escape.
pub async fn dispatch(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        tracing::warn!(to = %to, "Email delivery failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Email {
        Email {
            to: "reader@example.com".into(),
            subject: "Hello".into(),
            body: "Body text".into(),
        }
    }

    #[test]
    fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        tokio_test::block_on(mailer.send(sample())).unwrap();
        assert_eq!(mailer.sent(), vec![sample()]);
    }

    #[test]
    fn dispatch_swallows_failures() {
        let mailer = MemoryMailer::failing();
        tokio_test::block_on(dispatch(&mailer, sample()));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn outbox_mailer_writes_eml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new("folio@example.com", tmp.path().join("outbox"));
        mailer.send(sample()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path().join("outbox"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
        let content = std::fs::read_to_string(entries[0].path()).unwrap();
        assert!(content.contains("To: reader@example.com"));
        assert!(content.contains("Subject: Hello"));
        assert!(content.ends_with("Body text\r\n"));
    }

    #[tokio::test]
    async fn outbox_mailer_keeps_line_breaks_out_of_headers() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new("folio@example.com", tmp.path());
        let mut email = sample();
        email.subject = "Hi\r\nBcc: victim@example.com".into();
        mailer.send(email).await.unwrap();

        let entry = std::fs::read_dir(tmp.path()).unwrap().next().unwrap().unwrap();
        let content = std::fs::read_to_string(entry.path()).unwrap();
        assert!(content.contains("Subject: Hi  Bcc: victim@example.com\r\n"));
        assert!(!content.contains("\r\nBcc:"));
    }

    #[tokio::test]
    async fn outbox_mailer_rejects_empty_recipient() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new("folio@example.com", tmp.path());
        let mut email = sample();
        email.to = "  ".into();
        assert!(matches!(
            mailer.send(email).await,
            Err(MailError::Rejected(_))
        ));
    }
}
