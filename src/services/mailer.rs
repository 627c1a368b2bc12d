//! Outgoing mail delivery for confirmation codes.
//!
//! The backend is chosen by `MAIL_BACKEND`:
//!
//! - `console`: log the message (development)
//! - `file`: write each message to a file in `MAIL_FILE_DIR`
//! - `memory`: keep messages in process memory (tests)
//! - `relay`: POST the message as JSON to `MAIL_RELAY_URL`

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use url::{Host, Url};

use crate::config::{Config, MailBackend};

/// Errors raised while delivering mail.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("could not write mail file: {0}")]
    Io(#[from] std::io::Error),

    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay answered with status {0}")]
    Rejected(u16),

    #[error("invalid mail relay URL: {0}")]
    InvalidRelayUrl(String),
}

/// A single message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// The message carrying a freshly issued confirmation code.
    pub fn confirmation_code(from: &str, to: &str, code: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Your confirmation code".to_string(),
            body: format!("Your confirmation code: {code}"),
        }
    }

    fn render(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}\n",
            self.from, self.to, self.subject, self.body
        )
    }
}

/// Mail transport shared by all request handlers.
#[derive(Debug, Clone)]
pub enum Mailer {
    Console,
    File { dir: PathBuf },
    Memory(Arc<Mutex<Vec<OutgoingMail>>>),
    Relay { client: reqwest::Client, url: Url },
}

impl Mailer {
    /// Build the backend selected in the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidRelayUrl` when the relay backend is selected without a usable URL.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        match config.mail_backend {
            MailBackend::Console => Ok(Mailer::Console),
            MailBackend::File => Ok(Mailer::File {
                dir: PathBuf::from(&config.mail_file_dir),
            }),
            MailBackend::Memory => Ok(Mailer::memory()),
            MailBackend::Relay => {
                let raw = config.mail_relay_url.as_deref().ok_or_else(|| {
                    MailError::InvalidRelayUrl("MAIL_RELAY_URL is not set".to_string())
                })?;
                let url = validate_relay_url(raw)?;
                let client = reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(5))
                    .build()?;
                Ok(Mailer::Relay { client, url })
            }
        }
    }

    /// An in-memory mailbox.
    pub fn memory() -> Self {
        Mailer::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    /// Deliver one message.
    pub async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        match self {
            Mailer::Console => {
                tracing::info!(to = %mail.to, subject = %mail.subject, "{}", mail.body);
            }
            Mailer::File { dir } => {
                tokio::fs::create_dir_all(dir).await?;
                let suffix: u32 = rand::random();
                let name = format!(
                    "{}-{:08x}.log",
                    Utc::now().format("%Y%m%d-%H%M%S%.6f"),
                    suffix
                );
                tokio::fs::write(dir.join(name), mail.render()).await?;
            }
            Mailer::Memory(outbox) => {
                outbox
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(mail.clone());
            }
            Mailer::Relay { client, url } => {
                let response = client.post(url.clone()).json(mail).send().await?;
                if !response.status().is_success() {
                    return Err(MailError::Rejected(response.status().as_u16()));
                }
            }
        }

        tracing::debug!(to = %mail.to, "Mail delivered");
        Ok(())
    }

    /// Messages captured by the memory backend; empty for the others.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        match self {
            Mailer::Memory(outbox) => outbox
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
            _ => Vec::new(),
        }
    }
}

/// Validate the relay URL.
///
/// # Rules
///
/// - Must be valid URL
/// - Must be HTTPS (HTTP allowed for loopback hosts)
/// - Maximum 2048 characters
pub fn validate_relay_url(url: &str) -> Result<Url, MailError> {
    if url.len() > 2048 {
        return Err(MailError::InvalidRelayUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed =
        Url::parse(url).map_err(|_| MailError::InvalidRelayUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" => {
            let loopback = match parsed.host() {
                Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
                Some(Host::Ipv4(addr)) => addr.is_loopback(),
                Some(Host::Ipv6(addr)) => addr.is_loopback(),
                None => false,
            };
            if loopback {
                Ok(parsed)
            } else {
                Err(MailError::InvalidRelayUrl(
                    "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
                ))
            }
        }
        _ => Err(MailError::InvalidRelayUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_captures_mail() {
        let mailer = Mailer::memory();
        let mail = OutgoingMail::confirmation_code("noreply@yamdb.local", "a@b.c", "abc123");

        mailer.send(&mail).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.c");
        assert!(sent[0].body.contains("abc123"));
    }

    #[tokio::test]
    async fn test_file_backend_writes_message() {
        let dir = std::env::temp_dir().join(format!("yamdb-mail-{:08x}", rand::random::<u32>()));
        let mailer = Mailer::File { dir: dir.clone() };
        let mail = OutgoingMail::confirmation_code("noreply@yamdb.local", "a@b.c", "abc123");

        mailer.send(&mail).await.unwrap();

        let mut entries = std::fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("From: noreply@yamdb.local\nTo: a@b.c\n"));
        assert!(content.contains("abc123"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_relay_url_rules() {
        assert!(validate_relay_url("https://mail.example.com/send").is_ok());
        assert!(validate_relay_url("http://localhost:8025/send").is_ok());
        assert!(validate_relay_url("http://mail.example.com/send").is_err());
        assert!(validate_relay_url("ftp://mail.example.com").is_err());
        assert!(validate_relay_url("not a url").is_err());
    }

    #[test]
    fn test_relay_http_only_on_loopback() {
        assert!(validate_relay_url("http://127.0.0.1:8025/send").is_ok());
        assert!(validate_relay_url("http://127.0.0.2/send").is_ok());
        assert!(validate_relay_url("http://[::1]:8025/send").is_ok());
        assert!(validate_relay_url("http://LOCALHOST/send").is_ok());
        assert!(validate_relay_url("http://0.0.0.0:8025/send").is_err());
        assert!(validate_relay_url("http://[::]/send").is_err());
        assert!(validate_relay_url("http://10.0.0.5/send").is_err());
    }

    #[test]
    fn test_console_backend_keeps_nothing() {
        assert!(Mailer::Console.sent().is_empty());
    }
}
