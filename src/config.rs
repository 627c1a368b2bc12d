//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SECRET_KEY` (required): key used to sign access tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `ACCESS_TOKEN_TTL_SECS` (optional): token lifetime, defaults to one day
/// - `CONFIRMATION_CODE_TTL_SECS` (optional): code lifetime, defaults to three days
/// - `PAGE_SIZE` (optional): items per list page, defaults to 10
/// - `MAIL_BACKEND` (optional): `console`, `file`, `memory` or `relay`
/// - `MAIL_FROM`, `MAIL_FILE_DIR`, `MAIL_RELAY_URL` (optional): mail backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub secret_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,

    #[serde(default = "default_confirmation_code_ttl")]
    pub confirmation_code_ttl_secs: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,

    #[serde(default)]
    pub mail_backend: MailBackend,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    #[serde(default = "default_mail_file_dir")]
    pub mail_file_dir: String,

    pub mail_relay_url: Option<String>,
}

/// Which transport delivers confirmation emails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    #[default]
    Console,
    File,
    Memory,
    Relay,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_token_ttl() -> i64 {
    24 * 60 * 60
}

fn default_confirmation_code_ttl() -> i64 {
    3 * 24 * 60 * 60
}

fn default_page_size() -> i64 {
    10
}

fn default_mail_from() -> String {
    "noreply@yamdb.local".to_string()
}

fn default_mail_file_dir() -> String {
    "sent_emails".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: Config = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/yamdb"),
            ("SECRET_KEY", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.access_token_ttl_secs, 86_400);
        assert_eq!(config.confirmation_code_ttl_secs, 259_200);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.mail_backend, MailBackend::Console);
        assert_eq!(config.mail_from, "noreply@yamdb.local");
        assert!(config.mail_relay_url.is_none());
    }

    #[test]
    fn test_overrides_parsed() {
        let config: Config = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/yamdb"),
            ("SECRET_KEY", "s3cret"),
            ("SERVER_PORT", "8080"),
            ("PAGE_SIZE", "25"),
            ("MAIL_BACKEND", "relay"),
            ("MAIL_RELAY_URL", "https://mail.example.com/send"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.mail_backend, MailBackend::Relay);
        assert_eq!(
            config.mail_relay_url.as_deref(),
            Some("https://mail.example.com/send")
        );
    }

    #[test]
    fn test_missing_secret_key_rejected() {
        let result: Result<Config, _> =
            envy::from_iter(vars(&[("DATABASE_URL", "postgres://localhost/yamdb")]));
        assert!(result.is_err());
    }
}
