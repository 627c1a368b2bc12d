//! Business logic kept out of the HTTP handlers.

/// Sign-up, token exchange, superuser bootstrap
pub mod auth_service;
/// Seed data loading from CSV
pub mod import_service;
/// Outgoing mail backends
pub mod mailer;
/// Title queries and writes
pub mod title_service;
/// Access tokens and confirmation codes
pub mod token_service;
