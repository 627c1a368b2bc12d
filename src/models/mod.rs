//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built from them.

/// Category and genre dictionaries
pub mod catalog;
/// Reviews and comments
pub mod review;
/// Reviewed works
pub mod title;
/// Accounts, roles and auth payloads
pub mod user;
