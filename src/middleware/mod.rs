//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Short-circuit requests (reject bad tokens)

/// Bearer token authentication middleware
pub mod auth;
