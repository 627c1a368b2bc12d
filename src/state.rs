//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, db::DbPool, services::mailer::Mailer};

/// State handed to every handler and middleware.
///
/// Handlers that only need the database keep extracting `State<DbPool>`;
/// the pool is pulled out of this struct through [`FromRef`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, mailer: Mailer) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            mailer,
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
