//! Bearer token authentication middleware.
//!
//! This middleware runs in front of every API route to:
//! 1. Extract the token from the Authorization header, if any
//! 2. Verify its signature and expiry
//! 3. Load the user it names and inject a [`CurrentUser`] into the request
//! 4. Reject bad tokens with HTTP 401
//!
//! Requests without the header pass through anonymously; handlers that need
//! a user extract [`CurrentUser`], which answers 401 when there is none.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::user::{Role, User, USER_COLUMNS},
    services::token_service,
    state::AppState,
};

/// Authenticated user attached to the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl CurrentUser {
    /// Admin role or superuser flag.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role(),
            is_superuser: user.is_superuser,
        }
    }
}

/// Authentication middleware function.
///
/// # Flow
///
/// 1. No `Authorization` header: continue anonymously
/// 2. Header present: require `Bearer <token>`
/// 3. Verify the token against `SECRET_KEY`
/// 4. Load the user; a deleted user invalidates the token
/// 5. Inject `CurrentUser`, call next handler
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::InvalidToken)?;

    let user_id = token_service::verify_access_token(&state.config.secret_key, token, Utc::now())?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::InvalidToken)?;

    // Route handlers pick this up through the CurrentUser extractor
    request.extensions_mut().insert(CurrentUser::from(&user));

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::NotAuthenticated)
    }
}

