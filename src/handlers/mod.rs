//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Checks the caller's permissions
//! 3. Performs business logic (database queries, validation)
//! 4. Returns HTTP response (JSON, status code)

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, RawPathParams, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Sign-up and token exchange
pub mod auth;
/// Category and genre dictionaries
pub mod catalog;
/// Comments on reviews
pub mod comments;
/// Service health
pub mod health;
/// Reviews of titles
pub mod reviews;
/// Reviewed works
pub mod titles;
/// User management and `/users/me`
pub mod users;

/// JSON body extractor reporting malformed bodies through [`AppError`].
///
/// Plain `Json` answers with its own plain-text rejections; this keeps every
/// 4xx in the `{"error": {...}}` shape.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Path extractor for ids and slugs.
///
/// A capture that does not parse, or that holds a NUL character, cannot name
/// a stored row, so it is answered with 404 in the usual error shape.
pub struct PathParams<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound("Resource"))?;
        if raw.iter().any(|(_, value)| value.contains('\0')) {
            return Err(AppError::NotFound("Resource"));
        }

        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("Unmatched path parameters: {}", rejection.body_text());
                AppError::NotFound("Resource")
            })?;
        Ok(PathParams(value))
    }
}

/// Query string extractor reporting bad filters as `invalid_request`.
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let has_nul = parts.uri.query().is_some_and(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(key, value)| key.contains('\0') || value.contains('\0'))
        });
        if has_nul {
            return Err(AppError::InvalidRequest(
                "Null characters are not allowed.".to_string(),
            ));
        }

        let Query(value) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
        Ok(QueryParams(value))
    }
}
