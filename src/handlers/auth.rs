//! Registration HTTP handlers.
//!
//! - POST /api/v1/auth/signup - Register and receive a confirmation code by mail
//! - POST /api/v1/auth/token - Exchange the code for an access token
//!
//! Both endpoints are public.

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    handlers::JsonBody,
    models::user::{SignUpRequest, SignUpResponse, TokenRequest, TokenResponse},
    services::auth_service,
    state::AppState,
};

/// Register a user and mail a confirmation code.
///
/// # Request Body
///
/// ```json
/// { "email": "critic@example.com", "username": "critic" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: echoes `email` and `username`
/// - **Error (400)**: invalid fields, or username/email taken by someone else
///
/// Repeating the request with the same pair sends a new code.
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignUpRequest>,
) -> Result<Json<SignUpResponse>, AppError> {
    let response = auth_service::sign_up(&state, request).await?;
    Ok(Json(response))
}

/// Exchange username and confirmation code for an access token.
///
/// # Request Body
///
/// ```json
/// { "username": "critic", "confirmation_code": "3f2c9a..." }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"token": "..."}`
/// - **Error (400)**: missing field or wrong/expired code
/// - **Error (404)**: unknown username
pub async fn obtain_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let response = auth_service::obtain_token(&state, request).await?;
    Ok(Json(response))
}
