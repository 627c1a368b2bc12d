//! Sign-up and token exchange.
//!
//! # Flow
//!
//! 1. `sign_up` creates the user (or finds the matching one) and mails a
//!    fresh confirmation code
//! 2. `obtain_token` trades username + code for a signed access token
//!
//! Re-running sign-up with the same username and email re-issues the code,
//! which invalidates the previous one.

use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{
        SignUpRequest, SignUpResponse, TokenRequest, TokenResponse, User, USER_COLUMNS,
    },
    services::{
        mailer::OutgoingMail,
        token_service::{self, confirmation_code_matches},
    },
    state::AppState,
    validation::{FieldErrors, validate_email, validate_no_null, validate_username},
};

/// Register a user, or re-issue the code of an existing one.
///
/// # Errors
///
/// - `Validation`: bad fields, or the username/email pair clashes with other users
/// - `Mail`: the code could not be delivered
/// - `Database`: database error occurred
pub async fn sign_up(state: &AppState, request: SignUpRequest) -> Result<SignUpResponse, AppError> {
    let mut errors = FieldErrors::default();
    let email = errors.require("email", request.email);
    let username = errors.require("username", request.username);
    if let Some(email) = &email {
        validate_email(&mut errors, email);
    }
    if let Some(username) = &username {
        validate_username(&mut errors, username);
    }
    errors.finish()?;
    let email = email.unwrap_or_default();
    let username = username.unwrap_or_default();

    let user = find_or_create_user(&state.pool, &username, &email).await?;

    let code = issue_confirmation_code(&state.pool, user.id).await?;
    let mail = OutgoingMail::confirmation_code(&state.config.mail_from, &user.email, &code);
    state.mailer.send(&mail).await?;

    tracing::info!(username = %user.username, "Confirmation code sent");

    Ok(SignUpResponse {
        email: user.email,
        username: user.username,
    })
}

/// Match the pair against existing users; create a new `user` role account
/// only when neither half is taken.
async fn find_or_create_user(pool: &DbPool, username: &str, email: &str) -> Result<User, AppError> {
    let candidates = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2"
    ))
    .bind(username)
    .bind(email)
    .fetch_all(pool)
    .await?;

    if let Some(user) = candidates
        .iter()
        .find(|u| u.username == username && u.email == email)
    {
        return Ok(user.clone());
    }

    let mut errors = FieldErrors::default();
    if candidates.iter().any(|u| u.email == email) {
        errors.add("email", "A user with this email already exists.");
    }
    if candidates.iter().any(|u| u.username == username) {
        errors.add("username", "A user with this username already exists.");
    }
    errors.finish()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    ))
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::unique_violation(e, "username", "A user with this username or email already exists.")
    })?;

    tracing::info!(username = %user.username, "User registered");
    Ok(user)
}

/// Store the hash of a new code for `user_id` and return the plain code.
pub async fn issue_confirmation_code(pool: &DbPool, user_id: i64) -> Result<String, AppError> {
    let code = token_service::generate_confirmation_code();

    sqlx::query(
        r#"
        UPDATE users
        SET confirmation_code_hash = $1,
            confirmation_code_issued_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(token_service::hash_confirmation_code(&code))
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(code)
}

/// Exchange username and confirmation code for an access token.
///
/// # Errors
///
/// - `Validation`: missing fields or wrong/expired code
/// - `NotFound`: no such username
pub async fn obtain_token(state: &AppState, request: TokenRequest) -> Result<TokenResponse, AppError> {
    let mut errors = FieldErrors::default();
    let username = errors.require("username", request.username);
    let code = errors.require("confirmation_code", request.confirmation_code);
    if let Some(username) = &username {
        validate_no_null(&mut errors, "username", username);
    }
    if let Some(code) = &code {
        validate_no_null(&mut errors, "confirmation_code", code);
    }
    errors.finish()?;
    let username = username.unwrap_or_default();
    let code = code.unwrap_or_default();

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(&username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("User"))?;

    let now = Utc::now();
    if !confirmation_code_matches(
        &code,
        user.confirmation_code_hash.as_deref(),
        user.confirmation_code_issued_at,
        state.config.confirmation_code_ttl_secs,
        now,
    ) {
        tracing::warn!(username = %user.username, "Rejected confirmation code");
        return Err(AppError::field(
            "confirmation_code",
            "Invalid confirmation code.",
        ));
    }

    let token = token_service::issue_access_token(
        &state.config.secret_key,
        user.id,
        state.config.access_token_ttl_secs,
        now,
    );

    Ok(TokenResponse { token })
}

/// Create or promote a superuser and hand back a confirmation code for it.
///
/// Used by the `create-superuser` command; bypasses the mailer so the
/// operator sees the code directly. Promoting an existing user requires
/// the email on record.
pub async fn bootstrap_superuser(
    pool: &DbPool,
    username: &str,
    email: &str,
) -> Result<(User, String), AppError> {
    let mut errors = FieldErrors::default();
    validate_username(&mut errors, username);
    validate_email(&mut errors, email);
    errors.finish()?;

    let existing_email: Option<String> =
        sqlx::query_scalar("SELECT email FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    if existing_email.is_some_and(|existing| existing != email) {
        return Err(AppError::field(
            "email",
            format!("User '{username}' already exists with a different email."),
        ));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, role, is_superuser)
        VALUES ($1, $2, 'admin', TRUE)
        ON CONFLICT (username) DO UPDATE
        SET role = 'admin', is_superuser = TRUE
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::unique_violation(e, "email", "A user with this email already exists."))?;

    let code = issue_confirmation_code(pool, user.id).await?;
    Ok((user, code))
}
