//! User management HTTP handlers.
//!
//! Admin only:
//! - GET /api/v1/users - List users, `?search=` on username
//! - POST /api/v1/users - Create a user
//! - GET /api/v1/users/{username} - Get one user
//! - PATCH /api/v1/users/{username} - Update a user, role included
//! - DELETE /api/v1/users/{username} - Delete a user
//!
//! Any authenticated user:
//! - GET /api/v1/users/me - Own profile
//! - PATCH /api/v1/users/me - Update own profile (role is ignored)

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
};

use crate::{
    db::{DbPool, contains_pattern},
    error::AppError,
    handlers::{JsonBody, PathParams, QueryParams},
    middleware::auth::CurrentUser,
    models::user::{
        CreateUserRequest, Role, USER_COLUMNS, UpdateUserRequest, User, UserListQuery,
        UserResponse,
    },
    pagination::{Page, resolve_page},
    permissions::require_admin,
    state::AppState,
    validation::{
        FieldErrors, validate_email, validate_no_null, validate_person_name, validate_username,
    },
};

/// List users, newest first.
///
/// # Query Parameters
///
/// - `search` - case-insensitive substring of the username
/// - `page` - page number
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<UserListQuery>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    require_admin(&user)?;

    let pattern = query.search.as_deref().map(contains_pattern);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR username ILIKE $1)")
            .bind(&pattern)
            .fetch_one(&state.pool)
            .await?;

    let window = resolve_page(count, query.page, state.config.page_size)?;

    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE ($1::text IS NULL OR username ILIKE $1)
        ORDER BY date_joined DESC, id DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(window.page_size)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    let results = users.into_iter().map(Into::into).collect();
    Ok(Json(window.into_page(results, &uri)))
}

/// Create a user on behalf of an admin.
///
/// # Response
///
/// - **Success (201 Created)**: the new user
/// - **Error (400)**: invalid fields, unknown role, taken username or email
pub async fn create_user(
    State(pool): State<DbPool>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_admin(&user)?;

    let mut errors = FieldErrors::default();
    let username = errors.require("username", request.username);
    let email = errors.require("email", request.email);
    if let Some(username) = &username {
        validate_username(&mut errors, username);
    }
    if let Some(email) = &email {
        validate_email(&mut errors, email);
    }
    validate_person_name(&mut errors, "first_name", &request.first_name);
    validate_person_name(&mut errors, "last_name", &request.last_name);
    validate_no_null(&mut errors, "bio", &request.bio);
    let role = parse_role(&mut errors, request.role.as_deref()).unwrap_or(Role::User);
    errors.finish()?;
    let username = username.unwrap_or_default();
    let email = email.unwrap_or_default();

    check_taken(&pool, None, Some(&username), Some(&email)).await?;

    let created = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, first_name, last_name, bio, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&username)
    .bind(&email)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&request.bio)
    .bind(role.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::unique_violation(e, "username", "A user with this username or email already exists.")
    })?;

    tracing::info!(username = %created.username, by = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a user by username.
pub async fn get_user(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(username): PathParams<String>,
) -> Result<Json<UserResponse>, AppError> {
    require_admin(&user)?;
    let target = find_by_username(&pool, &username).await?;
    Ok(Json(target.into()))
}

/// Partially update a user, including their role.
pub async fn update_user(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(username): PathParams<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    require_admin(&user)?;
    let target = find_by_username(&pool, &username).await?;
    let updated = apply_update(&pool, &target, request, true).await?;
    Ok(Json(updated.into()))
}

/// Delete a user; their reviews and comments go with them.
pub async fn delete_user(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(username): PathParams<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(&username)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(%username, by = %user.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user's own profile.
pub async fn get_me(
    State(pool): State<DbPool>,
    user: CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let me = find_by_id(&pool, user.id).await?;
    Ok(Json(me.into()))
}

/// Update the authenticated user's own profile.
///
/// A `role` in the body is ignored: nobody promotes themselves.
pub async fn update_me(
    State(pool): State<DbPool>,
    user: CurrentUser,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let me = find_by_id(&pool, user.id).await?;
    let updated = apply_update(&pool, &me, request, false).await?;
    Ok(Json(updated.into()))
}

async fn find_by_username(pool: &DbPool, username: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

async fn find_by_id(pool: &DbPool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Validate and write the present fields of `request` onto `target`.
async fn apply_update(
    pool: &DbPool,
    target: &User,
    request: UpdateUserRequest,
    allow_role_change: bool,
) -> Result<User, AppError> {
    let mut errors = FieldErrors::default();
    if let Some(username) = &request.username {
        validate_username(&mut errors, username);
    }
    if let Some(email) = &request.email {
        validate_email(&mut errors, email);
    }
    if let Some(first_name) = &request.first_name {
        validate_person_name(&mut errors, "first_name", first_name);
    }
    if let Some(last_name) = &request.last_name {
        validate_person_name(&mut errors, "last_name", last_name);
    }
    if let Some(bio) = &request.bio {
        validate_no_null(&mut errors, "bio", bio);
    }
    let role = if allow_role_change {
        parse_role(&mut errors, request.role.as_deref())
    } else {
        None
    };
    errors.finish()?;

    check_taken(
        pool,
        Some(target.id),
        request.username.as_deref(),
        request.email.as_deref(),
    )
    .await?;

    let updated = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            email = COALESCE($2, email),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            bio = COALESCE($5, bio),
            role = COALESCE($6, role)
        WHERE id = $7
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(request.username)
    .bind(request.email)
    .bind(request.first_name)
    .bind(request.last_name)
    .bind(request.bio)
    .bind(role.map(Role::as_str))
    .bind(target.id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        AppError::unique_violation(e, "username", "A user with this username or email already exists.")
    })?
    .ok_or(AppError::NotFound("User"))?;

    Ok(updated)
}

fn parse_role(errors: &mut FieldErrors, role: Option<&str>) -> Option<Role> {
    match role.map(str::parse::<Role>) {
        Some(Ok(role)) => Some(role),
        Some(Err(message)) => {
            errors.add("role", message);
            None
        }
        None => None,
    }
}

/// Report usernames or emails already held by a user other than `except_id`.
async fn check_taken(
    pool: &DbPool,
    except_id: Option<i64>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), AppError> {
    let taken: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT username, email FROM users
        WHERE (username = $1 OR email = $2)
          AND ($3::bigint IS NULL OR id <> $3)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(except_id)
    .fetch_all(pool)
    .await?;

    let mut errors = FieldErrors::default();
    if username.is_some_and(|username| taken.iter().any(|(u, _)| u == username)) {
        errors.add("username", "A user with this username already exists.");
    }
    if email.is_some_and(|email| taken.iter().any(|(_, e)| e == email)) {
        errors.add("email", "A user with this email already exists.");
    }
    errors.finish()
}
