//! Title HTTP handlers.
//!
//! This module implements the title endpoints:
//! - GET /api/v1/titles - List with filters (public)
//! - GET /api/v1/titles/{title_id} - Get one title (public)
//! - POST /api/v1/titles - Create (admin)
//! - PATCH /api/v1/titles/{title_id} - Partial update (admin)
//! - DELETE /api/v1/titles/{title_id} - Delete with its reviews (admin)

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::{JsonBody, PathParams, QueryParams},
    middleware::auth::CurrentUser,
    models::title::{CreateTitleRequest, TitleListQuery, TitleResponse, UpdateTitleRequest},
    pagination::Page,
    permissions::require_admin,
    services::title_service,
    state::AppState,
};

/// List titles.
///
/// # Query Parameters
///
/// - `name` - substring of the name, case-insensitive
/// - `year` - exact release year
/// - `genre` - genre slug
/// - `category` - category slug
/// - `page` - page number
pub async fn list_titles(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<TitleListQuery>,
) -> Result<Json<Page<TitleResponse>>, AppError> {
    let page = title_service::list_titles(&state.pool, query, state.config.page_size, &uri).await?;
    Ok(Json(page))
}

/// Get a title with its genres, category and rating.
pub async fn get_title(
    State(pool): State<DbPool>,
    PathParams(title_id): PathParams<i64>,
) -> Result<Json<TitleResponse>, AppError> {
    let title = title_service::get_title(&pool, title_id).await?;
    Ok(Json(title))
}

/// Create a title.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Solaris",
///   "year": 1972,
///   "description": "Psychologist sent to a station orbiting an ocean planet",
///   "genre": ["drama", "sci-fi"],
///   "category": "movie"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the title as returned by GET
/// - **Error (400)**: invalid fields or unknown slugs
/// - **Error (401/403)**: not an admin
pub async fn create_title(
    State(pool): State<DbPool>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateTitleRequest>,
) -> Result<(StatusCode, Json<TitleResponse>), AppError> {
    require_admin(&user)?;
    let title = title_service::create_title(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// Partially update a title.
pub async fn update_title(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(title_id): PathParams<i64>,
    JsonBody(request): JsonBody<UpdateTitleRequest>,
) -> Result<Json<TitleResponse>, AppError> {
    require_admin(&user)?;
    let title = title_service::update_title(&pool, title_id, request).await?;
    Ok(Json(title))
}

/// Delete a title. Reviews, comments and genre links cascade.
pub async fn delete_title(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(title_id): PathParams<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    let result = sqlx::query("DELETE FROM titles WHERE id = $1")
        .bind(title_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title"));
    }

    tracing::info!(title_id, by = %user.username, "Title deleted");
    Ok(StatusCode::NO_CONTENT)
}
