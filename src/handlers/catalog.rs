//! Category and genre HTTP handlers.
//!
//! Categories and genres expose the same three operations:
//! - GET /api/v1/{categories,genres} - List, `?search=` on name (public)
//! - POST /api/v1/{categories,genres} - Create (admin)
//! - DELETE /api/v1/{categories,genres}/{slug} - Delete (admin)
//!
//! Deleting a category leaves its titles uncategorized; deleting a genre
//! unlinks it from its titles.

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::{StatusCode, Uri},
};

use crate::{
    db::{DbPool, contains_pattern},
    error::AppError,
    handlers::{JsonBody, PathParams, QueryParams},
    middleware::auth::CurrentUser,
    models::catalog::{
        CatalogItem, CatalogItemResponse, CatalogKind, CatalogListQuery, CreateCatalogItemRequest,
    },
    pagination::{Page, resolve_page},
    permissions::require_admin,
    state::AppState,
    validation::{FieldErrors, validate_name, validate_slug},
};

pub async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<CatalogListQuery>,
) -> Result<Json<Page<CatalogItemResponse>>, AppError> {
    list_items(&state, CatalogKind::Category, query, &uri).await
}

pub async fn create_category(
    State(pool): State<DbPool>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItemResponse>), AppError> {
    create_item(&pool, &user, CatalogKind::Category, request).await
}

pub async fn delete_category(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(slug): PathParams<String>,
) -> Result<StatusCode, AppError> {
    delete_item(&pool, &user, CatalogKind::Category, &slug).await
}

pub async fn list_genres(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<CatalogListQuery>,
) -> Result<Json<Page<CatalogItemResponse>>, AppError> {
    list_items(&state, CatalogKind::Genre, query, &uri).await
}

pub async fn create_genre(
    State(pool): State<DbPool>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItemResponse>), AppError> {
    create_item(&pool, &user, CatalogKind::Genre, request).await
}

pub async fn delete_genre(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(slug): PathParams<String>,
) -> Result<StatusCode, AppError> {
    delete_item(&pool, &user, CatalogKind::Genre, &slug).await
}

/// Page through one dictionary ordered by name.
async fn list_items(
    state: &AppState,
    kind: CatalogKind,
    query: CatalogListQuery,
    uri: &Uri,
) -> Result<Json<Page<CatalogItemResponse>>, AppError> {
    let table = kind.table();
    let pattern = query.search.as_deref().map(contains_pattern);

    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE ($1::text IS NULL OR name ILIKE $1)"
    ))
    .bind(&pattern)
    .fetch_one(&state.pool)
    .await?;

    let window = resolve_page(count, query.page, state.config.page_size)?;

    let items = sqlx::query_as::<_, CatalogItemResponse>(&format!(
        r#"
        SELECT name, slug FROM {table}
        WHERE ($1::text IS NULL OR name ILIKE $1)
        ORDER BY name, id
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(window.page_size)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(window.into_page(items, uri)))
}

/// Insert a new entry.
///
/// # Request Body
///
/// ```json
/// { "name": "Fantasy", "slug": "fantasy" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: `{name, slug}`
/// - **Error (400)**: invalid name or slug, slug already used
/// - **Error (401/403)**: not an admin
async fn create_item(
    pool: &DbPool,
    user: &CurrentUser,
    kind: CatalogKind,
    request: CreateCatalogItemRequest,
) -> Result<(StatusCode, Json<CatalogItemResponse>), AppError> {
    require_admin(user)?;

    let mut errors = FieldErrors::default();
    let name = errors.require("name", request.name);
    let slug = errors.require("slug", request.slug);
    if let Some(name) = &name {
        validate_name(&mut errors, name);
    }
    if let Some(slug) = &slug {
        validate_slug(&mut errors, slug);
    }
    errors.finish()?;

    let item = sqlx::query_as::<_, CatalogItem>(&format!(
        "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        kind.table()
    ))
    .bind(name.unwrap_or_default())
    .bind(slug.unwrap_or_default())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::unique_violation(e, "slug", "This slug is already in use."))?;

    tracing::info!(slug = %item.slug, kind = kind.resource(), "Catalog entry created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn delete_item(
    pool: &DbPool,
    user: &CurrentUser,
    kind: CatalogKind,
    slug: &str,
) -> Result<StatusCode, AppError> {
    require_admin(user)?;

    let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", kind.table()))
        .bind(slug)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(kind.resource()));
    }

    Ok(StatusCode::NO_CONTENT)
}
