//! Title service - reads and writes of titles with their genres.
//!
//! This service handles:
//! - Rating aggregation (`AVG` over review scores, computed per read)
//! - List filtering by name, year, genre and category
//! - Resolving genre and category slugs on write
//! - Keeping `titles` and `genre_title` consistent inside one transaction

use std::collections::{BTreeSet, HashMap};

use axum::http::Uri;
use sqlx::{Postgres, Transaction};

use crate::{
    db::{DbPool, contains_pattern},
    error::AppError,
    models::{
        catalog::CatalogItemResponse,
        title::{
            CreateTitleRequest, TitleGenreRow, TitleListQuery, TitleResponse, TitleRow,
            UpdateTitleRequest,
        },
    },
    pagination::{Page, resolve_page},
    validation::{FieldErrors, validate_name, validate_no_null, validate_year},
};

/// Select list producing [`TitleRow`]s. Callers append WHERE/ORDER clauses.
const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           c.name AS category_name, c.slug AS category_slug,
           (SELECT AVG(r.score)::float8 FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

/// Shared filter over `titles t` / `categories c`; parameters $1..$4 are
/// name pattern, year, genre slug, category slug, each NULL when unused.
const TITLE_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR t.name ILIKE $1)
      AND ($2::int IS NULL OR t.year = $2)
      AND ($3::text IS NULL OR EXISTS (
            SELECT 1 FROM genre_title gt
            JOIN genres g ON g.id = gt.genre_id
            WHERE gt.title_id = t.id AND g.slug = $3))
      AND ($4::text IS NULL OR c.slug = $4)
"#;

/// List titles matching the query, one page at a time.
///
/// # Ordering
///
/// By rating ascending with unrated titles last, then by id.
pub async fn list_titles(
    pool: &DbPool,
    query: TitleListQuery,
    page_size: i64,
    uri: &Uri,
) -> Result<Page<TitleResponse>, AppError> {
    let name_pattern = query.name.as_deref().map(contains_pattern);

    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id {TITLE_FILTER}"
    ))
    .bind(&name_pattern)
    .bind(query.year)
    .bind(&query.genre)
    .bind(&query.category)
    .fetch_one(pool)
    .await?;

    let window = resolve_page(count, query.page, page_size)?;

    let rows = sqlx::query_as::<_, TitleRow>(&format!(
        "{TITLE_SELECT} {TITLE_FILTER} ORDER BY rating ASC NULLS LAST, t.id LIMIT $5 OFFSET $6"
    ))
    .bind(&name_pattern)
    .bind(query.year)
    .bind(&query.genre)
    .bind(&query.category)
    .bind(window.page_size)
    .bind(window.offset)
    .fetch_all(pool)
    .await?;

    let titles = attach_genres(pool, rows).await?;
    Ok(window.into_page(titles, uri))
}

/// Fetch one title with its genres and rating.
pub async fn get_title(pool: &DbPool, title_id: i64) -> Result<TitleResponse, AppError> {
    let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = $1"))
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Title"))?;

    let mut titles = attach_genres(pool, vec![row]).await?;
    titles.pop().ok_or(AppError::NotFound("Title"))
}

/// Load genres for all `rows` in one query and build responses in row order.
async fn attach_genres(pool: &DbPool, rows: Vec<TitleRow>) -> Result<Vec<TitleResponse>, AppError> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let genre_rows = sqlx::query_as::<_, TitleGenreRow>(
        r#"
        SELECT gt.title_id, g.name, g.slug
        FROM genre_title gt
        JOIN genres g ON g.id = gt.genre_id
        WHERE gt.title_id = ANY($1)
        ORDER BY g.name, g.id
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_title: HashMap<i64, Vec<CatalogItemResponse>> = HashMap::new();
    for genre in genre_rows {
        by_title
            .entry(genre.title_id)
            .or_default()
            .push(CatalogItemResponse {
                name: genre.name,
                slug: genre.slug,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let genres = by_title.remove(&row.id).unwrap_or_default();
            TitleResponse::from_parts(row, genres)
        })
        .collect())
}

/// Create a title and link its genres.
///
/// # Process
///
/// 1. Validate scalar fields
/// 2. Resolve category and genre slugs (unknown slugs are field errors)
/// 3. Insert title and genre links in one transaction
///
/// # Errors
///
/// - `Validation`: invalid fields or unknown slugs
/// - `Database`: database error occurred
pub async fn create_title(pool: &DbPool, request: CreateTitleRequest) -> Result<TitleResponse, AppError> {
    let mut errors = FieldErrors::default();
    let name = errors.require("name", request.name);
    let year = errors.require("year", request.year);
    let genre = errors.require("genre", request.genre);
    let category = errors.require("category", request.category);
    validate_title_fields(
        &mut errors,
        name.as_deref(),
        year,
        request.description.as_deref(),
        genre.as_deref(),
    );

    let mut tx = pool.begin().await?;

    let category_id = match &category {
        Some(slug) => resolve_category(&mut tx, slug, &mut errors).await?,
        None => None,
    };
    let genre_ids = match &genre {
        Some(slugs) => resolve_genres(&mut tx, slugs, &mut errors).await?,
        None => Vec::new(),
    };
    errors.finish()?;

    let title_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO titles (name, year, description, category_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name.unwrap_or_default())
    .bind(year.unwrap_or_default())
    .bind(request.description.unwrap_or_default())
    .bind(category_id)
    .fetch_one(&mut *tx)
    .await?;

    link_genres(&mut tx, title_id, &genre_ids).await?;

    tx.commit().await?;

    tracing::info!(title_id, "Title created");
    get_title(pool, title_id).await
}

/// Apply a partial update; a present genre list replaces existing links.
pub async fn update_title(
    pool: &DbPool,
    title_id: i64,
    request: UpdateTitleRequest,
) -> Result<TitleResponse, AppError> {
    let mut tx = pool.begin().await?;

    // Lock the row so concurrent genre replacements serialize
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
        .bind(title_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        tx.rollback().await?;
        return Err(AppError::NotFound("Title"));
    }

    let mut errors = FieldErrors::default();
    validate_title_fields(
        &mut errors,
        request.name.as_deref(),
        request.year,
        request.description.as_deref(),
        request.genre.as_deref(),
    );

    let category_id = match &request.category {
        Some(slug) => resolve_category(&mut tx, slug, &mut errors).await?,
        None => None,
    };
    let genre_ids = match &request.genre {
        Some(slugs) => Some(resolve_genres(&mut tx, slugs, &mut errors).await?),
        None => None,
    };
    errors.finish()?;

    sqlx::query(
        r#"
        UPDATE titles
        SET name = COALESCE($1, name),
            year = COALESCE($2, year),
            description = COALESCE($3, description),
            category_id = COALESCE($4, category_id)
        WHERE id = $5
        "#,
    )
    .bind(request.name)
    .bind(request.year)
    .bind(request.description)
    .bind(category_id)
    .bind(title_id)
    .execute(&mut *tx)
    .await?;

    if let Some(genre_ids) = genre_ids {
        sqlx::query("DELETE FROM genre_title WHERE title_id = $1")
            .bind(title_id)
            .execute(&mut *tx)
            .await?;
        link_genres(&mut tx, title_id, &genre_ids).await?;
    }

    tx.commit().await?;

    get_title(pool, title_id).await
}

fn validate_title_fields(
    errors: &mut FieldErrors,
    name: Option<&str>,
    year: Option<i32>,
    description: Option<&str>,
    genre: Option<&[String]>,
) {
    if let Some(name) = name {
        validate_name(errors, name);
    }
    if let Some(year) = year {
        validate_year(errors, year);
    }
    if let Some(description) = description {
        validate_no_null(errors, "description", description);
    }
    if genre.is_some_and(|slugs| slugs.is_empty()) {
        errors.add("genre", "At least one genre is required.");
    }
}

async fn resolve_category(
    tx: &mut Transaction<'_, Postgres>,
    slug: &str,
    errors: &mut FieldErrors,
) -> Result<Option<i64>, AppError> {
    if !validate_no_null(errors, "category", slug) {
        return Ok(None);
    }

    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?;

    if id.is_none() {
        errors.add("category", format!("Category with slug '{slug}' does not exist."));
    }
    Ok(id)
}

async fn resolve_genres(
    tx: &mut Transaction<'_, Postgres>,
    slugs: &[String],
    errors: &mut FieldErrors,
) -> Result<Vec<i64>, AppError> {
    let mut wanted = BTreeSet::new();
    for slug in slugs {
        if validate_no_null(errors, "genre", slug) {
            wanted.insert(slug.as_str());
        }
    }
    let wanted: Vec<&str> = wanted.into_iter().collect();

    let found: Vec<(i64, String)> = sqlx::query_as("SELECT id, slug FROM genres WHERE slug = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut **tx)
        .await?;

    for slug in &wanted {
        if !found.iter().any(|(_, s)| s == slug) {
            errors.add("genre", format!("Genre with slug '{slug}' does not exist."));
        }
    }

    Ok(found.into_iter().map(|(id, _)| id).collect())
}

async fn link_genres(
    tx: &mut Transaction<'_, Postgres>,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO genre_title (title_id, genre_id)
        SELECT $1, UNNEST($2::bigint[])
        ON CONFLICT (title_id, genre_id) DO NOTHING
        "#,
    )
    .bind(title_id)
    .bind(genre_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
