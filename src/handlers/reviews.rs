//! Review HTTP handlers.
//!
//! This module implements the review endpoints, nested under a title:
//! - GET /api/v1/titles/{title_id}/reviews - List, newest first (public)
//! - GET /api/v1/titles/{title_id}/reviews/{review_id} - Get one (public)
//! - POST /api/v1/titles/{title_id}/reviews - Create (authenticated)
//! - PATCH /api/v1/titles/{title_id}/reviews/{review_id} - Update (author or staff)
//! - DELETE /api/v1/titles/{title_id}/reviews/{review_id} - Delete (author or staff)
//!
//! Each user reviews a title at most once; the title's rating is the
//! average of its review scores.

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
    models::review::{
        CreateReviewRequest, ListQuery, Review, ReviewResponse, UpdateReviewRequest,
    },
    pagination::{Page, resolve_page},
    permissions::require_author_or_staff,
    state::AppState,
    validation::{FieldErrors, validate_score, validate_text},
};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, t.name AS title_name,
           r.author_id, u.username AS author_username,
           r.text, r.score, r.pub_date
    FROM reviews r
    JOIN titles t ON t.id = r.title_id
    JOIN users u ON u.id = r.author_id
"#;

pub async fn list_reviews(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    PathParams(title_id): PathParams<i64>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<ReviewResponse>>, AppError> {
    ensure_title_exists(&state.pool, title_id).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
        .bind(title_id)
        .fetch_one(&state.pool)
        .await?;

    let window = resolve_page(count, query.page, state.config.page_size)?;

    let reviews = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(title_id)
    .bind(window.page_size)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    let results = reviews.into_iter().map(Into::into).collect();
    Ok(Json(window.into_page(results, &uri)))
}

pub async fn get_review(
    State(pool): State<DbPool>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
) -> Result<Json<ReviewResponse>, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    Ok(Json(review.into()))
}

/// Post a review of a title.
///
/// # Request Body
///
/// ```json
/// { "text": "Slow but rewarding.", "score": 8 }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the review
/// - **Error (400)**: invalid text or score, or the user already reviewed this title
/// - **Error (401)**: anonymous request
/// - **Error (404)**: no such title
pub async fn create_review(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams(title_id): PathParams<i64>,
    JsonBody(request): JsonBody<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    ensure_title_exists(&pool, title_id).await?;

    let mut errors = FieldErrors::default();
    let text = errors.require("text", request.text);
    let score = errors.require("score", request.score);
    if let Some(text) = &text {
        validate_text(&mut errors, text);
    }
    if let Some(score) = score {
        validate_score(&mut errors, score);
    }
    errors.finish()?;

    let already_reviewed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
    )
    .bind(title_id)
    .bind(user.id)
    .fetch_one(&pool)
    .await?;

    if already_reviewed {
        return Err(already_reviewed_error());
    }

    let review_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO reviews (title_id, author_id, text, score)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(title_id)
    .bind(user.id)
    .bind(text.unwrap_or_default())
    .bind(score.unwrap_or_default())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            already_reviewed_error()
        } else {
            AppError::Database(e)
        }
    })?;

    let review = find_review(&pool, title_id, review_id).await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// Edit a review's text or score.
pub async fn update_review(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    JsonBody(request): JsonBody<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    require_author_or_staff(&user, review.author_id)?;

    let mut errors = FieldErrors::default();
    if let Some(text) = &request.text {
        validate_text(&mut errors, text);
    }
    if let Some(score) = request.score {
        validate_score(&mut errors, score);
    }
    errors.finish()?;

    sqlx::query(
        r#"
        UPDATE reviews
        SET text = COALESCE($1, text),
            score = COALESCE($2, score)
        WHERE id = $3
        "#,
    )
    .bind(request.text)
    .bind(request.score)
    .bind(review.id)
    .execute(&pool)
    .await?;

    let review = find_review(&pool, title_id, review_id).await?;
    Ok(Json(review.into()))
}

/// Delete a review together with its comments.
pub async fn delete_review(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    require_author_or_staff(&user, review.author_id)?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_title_exists(pool: &DbPool, title_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
        .bind(title_id)
        .fetch_one(pool)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound("Title"))
    }
}

/// Load a review, requiring that it belongs to `title_id`.
pub(crate) async fn find_review(pool: &DbPool, title_id: i64, review_id: i64) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2"))
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Review"))
}

fn already_reviewed_error() -> AppError {
    AppError::field(
        "non_field_errors",
        "You have already reviewed this title.",
    )
}
