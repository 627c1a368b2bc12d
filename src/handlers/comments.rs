//! Comment HTTP handlers, nested under a review.
//!
//! - GET .../reviews/{review_id}/comments - List, newest first (public)
//! - GET .../comments/{comment_id} - Get one (public)
//! - POST .../reviews/{review_id}/comments - Create (authenticated)
//! - PATCH .../comments/{comment_id} - Update (author or staff)
//! - DELETE .../comments/{comment_id} - Delete (author or staff)
//!
//! Every route 404s unless the review belongs to the title in the path.

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::{JsonBody, PathParams, QueryParams, reviews::find_review},
    middleware::auth::CurrentUser,
    models::review::{Comment, CommentRequest, CommentResponse, ListQuery},
    pagination::{Page, resolve_page},
    permissions::require_author_or_staff,
    state::AppState,
    validation::{FieldErrors, validate_text},
};

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author_username,
           c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

pub async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<CommentResponse>>, AppError> {
    let review = find_review(&state.pool, title_id, review_id).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
        .bind(review.id)
        .fetch_one(&state.pool)
        .await?;

    let window = resolve_page(count, query.page, state.config.page_size)?;

    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date DESC, c.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(review.id)
    .bind(window.page_size)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    let results = comments.into_iter().map(Into::into).collect();
    Ok(Json(window.into_page(results, &uri)))
}

pub async fn get_comment(
    State(pool): State<DbPool>,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = find_comment(&pool, title_id, review_id, comment_id).await?;
    Ok(Json(comment.into()))
}

/// Comment on a review.
///
/// # Request Body
///
/// ```json
/// { "text": "Agreed, the ending is worth it." }
/// ```
pub async fn create_comment(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let review = find_review(&pool, title_id, review_id).await?;

    let mut errors = FieldErrors::default();
    let text = errors.require("text", request.text);
    if let Some(text) = &text {
        validate_text(&mut errors, text);
    }
    errors.finish()?;

    let comment_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (review_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(review.id)
    .bind(user.id)
    .bind(text.unwrap_or_default())
    .fetch_one(&pool)
    .await?;

    let comment = find_comment(&pool, title_id, review_id, comment_id).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn update_comment(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = find_comment(&pool, title_id, review_id, comment_id).await?;
    require_author_or_staff(&user, comment.author_id)?;

    if let Some(text) = &request.text {
        let mut errors = FieldErrors::default();
        validate_text(&mut errors, text);
        errors.finish()?;

        sqlx::query("UPDATE comments SET text = $1 WHERE id = $2")
            .bind(text)
            .bind(comment.id)
            .execute(&pool)
            .await?;
    }

    let comment = find_comment(&pool, title_id, review_id, comment_id).await?;
    Ok(Json(comment.into()))
}

pub async fn delete_comment(
    State(pool): State<DbPool>,
    user: CurrentUser,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let comment = find_comment(&pool, title_id, review_id, comment_id).await?;
    require_author_or_staff(&user, comment.author_id)?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_comment(
    pool: &DbPool,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, AppError> {
    let review = find_review(pool, title_id, review_id).await?;

    sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2"))
        .bind(comment_id)
        .bind(review.id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Comment"))
}
