//! Review and comment data models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review joined with its title name and author username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub title_name: String,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

/// A comment joined with its author username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Request body for `POST .../reviews`.
///
/// ```json
/// { "text": "Slow but rewarding.", "score": 8 }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i16>,
}

/// Partial update body for `PATCH .../reviews/{review_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i16>,
}

/// Request body for creating or updating a comment.
#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

/// Query parameters for review and comment lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "crate::pagination::deserialize_page")]
    pub page: Option<i64>,
}

/// Public representation of a review.
///
/// `title` is the title's name and `author` the author's username.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub author: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            title: review.title_name,
            text: review.text,
            author: review.author_username,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

/// Public representation of a comment.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub review: i64,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            review: comment.review_id,
            text: comment.text,
            author: comment.author_username,
            pub_date: comment.pub_date,
        }
    }
}
