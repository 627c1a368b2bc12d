//! Title data models and API request/response types.
//!
//! A title is a reviewed work. It belongs to at most one category, to any
//! number of genres through the `genre_title` table, and carries a rating
//! computed from its reviews at read time.

use serde::{Deserialize, Serialize};

use crate::models::catalog::CatalogItemResponse;

/// A title joined with its category and aggregated rating.
///
/// Produced by the select in `services::title_service`; the rating is
/// `AVG(reviews.score)` cast to double precision, `None` when unreviewed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub rating: Option<f64>,
}

/// One genre attached to one title.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleGenreRow {
    pub title_id: i64,
    pub name: String,
    pub slug: String,
}

/// Request body for `POST /api/v1/titles`.
///
/// Genres and category are referenced by slug.
///
/// ```json
/// {
///   "name": "Solaris",
///   "year": 1972,
///   "description": "",
///   "genre": ["drama", "sci-fi"],
///   "category": "movie"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

/// Partial update body for `PATCH /api/v1/titles/{title_id}`.
///
/// A present `genre` list replaces the title's genres entirely.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

/// Filters for `GET /api/v1/titles`.
///
/// - `name`: case-insensitive substring
/// - `year`: exact match
/// - `genre`, `category`: slug
#[derive(Debug, Default, Deserialize)]
pub struct TitleListQuery {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "crate::pagination::deserialize_page")]
    pub page: Option<i64>,
}

/// Public representation of a title.
///
/// ```json
/// {
///   "id": 1,
///   "name": "Solaris",
///   "year": 1972,
///   "rating": 8.5,
///   "description": "",
///   "genre": [{ "name": "Drama", "slug": "drama" }],
///   "category": { "name": "Movie", "slug": "movie" }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<CatalogItemResponse>,
    pub category: Option<CatalogItemResponse>,
}

impl TitleResponse {
    pub fn from_parts(row: TitleRow, genre: Vec<CatalogItemResponse>) -> Self {
        let category = match (row.category_name, row.category_slug) {
            (Some(name), Some(slug)) => Some(CatalogItemResponse { name, slug }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            year: row.year,
            rating: row.rating,
            description: row.description,
            genre,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: Option<(&str, &str)>, rating: Option<f64>) -> TitleRow {
        TitleRow {
            id: 7,
            name: "Solaris".to_string(),
            year: 1972,
            description: String::new(),
            category_name: category.map(|(n, _)| n.to_string()),
            category_slug: category.map(|(_, s)| s.to_string()),
            rating,
        }
    }

    #[test]
    fn test_unrated_title_without_category() {
        let response = TitleResponse::from_parts(row(None, None), Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert!(json["rating"].is_null());
        assert!(json["category"].is_null());
        assert_eq!(json["genre"], serde_json::json!([]));
    }

    #[test]
    fn test_category_and_genres_nested() {
        let genres = vec![CatalogItemResponse {
            name: "Drama".to_string(),
            slug: "drama".to_string(),
        }];
        let response =
            TitleResponse::from_parts(row(Some(("Movie", "movie")), Some(8.5)), genres);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["rating"], 8.5);
        assert_eq!(json["category"]["slug"], "movie");
        assert_eq!(json["genre"][0]["name"], "Drama");
    }
}
