//! Category and genre models.
//!
//! Both are flat `{name, slug}` dictionaries living in separate tables, so
//! they share one row type and one set of handlers parameterized by
//! [`CatalogKind`].

use serde::{Deserialize, Serialize};

/// Which dictionary table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Category,
    Genre,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Category => "categories",
            CatalogKind::Genre => "genres",
        }
    }

    /// Resource name used in "not found" messages.
    pub fn resource(self) -> &'static str {
        match self {
            CatalogKind::Category => "Category",
            CatalogKind::Genre => "Genre",
        }
    }
}

/// A row of the `categories` or `genres` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Request body for creating a category or genre.
///
/// ```json
/// { "name": "Science fiction", "slug": "sci-fi" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCatalogItemRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// Query parameters for category and genre lists.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogListQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "crate::pagination::deserialize_page")]
    pub page: Option<i64>,
}

/// Public representation of a category or genre.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CatalogItemResponse {
    pub name: String,
    pub slug: String,
}

impl From<CatalogItem> for CatalogItemResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            name: item.name,
            slug: item.slug,
        }
    }
}
