//! Page-number pagination for list endpoints.
//!
//! Lists accept `?page=N` (1-indexed) and return
//! `{count, next, previous, results}`, where `next` and `previous` are links
//! to neighbouring pages that keep every other query parameter intact.

use axum::http::Uri;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Resolved position of one page within a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page, used as SQL LIMIT
    pub page_size: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
    /// Total number of pages (at least 1, even for an empty set)
    pub total_pages: i64,
    /// Total number of rows in the result set
    pub count: i64,
}

/// One page of results as returned to clients.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Reads `?page=`. A value that is not a number becomes page 0, so it is
/// answered with the same 404 as any other page out of range.
pub fn deserialize_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.trim().parse().unwrap_or(0)))
}

/// Calculate the window for `requested_page` over `count` rows.
///
/// Page 1 always exists. Any other page outside `[1, total_pages]` is
/// reported as 404 rather than clamped.
///
/// # Examples
/// ```
/// use yamdb_api::pagination::resolve_page;
///
/// // 25 rows at 10 per page = 3 pages (10 + 10 + 5)
/// let w = resolve_page(25, Some(3), 10).unwrap();
/// assert_eq!(w.offset, 20);
/// assert_eq!(w.total_pages, 3);
///
/// assert!(resolve_page(25, Some(4), 10).is_err());
/// ```
pub fn resolve_page(
    count: i64,
    requested_page: Option<i64>,
    page_size: i64,
) -> Result<PageWindow, AppError> {
    let page_size = page_size.max(1);
    let total_pages = ((count + page_size - 1) / page_size).max(1);
    let page = requested_page.unwrap_or(1);

    if page < 1 || page > total_pages {
        return Err(AppError::NotFound("Page"));
    }

    Ok(PageWindow {
        page,
        page_size,
        offset: (page - 1) * page_size,
        total_pages,
        count,
    })
}

impl PageWindow {
    /// Wrap the rows fetched for this window, linking neighbours relative to `uri`.
    pub fn into_page<T>(self, results: Vec<T>, uri: &Uri) -> Page<T> {
        let next = (self.page < self.total_pages).then(|| page_link(uri, self.page + 1));
        let previous = (self.page > 1).then(|| page_link(uri, self.page - 1));

        Page {
            count: self.count,
            next,
            previous,
            results,
        }
    }
}

/// Rebuild the request URI pointing at `page`. The first page drops the
/// parameter entirely.
fn page_link(uri: &Uri, page: i64) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(existing) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(existing.as_bytes()) {
            if key != "page" {
                query.append_pair(&key, &value);
            }
        }
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }

    let query = query.finish();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::ListQuery;
    use axum::extract::Query;

    fn page_param(uri: &str) -> Option<i64> {
        let uri: Uri = uri.parse().unwrap();
        Query::<ListQuery>::try_from_uri(&uri).unwrap().0.page
    }

    #[test]
    fn test_page_param_parsing() {
        assert_eq!(page_param("/api/v1/genres"), None);
        assert_eq!(page_param("/api/v1/genres?page=3"), Some(3));
        assert_eq!(page_param("/api/v1/genres?page=abc"), Some(0));
        assert_eq!(page_param("/api/v1/genres?page="), Some(0));
    }

    #[test]
    fn test_unparseable_page_is_not_found() {
        let page = page_param("/api/v1/genres?page=abc");
        assert!(matches!(
            resolve_page(25, page, 10),
            Err(AppError::NotFound("Page"))
        ));
    }

    #[test]
    fn test_first_page_default() {
        let w = resolve_page(25, None, 10).unwrap();
        assert_eq!(w.page, 1);
        assert_eq!(w.offset, 0);
        assert_eq!(w.total_pages, 3);
    }

    #[test]
    fn test_empty_set_has_one_page() {
        let w = resolve_page(0, Some(1), 10).unwrap();
        assert_eq!(w.total_pages, 1);
        assert!(resolve_page(0, Some(2), 10).is_err());
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        assert!(matches!(
            resolve_page(25, Some(0), 10),
            Err(AppError::NotFound("Page"))
        ));
        assert!(matches!(
            resolve_page(20, Some(3), 10),
            Err(AppError::NotFound("Page"))
        ));
    }

    #[test]
    fn test_exact_page_boundary() {
        let w = resolve_page(20, Some(2), 10).unwrap();
        assert_eq!(w.total_pages, 2);
        assert_eq!(w.offset, 10);
    }

    #[test]
    fn test_links_keep_filters() {
        let uri: Uri = "/api/v1/titles?genre=drama&page=2".parse().unwrap();
        let page = resolve_page(25, Some(2), 10)
            .unwrap()
            .into_page(vec![1, 2, 3], &uri);

        assert_eq!(page.count, 25);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/v1/titles?genre=drama&page=3")
        );
        assert_eq!(page.previous.as_deref(), Some("/api/v1/titles?genre=drama"));
    }

    #[test]
    fn test_single_page_has_no_links() {
        let uri: Uri = "/api/v1/genres".parse().unwrap();
        let page = resolve_page(3, None, 10).unwrap().into_page(vec!["a"], &uri);

        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
