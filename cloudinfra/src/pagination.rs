//! Walks paginated list endpoints

use crate::api::{ApiError, Page};
use std::future::Future;

/// Page size for every list call
pub const PAGE_SIZE: u32 = 200;

/// Fetches every page starting at page 1 and returns all items in page
/// order. Stops at the first page without a next-page link.
///
/// Any fetch error ends the walk; items from earlier pages are discarded.
pub async fn fetch_all<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut all_items = Vec::new();
    let mut page = 1;

    loop {
        let result = fetch_page(page, PAGE_SIZE).await?;
        tracing::debug!(
            "Fetched page {} with {} items (has_next: {})",
            page,
            result.items.len(),
            result.has_next
        );
        all_items.extend(result.items);

        if !result.has_next {
            break;
        }
        page += 1;
    }

    Ok(all_items)
}

/// Resolves an import identifier to a numeric id.
///
/// A numeric identifier is used directly. Anything else is treated as a name
/// and looked up with a full scan, since the API cannot filter by name.
pub async fn resolve_id<T, F, Fut>(
    identifier: &str,
    fetch_page: F,
    name_of: impl Fn(&T) -> &str,
    id_of: impl Fn(&T) -> i64,
) -> Result<Option<i64>, ApiError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    if let Ok(id) = identifier.parse::<i64>() {
        return Ok(Some(id));
    }

    let items = fetch_all(fetch_page).await?;
    Ok(items
        .iter()
        .find(|item| name_of(*item) == identifier)
        .map(id_of))
}
