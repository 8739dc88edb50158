use std::future::Future;

use tracing::{debug, warn};

use super::{PageInfo, PagedConnection};

/// Upper bound on pages fetched after the initial one.
pub const MAX_PAGES: usize = 64;

/// Walks a cursor-paged connection to completion, one page at a time.
///
/// Starts from `initial` and keeps calling `fetch_next` with the current end
/// cursor while the page info reports another page. Stops when a fetch returns
/// no page, when the cursor does not advance, or after [`MAX_PAGES`] fetches.
/// Returns every item in page order together with the last page info seen.
pub async fn collect_all_pages<T, E, F, Fut>(
    initial: PagedConnection<T>,
    fetch_next: F,
) -> Result<PagedConnection<T>, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<PagedConnection<T>>, E>>,
{
    collect_all_pages_with_limit(initial, MAX_PAGES, fetch_next).await
}

pub async fn collect_all_pages_with_limit<T, E, F, Fut>(
    initial: PagedConnection<T>,
    max_pages: usize,
    mut fetch_next: F,
) -> Result<PagedConnection<T>, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<PagedConnection<T>>, E>>,
{
    let PagedConnection {
        mut items,
        mut page_info,
    } = initial;
    let mut fetched = 0;

    while let Some(cursor) = page_info.next_cursor().map(str::to_owned) {
        if fetched >= max_pages {
            warn!("Stopping pagination after {fetched} pages at cursor {cursor}");
            break;
        }

        debug!("Fetching page after cursor {cursor}");
        let Some(page) = fetch_next(cursor.clone()).await? else {
            debug!("No page returned after cursor {cursor}, stopping");
            break;
        };
        fetched += 1;

        items.extend(page.items);
        let next = page.page_info;
        if next.next_cursor() == Some(cursor.as_str()) {
            warn!("Cursor {cursor} did not advance, stopping pagination");
            page_info = PageInfo {
                has_next_page: false,
                ..next
            };
            break;
        }
        page_info = next;
    }

    Ok(PagedConnection { items, page_info })
}
