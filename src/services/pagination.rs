//! Keyset pagination helpers.
//!
//! A listing asks the store for one row more than the page size. If that extra
//! row comes back there is at least one more page; it is dropped before the page
//! is returned, so the caller never sees it.

/// How many rows to request for a page of `page_size`.
pub fn probe_limit(page_size: usize) -> i64 {
    page_size as i64 + 1
}

/// Drops the probe row, if present, and reports whether this was the last page.
pub fn split_page<T>(mut rows: Vec<T>, page_size: usize) -> (Vec<T>, bool) {
    let end_of_pagination_reached = rows.len() <= page_size;
    rows.truncate(page_size);
    (rows, end_of_pagination_reached)
}
