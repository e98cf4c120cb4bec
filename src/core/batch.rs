//! Batch fetch utility
//!
//! Pages through a source or destination collection until the adapter
//! reports that no more pages exist. Used for every full read in a run.

use crate::domain::{Page, Result, SyncError};
use std::future::Future;
use tokio::sync::watch;

/// Reads every page produced by `fetch_page`
///
/// `fetch_page(start, size)` is called with increasing offsets until a page
/// reports `has_more == false`. The cancellation signal is checked before
/// every page.
///
/// # Errors
///
/// Returns the first error of `fetch_page`, [`SyncError::Cancelled`] when
/// the signal is raised, or a validation error when a page is empty while
/// claiming more pages exist (the offset would never advance).
pub async fn fetch_all<T, F, Fut>(
    batch_size: usize,
    cancel: &watch::Receiver<bool>,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if batch_size == 0 {
        return Err(SyncError::Validation("Batch size must be positive".to_string()));
    }

    let mut items = Vec::new();
    let mut start = 0;

    loop {
        if *cancel.borrow() {
            return Err(SyncError::Cancelled);
        }

        let page = fetch_page(start, batch_size).await?;
        let received = page.items.len();
        items.extend(page.items);

        if !page.has_more {
            break;
        }
        if received == 0 {
            return Err(SyncError::Validation(format!(
                "Empty page at offset {start} while more pages were announced"
            )));
        }

        start += received;
        tracing::trace!(start, fetched = items.len(), "Fetching next page");
    }

    Ok(items)
}
