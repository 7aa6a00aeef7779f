//! Splitting operation lists into store-sized requests

use crate::utils::error::{BatchError, Result};

/// Split `items` into consecutive chunks of at most `max_items` entries
///
/// Chunks cover every input item exactly once and preserve input order.
/// Items are moved, never cloned. An empty input yields no chunks.
pub fn chunk<T>(items: Vec<T>, max_items: usize) -> Result<Vec<Vec<T>>> {
    if max_items == 0 {
        return Err(BatchError::config(
            "max items per request must be greater than 0",
        ));
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(max_items));
    let mut current = Vec::with_capacity(max_items.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == max_items {
            chunks.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(max_items),
            ));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}
