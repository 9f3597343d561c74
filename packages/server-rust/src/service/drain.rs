//! Drains a backend result cursor into an ordered list.

use easystore_core::{EasyStoreObject, ObjectCursor, StoreResult};
use tracing::info;

/// Consumes `cursor` until it reports exhaustion, preserving yield order.
///
/// A cursor whose count is zero is not advanced at all. No filtering,
/// reordering or de-duplication happens here.
///
/// # Errors
///
/// Propagates the first error the cursor reports while advancing.
pub fn drain(cursor: &mut dyn ObjectCursor) -> StoreResult<Vec<EasyStoreObject>> {
    let total = cursor.count();
    if total == 0 {
        return Ok(Vec::new());
    }

    info!("located {total} object(s)...");
    let mut results = Vec::with_capacity(total);
    while let Some(obj) = cursor.advance()? {
        results.push(obj);
    }
    Ok(results)
}
