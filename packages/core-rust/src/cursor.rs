//! Lazy, forward-only result cursors for multi-object reads.

use std::collections::VecDeque;

use crate::error::StoreResult;
use crate::object::EasyStoreObject;

/// Single-pass sequence of objects matching a query.
///
/// `count()` is fixed when the cursor is created and does not change as
/// items are consumed. `advance()` yields `Ok(None)` once the sequence is
/// exhausted.
pub trait ObjectCursor: Send {
    /// Total number of objects the cursor was created with.
    fn count(&self) -> usize;

    /// Moves to the next object.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the next object cannot be materialized.
    fn advance(&mut self) -> StoreResult<Option<EasyStoreObject>>;
}

/// Cursor over objects already held in memory.
#[derive(Debug, Default)]
pub struct VecCursor {
    items: VecDeque<EasyStoreObject>,
    total: usize,
}

impl VecCursor {
    #[must_use]
    pub fn new(items: Vec<EasyStoreObject>) -> Self {
        let total = items.len();
        Self {
            items: items.into(),
            total,
        }
    }
}

impl ObjectCursor for VecCursor {
    fn count(&self) -> usize {
        self.total
    }

    fn advance(&mut self) -> StoreResult<Option<EasyStoreObject>> {
        Ok(self.items.pop_front())
    }
}
