//! Thread-scoped diagnostic field store
//!
//! Each worker thread owns one mutable bag of diagnostic fields, read
//! implicitly by every log statement that executes on that thread. The store
//! is written only by the diagnostic bridge, which overwrites or clears it
//! immediately before each unit of work runs. Application code reads it
//! (usually indirectly, through the log layer) but never writes it.
//!
//! Because threads are reused across unrelated chains, any value left behind
//! by a previous stage is stale by definition - correctness comes from the
//! overwrite-before-use discipline, not from synchronization. There is no
//! locking here: the store is thread-affine, and only the stage currently
//! owning the thread touches it.
//!
//! # Failure semantics
//!
//! Writes return `false` instead of erroring when the store is unavailable
//! (already borrowed on this thread). Callers degrade by skipping the write;
//! a diagnostic failure must never fail the work being processed.

use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static STORE: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

/// Replace the store's contents with exactly the given fields
///
/// Returns `false` when the store could not be written.
pub fn set_fields(fields: HashMap<String, String>) -> bool {
    STORE.with(|store| match store.try_borrow_mut() {
        Ok(mut map) => {
            *map = fields;
            true
        }
        Err(_) => false,
    })
}

/// Remove every field from the store
///
/// Returns `false` when the store could not be written.
pub fn clear() -> bool {
    STORE.with(|store| match store.try_borrow_mut() {
        Ok(mut map) => {
            map.clear();
            true
        }
        Err(_) => false,
    })
}

/// Read a single field
pub fn get(key: &str) -> Option<String> {
    STORE.with(|store| {
        store
            .try_borrow()
            .ok()
            .and_then(|map| map.get(key).cloned())
    })
}

/// Copy of the store's current contents
///
/// Returns an empty map when the store is unavailable.
pub fn snapshot() -> HashMap<String, String> {
    STORE.with(|store| {
        store
            .try_borrow()
            .map(|map| map.clone())
            .unwrap_or_default()
    })
}

/// True when the store holds no fields (or is unavailable)
pub fn is_empty() -> bool {
    STORE.with(|store| store.try_borrow().map(|map| map.is_empty()).unwrap_or(true))
}
