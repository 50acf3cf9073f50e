//! Immutable per-chain context carrier
//!
//! A [`Carrier`] is created once at the boundary that accepts a request and
//! then travels, unchanged, with every asynchronous stage derived from that
//! request. Concurrent chains always hold distinct carriers even when their
//! stages execute on the same worker thread at different times.
//!
//! # Cheap clones
//!
//! Entries live behind an `Arc`, so cloning a carrier is a refcount bump.
//! The empty carrier allocates nothing at all.
//!
//! # Example
//!
//! ```
//! use jalki_core::{Carrier, keys};
//!
//! let carrier = Carrier::of(keys::SESSION_ID, "my_session_id");
//! assert_eq!(carrier.get(keys::SESSION_ID), Some("my_session_id"));
//!
//! let extended = carrier.with("tenant", "acme");
//! assert_eq!(carrier.len(), 1); // original untouched
//! assert_eq!(extended.len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

/// Helper to view entries as a map even when none were allocated
#[inline]
fn entries_ref(entries: &Option<Arc<HashMap<String, String>>>) -> &HashMap<String, String> {
    static EMPTY: std::sync::OnceLock<HashMap<String, String>> = std::sync::OnceLock::new();
    entries
        .as_ref()
        .map(|a| a.as_ref())
        .unwrap_or_else(|| EMPTY.get_or_init(HashMap::new))
}

/// Immutable key→value context attached to an asynchronous chain
///
/// Lazily allocated - the empty carrier holds `None` and costs nothing
/// to clone or compare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Carrier {
    entries: Option<Arc<HashMap<String, String>>>,
}

impl Carrier {
    /// Create a carrier with no entries
    pub fn empty() -> Self {
        Self { entries: None }
    }

    /// Create a carrier holding a single key→value pair
    pub fn of(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = HashMap::with_capacity(1);
        map.insert(key.into(), value.into());
        Self {
            entries: Some(Arc::new(map)),
        }
    }

    /// Return a new carrier with one additional entry
    ///
    /// The receiver is not modified; chains already holding it keep seeing
    /// the original entries.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = entries_ref(&self.entries).clone();
        map.insert(key.into(), value.into());
        Self {
            entries: Some(Arc::new(map)),
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        entries_ref(&self.entries).get(key).map(String::as_str)
    }

    /// True when the carrier holds no entries
    pub fn is_empty(&self) -> bool {
        entries_ref(&self.entries).is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        entries_ref(&self.entries).len()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        entries_ref(&self.entries).iter()
    }
}
