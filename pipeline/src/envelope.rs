//! The unit-of-work envelope flowing through a chain
//!
//! Envelopes are deliberately small: an identifier, a creation timestamp and
//! an opaque payload. Correlation context does NOT live here - it travels on
//! the chain's carrier, which covers error and completion signals too.

use bytes::Bytes;
use ulid::Ulid;

/// A single unit of work moving through the pipeline
///
/// The payload is zero-copy via `Bytes`; cloning an envelope is cheap.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Unique identifier (ULID, time-ordered)
    pub id: Ulid,
    /// Unix timestamp in nanoseconds at creation
    pub timestamp: i64,
    /// Opaque payload - the pipeline does not interpret it
    pub payload: Bytes,
}

impl Envelope {
    /// Create an envelope with a fresh id and the current timestamp
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            id: Ulid::new(),
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
            payload: payload.into(),
        }
    }

    /// Get the payload as a string slice (if valid UTF-8)
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
