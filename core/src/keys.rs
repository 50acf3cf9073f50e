//! Well-known correlation key constants for JALKI
//!
//! These keys name the diagnostic fields the pipeline is allowed to carry
//! from a [`Carrier`](crate::Carrier) into the thread-scoped diagnostic
//! store. Keys a carrier holds that are not listed in [`RECOGNIZED`] are
//! dropped on copy - unrelated context must not leak into log records.

/// The session correlation field, matching the inbound HTTP header name.
pub const SESSION_ID: &str = "x-session-id";

/// Keys the diagnostic bridge copies into the diagnostic store.
///
/// This is the single-key scoping policy: extending correlation to more
/// fields means adding them here, nowhere else.
pub const RECOGNIZED: &[&str] = &[SESSION_ID];
