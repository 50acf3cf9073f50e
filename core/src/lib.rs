//! jalki-core - Core context types for JALKI
//!
//! This crate provides the foundational types shared between the JALKI
//! pipeline and its web boundary:
//!
//! - [`Carrier`] - the immutable per-chain context carrier
//! - [`diagnostic`] - the thread-scoped diagnostic field store
//! - [`keys`] - well-known correlation key constants
//!
//! # How the pieces fit
//!
//! ```text
//! request header ──► Carrier (one per chain, immutable)
//!                        │  synced at every stage handoff
//!                        ▼
//!                 diagnostic store (per worker thread, mutable)
//!                        │  read implicitly
//!                        ▼
//!                 log records tagged with the session id
//! ```
//!
//! The carrier travels with a chain and never changes; the diagnostic store
//! belongs to whichever thread is about to run a stage and is overwritten or
//! cleared before each unit of work. Nothing in this crate is async and
//! nothing here performs I/O.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

mod carrier;
/// The thread-scoped diagnostic field store
pub mod diagnostic;
/// Well-known correlation key constants
pub mod keys;

pub use carrier::Carrier;
