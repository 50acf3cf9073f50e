//! jalki-pipeline - asynchronous stage pipeline with diagnostic bridging
//!
//! A [`Chain`] runs envelopes through a sequence of stages. Every stage
//! executes in its own tokio task, so a single chain hops across worker
//! threads as signals move downstream:
//!
//! ```text
//! inputs ──► Stage 1 ──► Stage 2 ──► Stage 3 ──► outcome
//!     hook─┘      hook─┘      hook─┘      hook─┘
//! ```
//!
//! At every handoff (and at every poll of a stage future) the installed
//! delivery hooks run synchronously on the thread about to execute the
//! downstream consumer. The built-in [`DiagnosticBridge`] hook copies the
//! chain's [`Carrier`](jalki_core::Carrier) into the thread-scoped
//! diagnostic store - or clears it when the carrier is empty - so any log
//! statement inside a stage sees exactly its own chain's correlation
//! fields, never another chain's leftovers.
//!
//! # Example
//!
//! ```ignore
//! use jalki_pipeline::{bridge, Chain, Envelope, Inspect};
//! use jalki_core::{Carrier, keys};
//! use bytes::Bytes;
//!
//! bridge::install();
//!
//! let outcome = Chain::seeded(Carrier::of(keys::SESSION_ID, "my_session_id"))
//!     .stage(Inspect::new(|_| tracing::info!("Log message 1")))
//!     .stage(Inspect::new(|_| tracing::info!("Log message 2")))
//!     .run_one(Envelope::new(Bytes::from("ok")))
//!     .await;
//! assert!(outcome.is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod bridge;
mod chain;
mod envelope;
mod error;
pub mod hooks;
mod stage;

pub use bridge::{BridgeExt, Bridged, DiagnosticBridge};
pub use chain::{Chain, ChainOutcome, Signal};
pub use envelope::Envelope;
pub use error::StageError;
pub use hooks::{DeliveryHook, Hooks};
pub use stage::{Filter, Inspect, PassThrough, Stage, Transform};
