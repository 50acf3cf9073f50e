//! jalki-web - the HTTP boundary of JALKI
//!
//! Everything between an inbound request and the pipeline lives here:
//!
//! ```text
//! request ──► SessionFilter ──► handler ──► Chain (jalki-pipeline)
//!              │ reads x-session-id               │
//!              │ seeds the Carrier                ▼
//!              └─► drives the handler     diagnostic store
//!                  through Bridged               │
//!                                                ▼
//!                                        DiagnosticLayer ──► log records
//! ```
//!
//! - [`SessionFilterLayer`] extracts the session id at the edge and attaches
//!   a carrier to everything downstream
//! - [`DiagnosticLayer`] turns tracing events into structured records tagged
//!   with the thread's diagnostic fields
//! - [`run`] / [`RuntimeBuilder`] wire it all together: config from env,
//!   tracing init, bridge install, serve, graceful shutdown, bridge removal

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod filter;
pub mod layer;
mod runtime;

pub use config::{Config, ConfigError, LogFormat};
pub use filter::{Correlation, SessionFilter, SessionFilterLayer};
pub use layer::{DiagnosticLayer, LogRecord, MemorySink, RecordSink, StdoutSink};
pub use runtime::{RuntimeBuilder, run};
