//! JALKI end-to-end test harness
//!
//! Black-box scenarios drive a real axum router - session filter at the
//! edge, a three-stage chain in the handler - and assert on the structured
//! records captured by a shared [`MemorySink`].
//!
//! The sink, subscriber and bridge are process-global, and the test binary
//! runs scenarios concurrently, so:
//! - capture is initialised exactly once and shared; tests tell their own
//!   records apart by a per-test marker prefixed to every message
//! - the bridge is (re)installed by every scenario and never uninstalled
//!   here; lifecycle idempotence is covered at the unit level

#![deny(unsafe_code)]

use axum::Router;
use axum::extract::Path;
use axum::routing::get;
use bytes::Bytes;
use jalki_pipeline::{Chain, Envelope, Inspect, bridge};
use jalki_web::filter::{Correlation, SessionFilterLayer};
use jalki_web::layer::{DiagnosticLayer, LogRecord, MemorySink};
use std::sync::{Arc, OnceLock};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static CAPTURE: OnceLock<MemorySink> = OnceLock::new();

/// Install the bridge and the capturing subscriber, returning the shared sink
pub fn init_capture() -> MemorySink {
    bridge::install();
    CAPTURE
        .get_or_init(|| {
            let sink = MemorySink::new();
            tracing_subscriber::registry()
                .with(DiagnosticLayer::new(Arc::new(sink.clone())))
                .init();
            sink
        })
        .clone()
}

/// Records whose message starts with `marker`, in emission order
pub fn records_for(sink: &MemorySink, marker: &str) -> Vec<LogRecord> {
    sink.records()
        .into_iter()
        .filter(|r| r.message.starts_with(marker))
        .collect()
}

/// The application under test
///
/// `GET /log/{marker}` logs three marker-stamped messages across three
/// asynchronous stages, then answers "Ok".
pub fn test_app() -> Router {
    Router::new()
        .route("/log/{marker}", get(log_handler))
        .layer(SessionFilterLayer::new())
}

async fn log_handler(
    Path(marker): Path<String>,
    Correlation(carrier): Correlation,
) -> &'static str {
    let stage_log = |n: usize| {
        let marker = marker.clone();
        Inspect::new(move |_: &Envelope| info!("{marker} message {n}"))
    };

    let outcome = Chain::seeded(carrier)
        .stage(stage_log(1))
        .stage(stage_log(2))
        .stage(stage_log(3))
        .run_one(Envelope::new(Bytes::from("Ok")))
        .await;

    debug_assert!(outcome.is_ok());
    "Ok"
}
