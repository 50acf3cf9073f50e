//! Diagnostic-aware structured log layer
//!
//! Turns every tracing event into a [`LogRecord`] whose fields are the
//! event's own fields merged with the current thread's diagnostic store.
//! The store is read at emission time, on the emitting thread - exactly the
//! contents the bridge synced for the chain whose stage is running.
//!
//! Records go to a [`RecordSink`]: JSON lines on stdout in production,
//! an in-memory buffer in tests.

use chrono::Utc;
use jalki_core::diagnostic;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One structured log record
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// Unix timestamp in nanoseconds at emission
    pub timestamp: i64,
    /// Level as text ("INFO", "WARN", ...)
    pub level: String,
    /// Module path of the emitting call site
    pub target: String,
    /// The event's message field
    pub message: String,
    /// Event fields merged with the thread's diagnostic fields
    pub fields: HashMap<String, String>,
}

/// Destination for finished log records
pub trait RecordSink: Send + Sync {
    /// Deliver one record; must not fail the caller
    fn record(&self, record: LogRecord);
}

/// Tracing layer producing diagnostic-tagged records
pub struct DiagnosticLayer {
    sink: Arc<dyn RecordSink>,
}

impl DiagnosticLayer {
    /// Create a layer writing to the given sink
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }

    /// Create a layer writing JSON lines to stdout
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

/// Visitor extracting the message and fields from a tracing event
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut rendered = String::new();
        let _ = write!(rendered, "{value:?}");
        self.put(field, rendered);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

impl<S> Layer<S> for DiagnosticLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut fields = visitor.fields;
        // Diagnostic fields never override what the call site set explicitly
        for (key, value) in diagnostic::snapshot() {
            fields.entry(key).or_insert(value);
        }

        self.sink.record(LogRecord {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or(0),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields,
        });
    }
}

/// Sink writing one JSON object per line to stdout
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn record(&self, record: LogRecord) {
        use std::io::Write;
        if let Ok(json) = serde_json::to_string(&record) {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{json}");
        }
    }
}

/// In-memory sink for asserting on emitted records in tests
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of records captured
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True when nothing was captured yet
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn record(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}
