//! Chain - the asynchronous execution pipeline
//!
//! A chain connects stages with bounded channels and runs each stage in its
//! own tokio task:
//!
//! ```text
//! inputs ──► stage task ──► stage task ──► collector ──► ChainOutcome
//! ```
//!
//! Every signal a task receives is preceded by a synchronous run of the
//! installed delivery hooks on the receiving thread, and every stage future
//! is additionally wrapped in [`Bridged`](crate::Bridged) so resumptions
//! after await points stay in sync. The chain's carrier is fixed at build
//! time and shared by reference-count with every task - stages never see or
//! pass context explicitly.

use crate::bridge::BridgeExt;
use crate::envelope::Envelope;
use crate::error::StageError;
use crate::hooks::Hooks;
use crate::stage::Stage;
use jalki_core::Carrier;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use ulid::Ulid;

/// Default capacity of the channels linking stages
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A downstream delivery: a value, an error, or completion
#[derive(Debug, Clone)]
pub enum Signal {
    /// An envelope moving downstream
    Item(Envelope),
    /// A stage failure; terminates the chain
    Error(StageError),
    /// No further items will follow
    Complete,
}

/// Builder and executor for one request's asynchronous chain
pub struct Chain {
    id: Ulid,
    carrier: Carrier,
    stages: Vec<Arc<dyn Stage>>,
    channel_capacity: usize,
}

/// What a chain delivered to its terminal consumer
#[derive(Debug)]
pub struct ChainOutcome {
    /// Envelopes that reached the end of the chain, in delivery order
    pub items: Vec<Envelope>,
    /// The error that terminated the chain, if any
    pub error: Option<StageError>,
}

impl ChainOutcome {
    /// True when the chain completed without an error
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Chain {
    /// Create a chain with an empty carrier
    pub fn new() -> Self {
        Self::seeded(Carrier::empty())
    }

    /// Create a chain seeded with the given carrier
    ///
    /// Every stage of this chain - and every poll of every stage future -
    /// inherits this carrier by construction.
    pub fn seeded(carrier: Carrier) -> Self {
        Self {
            id: Ulid::new(),
            carrier,
            stages: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Append a stage
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Override the stage-link channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// The carrier this chain was seeded with
    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    /// Run a single envelope through the chain
    pub async fn run_one(self, env: Envelope) -> ChainOutcome {
        self.run(vec![env]).await
    }

    /// Feed the inputs through every stage and collect what comes out
    ///
    /// Spawns one task per stage; the calling task acts as the terminal
    /// consumer. Returns once completion or an error has been delivered.
    pub async fn run(self, inputs: Vec<Envelope>) -> ChainOutcome {
        let Chain {
            id,
            carrier,
            stages,
            channel_capacity,
        } = self;

        debug!(chain = %id, stages = stages.len(), inputs = inputs.len(), "Chain starting");

        let (first_tx, mut rx) = mpsc::channel::<Signal>(channel_capacity);

        let mut workers = Vec::with_capacity(stages.len());
        for stage in stages {
            let (tx, next_rx) = mpsc::channel::<Signal>(channel_capacity);
            workers.push(tokio::spawn(stage_worker(
                stage,
                carrier.clone(),
                rx,
                tx,
            )));
            rx = next_rx;
        }

        let feeder = tokio::spawn(async move {
            for env in inputs {
                if first_tx.send(Signal::Item(env)).await.is_err() {
                    return;
                }
            }
            let _ = first_tx.send(Signal::Complete).await;
        });

        // Terminal consumer: the collector is a downstream stage too, so the
        // hooks run before it observes each signal.
        let mut items = Vec::new();
        let mut error = None;
        while let Some(signal) = rx.recv().await {
            Hooks::apply(&carrier);
            match signal {
                Signal::Item(env) => items.push(env),
                Signal::Error(e) => {
                    error = Some(e);
                    break;
                }
                Signal::Complete => break,
            }
        }

        let _ = feeder.await;
        for worker in workers {
            let _ = worker.await;
        }

        debug!(chain = %id, delivered = items.len(), failed = error.is_some(), "Chain finished");
        ChainOutcome { items, error }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// One stage's receive-process-forward loop
///
/// Runs until the upstream closes or a terminal signal passes through.
/// Hook application happens here, on the thread about to run the stage,
/// never as separately dispatched work.
async fn stage_worker(
    stage: Arc<dyn Stage>,
    carrier: Carrier,
    mut rx: mpsc::Receiver<Signal>,
    tx: mpsc::Sender<Signal>,
) {
    while let Some(signal) = rx.recv().await {
        Hooks::apply(&carrier);
        match signal {
            Signal::Item(env) => match stage.on_item(env).bridged(&carrier).await {
                Ok(Some(out)) => {
                    if tx.send(Signal::Item(out)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    trace!(stage = stage.name(), "Item filtered");
                }
                Err(e) => {
                    let _ = tx.send(Signal::Error(e)).await;
                    return;
                }
            },
            Signal::Error(e) => {
                let _ = tx.send(Signal::Error(e)).await;
                return;
            }
            Signal::Complete => {
                let _ = tx.send(Signal::Complete).await;
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::bridge;
    use crate::hooks::REGISTRY_TEST_LOCK;
    use crate::stage::{Filter, Inspect, PassThrough, Transform};
    use bytes::Bytes;
    use jalki_core::{diagnostic, keys};
    use parking_lot::Mutex;

    /// Collects what the diagnostic store held inside each stage execution
    fn session_probe() -> (Arc<Mutex<Vec<Option<String>>>>, impl Fn(&Envelope) + Send + Sync) {
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let probe = move |_: &Envelope| {
            sink.lock().push(diagnostic::get(keys::SESSION_ID));
        };
        (seen, probe)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_items_flow_through_stages_in_order() {
        let outcome = Chain::new()
            .stage(PassThrough)
            .stage(Transform::new(|mut env: Envelope| {
                let tagged = format!("{}+t", env.payload_str().unwrap_or(""));
                env.payload = Bytes::from(tagged);
                env
            }))
            .run(vec![
                Envelope::new(Bytes::from("a")),
                Envelope::new(Bytes::from("b")),
                Envelope::new(Bytes::from("c")),
            ])
            .await;

        assert!(outcome.is_ok());
        let payloads: Vec<_> = outcome
            .items
            .iter()
            .map(|e| e.payload_str().unwrap().to_string())
            .collect();
        assert_eq!(payloads, vec!["a+t", "b+t", "c+t"]);
    }

    #[tokio::test]
    async fn test_filtered_items_do_not_reach_the_end() {
        let outcome = Chain::new()
            .stage(Filter::new(|env: &Envelope| {
                env.payload_str() == Some("keep")
            }))
            .run(vec![
                Envelope::new(Bytes::from("keep")),
                Envelope::new(Bytes::from("drop")),
                Envelope::new(Bytes::from("keep")),
            ])
            .await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn test_stage_error_terminates_the_chain() {
        struct Failing;

        #[async_trait::async_trait]
        impl Stage for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }

            async fn on_item(&self, _env: Envelope) -> Result<Option<Envelope>, StageError> {
                Err(StageError::failed("failing", "boom"))
            }
        }

        let outcome = Chain::new()
            .stage(PassThrough)
            .stage(Failing)
            .stage(PassThrough)
            .run(vec![
                Envelope::new(Bytes::from("x")),
                Envelope::new(Bytes::from("y")),
            ])
            .await;

        assert!(!outcome.is_ok());
        assert_eq!(outcome.error, Some(StageError::failed("failing", "boom")));
        assert!(outcome.items.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stages_observe_their_chains_session() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        bridge::install();

        let (seen, probe) = session_probe();
        let outcome = Chain::seeded(Carrier::of(keys::SESSION_ID, "chain-session"))
            .stage(Inspect::new(probe))
            .stage(PassThrough)
            .run(vec![
                Envelope::new(Bytes::from("1")),
                Envelope::new(Bytes::from("2")),
                Envelope::new(Bytes::from("3")),
            ])
            .await;

        assert!(outcome.is_ok());
        let observed = seen.lock().clone();
        assert_eq!(observed.len(), 3);
        assert!(
            observed
                .iter()
                .all(|v| v.as_deref() == Some("chain-session"))
        );
    }

    #[tokio::test]
    async fn test_empty_carrier_chain_clears_stale_fields() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        bridge::install();

        // Current-thread runtime: every stage runs on this thread, so a
        // stale field planted here is exactly what pool reuse leaves behind.
        diagnostic::set_fields(
            [(keys::SESSION_ID.to_string(), "previous-request".to_string())]
                .into_iter()
                .collect(),
        );

        let (seen, probe) = session_probe();
        let outcome = Chain::new()
            .stage(Inspect::new(probe))
            .run_one(Envelope::new(Bytes::from("x")))
            .await;

        assert!(outcome.is_ok());
        assert_eq!(seen.lock().clone(), vec![None]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_chains_never_mix_sessions() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        bridge::install();

        async fn run_chain(session: &str, rounds: usize) -> Vec<Option<String>> {
            let (seen, probe) = session_probe();
            let inputs = (0..rounds)
                .map(|_| Envelope::new(Bytes::from("x")))
                .collect();
            let outcome = Chain::seeded(Carrier::of(keys::SESSION_ID, session))
                .stage(Inspect::new(probe))
                .stage(PassThrough)
                .run(inputs)
                .await;
            assert!(outcome.is_ok());
            let observed = seen.lock().clone();
            observed
        }

        // Two chains in flight at once on two worker threads: their stages
        // interleave on the same threads, their sessions must not.
        let (a, b) = tokio::join!(run_chain("session-a", 16), run_chain("session-b", 16));

        assert_eq!(a.len(), 16);
        assert!(a.iter().all(|v| v.as_deref() == Some("session-a")));
        assert_eq!(b.len(), 16);
        assert!(b.iter().all(|v| v.as_deref() == Some("session-b")));
    }

    #[tokio::test]
    async fn test_uninstalled_bridge_leaves_store_alone() {
        let _guard = REGISTRY_TEST_LOCK.lock();
        bridge::uninstall();

        diagnostic::set_fields(
            [(keys::SESSION_ID.to_string(), "untouched".to_string())]
                .into_iter()
                .collect(),
        );

        let (seen, probe) = session_probe();
        let outcome = Chain::seeded(Carrier::of(keys::SESSION_ID, "ignored"))
            .stage(Inspect::new(probe))
            .run_one(Envelope::new(Bytes::from("x")))
            .await;

        assert!(outcome.is_ok());
        // No hook installed: nothing rewrote the store
        assert_eq!(seen.lock().clone(), vec![Some("untouched".to_string())]);

        diagnostic::clear();
    }

    #[tokio::test]
    async fn test_chain_with_no_stages_passes_inputs_through() {
        let outcome = Chain::new()
            .run(vec![Envelope::new(Bytes::from("solo"))])
            .await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].payload_str(), Some("solo"));
    }
}
