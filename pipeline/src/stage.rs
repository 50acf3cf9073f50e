//! Stage system for JALKI chains
//!
//! Stages process envelopes as they flow through a chain. Each stage can
//! transform, filter, or simply observe envelopes.
//!
//! # Return Value
//!
//! - `Ok(Some(envelope))` - pass the envelope downstream (possibly modified)
//! - `Ok(None)` - drop/filter the envelope
//! - `Err(e)` - fail the chain; the error is delivered downstream
//!
//! # Example
//!
//! ```ignore
//! struct LookupStage;
//!
//! #[async_trait]
//! impl Stage for LookupStage {
//!     fn name(&self) -> &'static str { "lookup" }
//!
//!     async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError> {
//!         tracing::info!(id = %env.id, "Looking up");
//!         Ok(Some(env))
//!     }
//! }
//! ```

use crate::envelope::Envelope;
use crate::error::StageError;
use async_trait::async_trait;

/// Stage trait - one asynchronous processing step of a chain
///
/// Stages must not block; long-running work should be awaited, not spun on.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for identification and logging
    fn name(&self) -> &'static str;

    /// Process one envelope
    async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError>;
}

/// Pass-through stage that does nothing (useful for testing)
pub struct PassThrough;

#[async_trait]
impl Stage for PassThrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError> {
        Ok(Some(env))
    }
}

/// Side-effect stage - observes each envelope without changing it
///
/// This is the stage handlers use for logging:
///
/// ```ignore
/// Inspect::new(|_| tracing::info!("Log message 2"))
/// ```
pub struct Inspect<F>
where
    F: Fn(&Envelope) + Send + Sync,
{
    observer: F,
}

impl<F> Inspect<F>
where
    F: Fn(&Envelope) + Send + Sync,
{
    /// Create an inspect stage with the given observer
    pub fn new(observer: F) -> Self {
        Self { observer }
    }
}

#[async_trait]
impl<F> Stage for Inspect<F>
where
    F: Fn(&Envelope) + Send + Sync,
{
    fn name(&self) -> &'static str {
        "inspect"
    }

    async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError> {
        (self.observer)(&env);
        Ok(Some(env))
    }
}

/// Transform stage that modifies envelopes
pub struct Transform<F>
where
    F: Fn(Envelope) -> Envelope + Send + Sync,
{
    transform_fn: F,
}

impl<F> Transform<F>
where
    F: Fn(Envelope) -> Envelope + Send + Sync,
{
    /// Create a transform with the given function
    pub fn new(transform_fn: F) -> Self {
        Self { transform_fn }
    }
}

#[async_trait]
impl<F> Stage for Transform<F>
where
    F: Fn(Envelope) -> Envelope + Send + Sync,
{
    fn name(&self) -> &'static str {
        "transform"
    }

    async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError> {
        Ok(Some((self.transform_fn)(env)))
    }
}

/// Filter stage that drops envelopes based on a predicate
///
/// Envelopes for which the predicate returns `true` are kept.
pub struct Filter<F>
where
    F: Fn(&Envelope) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> Filter<F>
where
    F: Fn(&Envelope) -> bool + Send + Sync,
{
    /// Create a filter with the given predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F> Stage for Filter<F>
where
    F: Fn(&Envelope) -> bool + Send + Sync,
{
    fn name(&self) -> &'static str {
        "filter"
    }

    async fn on_item(&self, env: Envelope) -> Result<Option<Envelope>, StageError> {
        if (self.predicate)(&env) {
            Ok(Some(env))
        } else {
            Ok(None)
        }
    }
}
