//! Context-to-diagnostic bridge
//!
//! The bridge is the delivery hook that keeps the thread-scoped diagnostic
//! store in sync with the carrier of whichever chain is about to run:
//!
//! - non-empty carrier → the store is overwritten with exactly the carrier's
//!   recognized entries (see [`keys::RECOGNIZED`]; anything else a carrier
//!   holds stays out of the store and out of the logs);
//! - empty carrier → the store is cleared.
//!
//! This happens for every value, error and completion delivery, not once per
//! chain: a chain delivers many signals across many thread-pool handoffs,
//! and each handoff may land on a thread whose store still holds another
//! chain's fields.
//!
//! In Rust the stage boundary is `Future::poll` - a stage future suspended
//! at an await point can resume on a different worker thread. [`Bridged`]
//! therefore re-runs the installed hooks on every poll, so log statements
//! after an await still see their own chain's fields.
//!
//! A store write can fail only when the store is already borrowed on this
//! thread; the bridge then skips the sync rather than surfacing an error -
//! diagnostics are best-effort relative to the work being processed.

use crate::hooks::{DeliveryHook, Hooks};
use jalki_core::{Carrier, diagnostic, keys};
use pin_project::pin_project;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, trace};

/// Stable registration key for the bridge hook
pub const BRIDGE_HOOK: &str = "jalki.diagnostic-bridge";

/// Delivery hook that mirrors a chain's carrier into the diagnostic store
pub struct DiagnosticBridge;

impl DeliveryHook for DiagnosticBridge {
    fn name(&self) -> &'static str {
        "diagnostic-bridge"
    }

    fn on_deliver(&self, carrier: &Carrier) {
        let written = if carrier.is_empty() {
            diagnostic::clear()
        } else {
            let fields: HashMap<String, String> = carrier
                .iter()
                .filter(|(key, _)| keys::RECOGNIZED.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            diagnostic::set_fields(fields)
        };

        if !written {
            trace!("Diagnostic store unavailable, skipping sync");
        }
    }
}

/// Install the bridge as a process-wide delivery hook
///
/// Must run before any traffic is accepted. Idempotent: installing an
/// already-installed bridge replaces it in place.
pub fn install() {
    Hooks::on_each_delivery(BRIDGE_HOOK, Arc::new(DiagnosticBridge));
    debug!(key = BRIDGE_HOOK, "Diagnostic bridge installed");
}

/// Remove the bridge, leaving no residual interception
///
/// Idempotent: uninstalling when not installed is a no-op.
pub fn uninstall() {
    Hooks::reset_on_each_delivery(BRIDGE_HOOK);
    debug!(key = BRIDGE_HOOK, "Diagnostic bridge uninstalled");
}

/// True while the bridge is installed
pub fn is_installed() -> bool {
    Hooks::is_registered(BRIDGE_HOOK)
}

/// Future wrapper that re-runs the delivery hooks on every poll
///
/// Wraps the future of a downstream consumer so that each resumption -
/// wherever the runtime schedules it - first re-synchronizes the current
/// thread's diagnostic store from the chain's carrier.
#[pin_project]
pub struct Bridged<F> {
    #[pin]
    inner: F,
    carrier: Carrier,
}

impl<F> Bridged<F> {
    /// Wrap a future with the given chain carrier
    pub fn new(inner: F, carrier: Carrier) -> Self {
        Self { inner, carrier }
    }
}

impl<F: Future> Future for Bridged<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        Hooks::apply(this.carrier);
        this.inner.poll(cx)
    }
}

/// Extension trait attaching a carrier to any future
pub trait BridgeExt: Future + Sized {
    /// Run this future with hooks re-applied at every poll
    fn bridged(self, carrier: &Carrier) -> Bridged<Self> {
        Bridged::new(self, carrier.clone())
    }
}

impl<F: Future + Sized> BridgeExt for F {}
