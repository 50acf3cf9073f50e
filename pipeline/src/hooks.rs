//! Global delivery-hook registry
//!
//! A delivery hook is a process-wide extension point that runs immediately
//! before any chain delivers a signal to a downstream consumer. Hooks are
//! keyed by a stable identifier so that installing the same hook twice
//! replaces the previous registration instead of stacking a duplicate, and
//! removing an absent hook is a no-op. Restart and reload sequences can
//! therefore call install/uninstall without tracking state.
//!
//! Hooks receive only the chain's carrier, never the signal being delivered:
//! a hook cannot alter, delay or drop pipeline traffic by construction.
//!
//! The registry is read on every handoff and written only at process
//! startup/shutdown, hence the read-write lock.

use jalki_core::Carrier;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A hook invoked before each downstream delivery
///
/// Implementations must be cheap and non-blocking: they run synchronously on
/// the thread that is about to execute the downstream consumer, for every
/// value, error and completion signal of every chain in the process.
pub trait DeliveryHook: Send + Sync {
    /// Hook name for identification and logging
    fn name(&self) -> &'static str;

    /// Called immediately before a downstream consumer runs
    ///
    /// `carrier` is the context of the chain whose stage is about to
    /// execute; it may be empty.
    fn on_deliver(&self, carrier: &Carrier);
}

type HookEntry = (&'static str, Arc<dyn DeliveryHook>);

static REGISTRY: OnceLock<RwLock<Vec<HookEntry>>> = OnceLock::new();

fn registry() -> &'static RwLock<Vec<HookEntry>> {
    REGISTRY.get_or_init(|| RwLock::new(Vec::new()))
}

/// The process-wide hook registration surface
pub struct Hooks;

impl Hooks {
    /// Register a hook under a stable key
    ///
    /// Re-registering with an existing key replaces that entry; hook order
    /// otherwise follows registration order.
    pub fn on_each_delivery(key: &'static str, hook: Arc<dyn DeliveryHook>) {
        let mut reg = registry().write();
        if let Some(entry) = reg.iter_mut().find(|(k, _)| *k == key) {
            debug!(key, hook = hook.name(), "Replacing delivery hook");
            entry.1 = hook;
        } else {
            debug!(key, hook = hook.name(), "Registering delivery hook");
            reg.push((key, hook));
        }
    }

    /// Remove the hook registered under `key`
    ///
    /// No-op when nothing is registered under that key.
    pub fn reset_on_each_delivery(key: &'static str) {
        let mut reg = registry().write();
        let before = reg.len();
        reg.retain(|(k, _)| *k != key);
        if reg.len() != before {
            debug!(key, "Removed delivery hook");
        }
    }

    /// True when a hook is registered under `key`
    pub fn is_registered(key: &'static str) -> bool {
        registry().read().iter().any(|(k, _)| *k == key)
    }

    /// Run every registered hook for the given carrier
    ///
    /// Invoked by the chain executor on the delivering thread. Synchronous
    /// and constant-time in the number of hooks.
    pub fn apply(carrier: &Carrier) {
        for (_, hook) in registry().read().iter() {
            hook.on_deliver(carrier);
        }
    }
}

/// Serializes tests that touch the global registry; cargo runs tests on
/// concurrent threads and the registry is process-wide state.
#[cfg(test)]
pub(crate) static REGISTRY_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
