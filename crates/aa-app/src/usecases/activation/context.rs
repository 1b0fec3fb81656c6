use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aa_core::{ActivationState, CodeEntry};
use tokio::sync::Mutex;

/// Shared activation context containing state, code entry, dispatch lock and
/// attempt counter.
///
/// Cloned into the tasks that carry remote calls so their responses go
/// through the same lock as user submits.
///
/// ## Lock Ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: Serializes submits and response deliveries, which keeps
///   outcome delivery ordered and never concurrent with itself.
/// - `state`: Used for both reading (`get_state`) and writing (during dispatch).
/// - `code_entry`: Only touched while `dispatch_lock` is held.
#[derive(Clone)]
pub(crate) struct ActivationContext {
    state: Arc<Mutex<ActivationState>>,
    code_entry: Arc<Mutex<CodeEntry>>,
    dispatch_lock: Arc<Mutex<()>>,
    attempts: Arc<AtomicU64>,
}

impl ActivationContext {
    pub(crate) fn new(initial_state: ActivationState, required_code_length: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial_state)),
            code_entry: Arc::new(Mutex::new(CodeEntry::new(required_code_length))),
            dispatch_lock: Arc::new(Mutex::new(())),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a snapshot of the current state.
    ///
    /// Does NOT acquire `dispatch_lock`.
    pub(crate) async fn get_state(&self) -> ActivationState {
        self.state.lock().await.clone()
    }

    /// Returns a guard that releases the dispatch lock when dropped.
    pub(crate) async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Updates the state. Callers hold `dispatch_lock`.
    pub(crate) async fn set_state(&self, state: ActivationState) {
        let mut guard = self.state.lock().await;
        *guard = state;
    }

    /// Replaces the typed code; returns whether submit should be enabled.
    pub(crate) async fn update_code(&self, raw: &str) -> bool {
        self.code_entry.lock().await.update(raw)
    }

    /// Allocates the number identifying the next remote call.
    pub(crate) fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }
}
