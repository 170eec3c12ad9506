//! Per-session shared state
//!
//! One login attempt shares exactly two resources across tasks: the
//! pending-result sender and the listener shutdown sender. Both live behind
//! one-time `take()` transitions so that the callback handler, the timeout
//! timer, and explicit cancellation can race without double-settling.

use crate::types::SessionId;
use ca_types::{AccountProfile, AuthResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct SessionShared {
    id: SessionId,

    /// Settle-once pending result. `None` once settled.
    result_tx: Mutex<Option<oneshot::Sender<AuthResult<AccountProfile>>>>,

    /// Stop-once listener shutdown signal. `None` once stopped.
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,

    /// Timeout timer, armed after the browser hand-off.
    timer: Mutex<Option<JoinHandle<()>>>,

    /// Guards the callback route: the listener serves exactly one redirect.
    callback_claimed: AtomicBool,
}

impl SessionShared {
    pub fn new(
        id: SessionId,
        result_tx: oneshot::Sender<AuthResult<AccountProfile>>,
        shutdown_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            result_tx: Mutex::new(Some(result_tx)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            timer: Mutex::new(None),
            callback_claimed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Settle the pending result and run teardown. The first caller wins;
    /// every later call is a no-op. Returns whether this call settled.
    pub fn finish(&self, result: AuthResult<AccountProfile>) -> bool {
        let Some(tx) = self.result_tx.lock().take() else {
            return false;
        };

        if tx.send(result).is_err() {
            debug!("Session {}: result receiver dropped before settlement", self.id);
        }

        self.stop_listener();
        self.cancel_timer();
        true
    }

    /// Signal the callback server to shut down. Idempotent.
    pub fn stop_listener(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
            debug!("Session {}: listener shutdown signalled", self.id);
        }
    }

    /// Abort the timeout timer if it is still armed.
    ///
    /// Abort only lands at an await point, so the timer task's own
    /// settle-and-teardown sequence (which never awaits) cannot be cut short
    /// by its self-abort here.
    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }

    pub fn arm_timer(&self, handle: JoinHandle<()>) {
        *self.timer.lock() = Some(handle);
    }

    /// Claim the single redirect delivery. Returns false if a request was
    /// already handled.
    pub fn claim_callback(&self) -> bool {
        self.callback_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_settled(&self) -> bool {
        self.result_tx.lock().is_none()
    }
}
