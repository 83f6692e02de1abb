//! In-flight payment tracking.
//!
//! A flow that hands an invoice to the user (bet) or to the server
//! (withdrawal) gets a payment id back and waits for the matching status
//! event. [`PaymentTracker`] is that waiting room: ids go in with
//! [`track`](PaymentTracker::track), come out on the first terminal status
//! seen by [`observe`](PaymentTracker::observe).

use crate::error::{Error, Result};
use crate::rpc::sse::{EventStream, SubscriptionId};
use crate::types::{InvoicesPayload, PaymentId, PaymentStatus, PaymentsPayload, StreamEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Terminal result of a tracked payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    /// Server-provided reason, empty on success.
    pub error: String,
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}

/// Stream events that settle a payment.
pub trait PaymentEvent: StreamEvent {
    fn payment_id(&self) -> PaymentId;
    fn status(&self) -> PaymentStatus;
    fn error(&self) -> &str;
}

impl PaymentEvent for InvoicesPayload {
    fn payment_id(&self) -> PaymentId {
        self.payment_id
    }
    fn status(&self) -> PaymentStatus {
        self.status
    }
    fn error(&self) -> &str {
        &self.error
    }
}

impl PaymentEvent for PaymentsPayload {
    fn payment_id(&self) -> PaymentId {
        self.payment_id
    }
    fn status(&self) -> PaymentStatus {
        self.status
    }
    fn error(&self) -> &str {
        &self.error
    }
}

/// Future side of [`PaymentTracker::track`].
#[derive(Debug)]
pub struct PendingPayment {
    payment_id: PaymentId,
    rx: oneshot::Receiver<PaymentOutcome>,
}

impl PendingPayment {
    pub fn payment_id(&self) -> PaymentId {
        self.payment_id
    }

    /// Wait for the terminal status. Fails with [`Error::Aborted`] if the
    /// tracker is cleared first.
    pub async fn wait(self) -> Result<PaymentOutcome> {
        self.rx.await.map_err(|_| Error::Aborted)
    }
}

/// Set of payment ids awaiting a terminal status.
#[derive(Debug, Default)]
pub struct PaymentTracker {
    pending: Mutex<HashMap<PaymentId, Vec<oneshot::Sender<PaymentOutcome>>>>,
}

impl PaymentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<PaymentId, Vec<oneshot::Sender<PaymentOutcome>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting for `payment_id`. Several waiters may track the same id.
    pub fn track(&self, payment_id: PaymentId) -> PendingPayment {
        let (tx, rx) = oneshot::channel();
        self.pending().entry(payment_id).or_default().push(tx);
        tracing::debug!(payment_id, "tracking payment");
        PendingPayment { payment_id, rx }
    }

    /// Record a terminal status. Returns whether `payment_id` was tracked;
    /// unknown ids are ignored.
    pub fn observe(&self, payment_id: PaymentId, status: PaymentStatus, error: &str) -> bool {
        let Some(waiters) = self.pending().remove(&payment_id) else {
            return false;
        };
        tracing::debug!(payment_id, ?status, "payment settled");
        let outcome = PaymentOutcome { payment_id, status, error: error.to_owned() };
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
        true
    }

    pub fn is_tracking(&self, payment_id: PaymentId) -> bool {
        self.pending().contains_key(&payment_id)
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every id; their waiters fail with `Aborted`.
    pub fn clear(&self) {
        self.pending().clear();
    }

    /// Feed `E` events from `stream` into this tracker.
    pub fn attach<E: PaymentEvent>(self: &Arc<Self>, stream: &EventStream) -> SubscriptionId {
        let tracker = Arc::clone(self);
        stream.on(move |event: E| {
            tracker.observe(event.payment_id(), event.status(), event.error());
        })
    }
}
