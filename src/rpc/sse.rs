//! Reconnecting server-push client (`text/event-stream`).
//!
//! Goals:
//! - One live connection per [`EventStream`]; listeners survive reconnects.
//! - Fan-out by event name: every listener registered for a name is called
//!   once per message carrying that name.
//! - Reconnect forever with exponential backoff (floor 1 s, ceiling 60 s,
//!   reset once a connection opens).
//! - [`EventStream::close`] leaves nothing running: no task, no timer.
//!
//! Lifecycle:
//!
//! ```text
//! Connecting --Opened--> Open
//!     |                   |
//!     +------Failed-------+--> Error --RetryScheduled--> Reconnecting
//!                                                          |
//! Connecting <------------------RetryDue-------------------+
//!
//! any --Shutdown--> Closed (terminal)
//! ```
//!
//! The transport is a trait seam so the loop can be driven by scripted
//! streams in tests; [`HttpEventTransport`] is the real one.

use super::event_codec::{SseDecoder, SseFrame};
use crate::error::{Error, Result};
use crate::types::StreamEvent;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Frames of one connection. Ends (or yields an error) when the connection
/// drops.
pub type FrameStream = BoxStream<'static, Result<SseFrame>>;

/// Opens connections to the event source.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<FrameStream>;
}

// ------------------------------- Transport -------------------------------------

/// `GET {url}` with `Accept: text/event-stream` over reqwest.
#[derive(Debug, Clone)]
pub struct HttpEventTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpEventTransport {
    pub fn new(url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Network(format!("reqwest build: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventTransport for HttpEventTransport {
    async fn connect(&self) -> Result<FrameStream> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| Error::Stream(format!("connect: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Stream(format!("event stream returned {status}")));
        }

        let mut decoder = SseDecoder::new();
        let frames = resp
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.feed(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(Error::Stream(format!("read: {e}")))],
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}

// ---------------------------- State machine ------------------------------------

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Connecting,
    Open,
    Error,
    Reconnecting,
    Closed,
}

/// Inputs of the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSignal {
    Opened,
    Failed,
    RetryScheduled,
    RetryDue,
    Shutdown,
}

impl StreamState {
    /// Next state, or `None` when `signal` is not valid in this state.
    pub fn on(self, signal: StreamSignal) -> Option<StreamState> {
        use StreamSignal as Sig;
        use StreamState as St;
        match (self, signal) {
            (St::Closed, _) => None,
            (_, Sig::Shutdown) => Some(St::Closed),
            (St::Connecting, Sig::Opened) => Some(St::Open),
            (St::Connecting | St::Open, Sig::Failed) => Some(St::Error),
            (St::Error, Sig::RetryScheduled) => Some(St::Reconnecting),
            (St::Reconnecting, Sig::RetryDue) => Some(St::Connecting),
            _ => None,
        }
    }
}

/// Exponential reconnect delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self { floor, ceiling, current: floor }
    }

    /// Delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Delay to wait for this failure; doubles the next one up to the ceiling.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

// ------------------------------- Registry --------------------------------------

/// Raw listener: receives the parsed JSON payload.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by subscribe calls, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event name to its listeners. A name is present only while it has at
/// least one listener.
#[derive(Default)]
struct Registry {
    listeners: HashMap<String, Vec<(SubscriptionId, Listener)>>,
}

struct Shared {
    registry: Mutex<Registry>,
    state: watch::Sender<StreamState>,
    next_id: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(StreamState::Connecting);
        Self {
            registry: Mutex::new(Registry::default()),
            state,
            next_id: AtomicU64::new(1),
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `signal`; returns whether the state changed.
    fn apply(&self, signal: StreamSignal) -> bool {
        self.state.send_if_modified(|state| match state.on(signal) {
            Some(next) => {
                let from = *state;
                tracing::debug!(?from, to = ?next, ?signal, "event stream transition");
                *state = next;
                true
            }
            None => false,
        })
    }

    fn add(&self, event: &str, listener: Listener) -> SubscriptionId {
        let mut reg = self.registry();
        if let Some(existing) = reg
            .listeners
            .get(event)
            .and_then(|list| list.iter().find(|(_, l)| Arc::ptr_eq(l, &listener)))
        {
            return existing.0;
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let list = reg.listeners.entry(event.to_owned()).or_default();
        if list.is_empty() {
            tracing::debug!(event, "attached event");
        }
        list.push((id, listener));
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut reg = self.registry();
        let Some((event, pos)) = reg.listeners.iter().find_map(|(event, list)| {
            list.iter().position(|(sid, _)| *sid == id).map(|pos| (event.clone(), pos))
        }) else {
            return false;
        };
        if let Some(list) = reg.listeners.get_mut(&event) {
            list.remove(pos);
            if list.is_empty() {
                reg.listeners.remove(&event);
                tracing::debug!(%event, "detached event");
            }
        }
        true
    }

    fn dispatch(&self, frame: &SseFrame) {
        // Snapshot so listeners run without the lock held.
        let listeners: Vec<Listener> = {
            let reg = self.registry();
            match reg.listeners.get(&frame.event) {
                Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => {
                    tracing::trace!(event = %frame.event, "no listeners for event");
                    return;
                }
            }
        };

        let payload: Value = match serde_json::from_str(&frame.data) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(event = %frame.event, error = %e, "dropping malformed event payload");
                return;
            }
        };
        tracing::debug!(event = %frame.event, listeners = listeners.len(), "dispatching event");
        for listener in listeners {
            listener(&payload);
        }
    }
}

// ------------------------------- EventStream -----------------------------------

/// Reconnecting event-stream client with listener fan-out.
pub struct EventStream {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl EventStream {
    /// Start the connection loop on the current tokio runtime.
    pub fn spawn<T: EventTransport>(transport: T, backoff: Backoff) -> Self {
        let shared = Arc::new(Shared::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&shared),
            Arc::new(transport),
            backoff,
            cancel.clone(),
        ));
        Self { shared, cancel, task: Mutex::new(Some(task)) }
    }

    /// Connect to `url` over HTTP.
    pub fn connect(url: Url, backoff: Backoff) -> Result<Self> {
        Ok(Self::spawn(HttpEventTransport::new(url)?, backoff))
    }

    pub fn state(&self) -> StreamState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn state_changes(&self) -> watch::Receiver<StreamState> {
        self.shared.state.subscribe()
    }

    /// Register `callback` for `event`.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.add(event, Arc::new(callback))
    }

    /// Register a shared listener. Registering the same listener twice for
    /// the same event returns the first id and does not double-deliver.
    pub fn subscribe_listener(&self, event: &str, listener: Listener) -> SubscriptionId {
        self.shared.add(event, listener)
    }

    /// Typed subscription; payloads that do not fit `T` are logged and
    /// skipped.
    pub fn on<T, F>(&self, callback: F) -> SubscriptionId
    where
        T: StreamEvent,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(T::NAME, move |value| match <T as serde::Deserialize>::deserialize(value) {
            Ok(payload) => callback(payload),
            Err(e) => tracing::warn!(event = T::NAME, error = %e, "dropping malformed event payload"),
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove(id)
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.shared.registry().listeners.get(event).map_or(0, Vec::len)
    }

    /// Event names that currently have listeners, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.registry().listeners.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Drop every listener, keep the connection.
    pub fn clear_listeners(&self) {
        self.shared.registry().listeners.clear();
    }

    /// Stop the connection and any pending reconnect, then drop all
    /// listeners. Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
        if self.shared.apply(StreamSignal::Shutdown) {
            tracing::info!("event stream closed");
        }
        self.shared.registry().listeners.clear();
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run(
    shared: Arc<Shared>,
    transport: Arc<dyn EventTransport>,
    mut backoff: Backoff,
    cancel: CancellationToken,
) {
    'outer: loop {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break 'outer,
            res = transport.connect() => res,
        };

        let failure = match connected {
            Ok(mut frames) => {
                shared.apply(StreamSignal::Opened);
                backoff.reset();
                tracing::info!("event stream open");
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'outer,
                        next = frames.next() => match next {
                            Some(Ok(frame)) => shared.dispatch(&frame),
                            Some(Err(e)) => break e,
                            None => break Error::Stream("connection closed by server".into()),
                        },
                    }
                }
            }
            Err(e) => e,
        };

        shared.apply(StreamSignal::Failed);
        let delay = backoff.on_failure();
        shared.apply(StreamSignal::RetryScheduled);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(error = %failure, delay_ms, "event stream down, reconnecting");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break 'outer,
            _ = tokio::time::sleep(delay) => {}
        }
        shared.apply(StreamSignal::RetryDue);
    }
    shared.apply(StreamSignal::Shutdown);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame { event: event.into(), data: data.into(), id: None }
    }

    #[test]
    fn transitions() {
        use StreamSignal as Sig;
        use StreamState as St;
        assert_eq!(St::Connecting.on(Sig::Opened), Some(St::Open));
        assert_eq!(St::Open.on(Sig::Failed), Some(St::Error));
        assert_eq!(St::Connecting.on(Sig::Failed), Some(St::Error));
        assert_eq!(St::Error.on(Sig::RetryScheduled), Some(St::Reconnecting));
        assert_eq!(St::Reconnecting.on(Sig::RetryDue), Some(St::Connecting));
        for s in [St::Connecting, St::Open, St::Error, St::Reconnecting] {
            assert_eq!(s.on(Sig::Shutdown), Some(St::Closed));
        }
        assert_eq!(St::Open.on(Sig::Opened), None);
        assert_eq!(St::Error.on(Sig::RetryDue), None);
        assert_eq!(St::Closed.on(Sig::Opened), None);
        assert_eq!(St::Closed.on(Sig::Shutdown), None);
    }

    #[test]
    fn backoff_doubles_and_resets() {
        let mut b = Backoff::default();
        let waits: Vec<u64> = (0..8).map(|_| b.on_failure().as_secs()).collect();
        assert_eq!(waits, [1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(b.current(), Duration::from_secs(60));
        b.reset();
        assert_eq!(b.current(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_after_n_failures() {
        for n in 0..10u32 {
            let mut b = Backoff::default();
            for _ in 0..n {
                b.on_failure();
            }
            assert_eq!(b.current().as_secs(), 60u64.min(1 << n));
        }
    }

    #[test]
    fn fan_out_by_name() {
        let shared = Shared::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            shared.add("info", Arc::new(move |_: &Value| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        shared.dispatch(&frame("info", "{}"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        shared.dispatch(&frame("payments", "{}"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn same_listener_registered_once() {
        let shared = Shared::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener: Listener = {
            let hits = Arc::clone(&hits);
            Arc::new(move |_: &Value| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let a = shared.add("payments", Arc::clone(&listener));
        let b = shared.add("payments", Arc::clone(&listener));
        assert_eq!(a, b);
        shared.dispatch(&frame("payments", "{\"status\":1}"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(shared.remove(a));
        assert!(!shared.remove(a));
        shared.dispatch(&frame("payments", "{}"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_unsubscribe_detaches_event() {
        let shared = Shared::new();
        let first = shared.add("info", Arc::new(|_: &Value| {}));
        let second = shared.add("info", Arc::new(|_: &Value| {}));
        let other = shared.add("payments", Arc::new(|_: &Value| {}));
        let names = |shared: &Shared| {
            let mut names: Vec<String> = shared.registry().listeners.keys().cloned().collect();
            names.sort_unstable();
            names
        };
        assert_eq!(names(&shared), ["info", "payments"]);

        assert!(shared.remove(first));
        assert_eq!(names(&shared), ["info", "payments"]);
        assert!(shared.remove(second));
        assert_eq!(names(&shared), ["payments"]);

        // Re-subscribing attaches the name again.
        let again = shared.add("info", Arc::new(|_: &Value| {}));
        assert_eq!(names(&shared), ["info", "payments"]);
        assert!(shared.remove(again));
        assert!(shared.remove(other));
        assert!(names(&shared).is_empty());
    }

    #[test]
    fn malformed_payload_is_skipped() {
        let shared = Shared::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        shared.add("info", Arc::new(move |_: &Value| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        shared.dispatch(&frame("info", "{not json"));
        shared.dispatch(&frame("info", "{\"capacity\":5}"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_state_is_sticky() {
        let shared = Shared::new();
        assert!(shared.apply(StreamSignal::Shutdown));
        assert!(!shared.apply(StreamSignal::Shutdown));
        assert!(!shared.apply(StreamSignal::Opened));
        assert_eq!(*shared.state.borrow(), StreamState::Closed);
    }
}
