//! Network transports: the REST client and the server-push event stream.

pub mod event_codec;
pub mod http;
pub mod sse;

pub use event_codec::{SseDecoder, SseFrame};
pub use http::{ApiClient, ApiClientBuilder};
pub use sse::{
    Backoff, EventStream, EventTransport, FrameStream, HttpEventTransport, Listener, StreamSignal, StreamState,
    SubscriptionId,
};
