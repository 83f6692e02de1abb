// Shared fixtures for the integration tests.
// ------------------------------------------
// - `invoice`: signed mainnet BOLT11 strings from a fixed node key.
// - `ScriptedTransport`: an event transport whose connections are scripted
//   up front and whose connect attempts are timestamped.
// - `MockServer`: a minimal HTTP/1.1 responder on 127.0.0.1 that records
//   every request it sees.

#![allow(dead_code)]

use async_trait::async_trait;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use btry_client::error::{Error, Result};
use btry_client::rpc::event_codec::SseFrame;
use btry_client::rpc::sse::{EventTransport, FrameStream};
use futures::channel::mpsc;
use futures::StreamExt;
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

// ------------------------------- Invoices --------------------------------------

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Mainnet invoice for `amount_sat`, created at `timestamp`.
pub fn invoice(amount_sat: u64, timestamp: u64, expiry: Option<u64>) -> String {
    let node_key = SecretKey::from_slice(&[0x42; 32]).unwrap();
    let mut builder = InvoiceBuilder::new(Currency::Bitcoin)
        .description("btry bet".into())
        .payment_hash(sha256::Hash::from_byte_array([0x11; 32]))
        .payment_secret(PaymentSecret([0x22; 32]))
        .duration_since_epoch(Duration::from_secs(timestamp))
        .min_final_cltv_expiry_delta(144)
        .amount_milli_satoshis(amount_sat * 1_000);
    if let Some(secs) = expiry {
        builder = builder.expiry_time(Duration::from_secs(secs));
    }
    builder
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &node_key))
        .unwrap()
        .to_string()
}

/// Payment hash every [`invoice`] carries.
pub fn payment_hash() -> String {
    "11".repeat(32)
}

// ------------------------------- Transport -------------------------------------

pub enum Step {
    /// Connection refused.
    Fail,
    /// Connection opens and yields whatever the stream yields.
    Open(FrameStream),
}

/// Frame source that stays open until the sender is dropped.
pub fn live() -> (mpsc::UnboundedSender<Result<SseFrame>>, Step) {
    let (tx, rx) = mpsc::unbounded();
    (tx, Step::Open(rx.boxed()))
}

pub fn frame(event: &str, data: &str) -> Result<SseFrame> {
    Ok(SseFrame { event: event.into(), data: data.into(), id: None })
}

/// Plays `steps` in order, then hands out idle connections forever.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps: Arc::new(Mutex::new(steps.into())), attempts: Arc::default() }
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn connect(&self) -> Result<FrameStream> {
        self.attempts.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Fail) => Err(Error::Stream("connection refused".into())),
            Some(Step::Open(frames)) => Ok(frames),
            None => Ok(futures::stream::pending().boxed()),
        }
    }
}

// ------------------------------- HTTP mock -------------------------------------

#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub status: u16,
    pub body: String,
}

pub fn route(method: &'static str, path: &'static str, status: u16, body: impl Into<String>) -> Route {
    Route { method, path, status, body: body.into() }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    pub authorization: Option<String>,
}

pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let log = Arc::clone(&requests);
        let routes = Arc::new(routes);
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(sock, &routes, &log).await;
                });
            }
        });
        Self { url: format!("http://{addr}"), requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut sock: TcpStream, routes: &[Route], log: &Mutex<Vec<Recorded>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_owned();
    let target = request_line.next().unwrap_or_default().to_owned();
    let authorization = lines.take_while(|l| !l.is_empty()).find_map(|l| {
        let (name, value) = l.split_once(':')?;
        name.eq_ignore_ascii_case("authorization").then(|| value.trim().to_owned())
    });
    let path = target.split('?').next().unwrap_or_default().to_owned();
    log.lock().unwrap().push(Recorded { method: method.clone(), target, authorization });

    let (status, body) = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, r#"{"error":"not found"}"#.to_owned()));
    let resp = format!(
        "HTTP/1.1 {status} MOCK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    sock.write_all(resp.as_bytes()).await?;
    sock.shutdown().await
}
