//! REST client for the lottery API (reqwest).
//!
//! Features:
//! - Async `reqwest` client with sane defaults (timeouts, UA).
//! - `Authorization: Bearer <public key>` on every request once an identity
//!   is set; no header while the key is empty.
//! - Server errors mapped onto [`Error`]: 429, 404, `{error}` and LNURL
//!   `{status, reason}` bodies.
//! - One session-wide abort signal: [`ApiClient::abort`] fails every
//!   in-flight request with [`Error::Aborted`] and arms a fresh signal for
//!   the requests that follow.
//!
//! This client is transport-only. It does not validate invoices or sign
//! anything; see [`LotteryClient`](crate::client::LotteryClient).

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{
    BetsResponse, ErrorBody, HeightsResponse, InvoiceResponse, LightningAddressResponse,
    LnurlWithdrawResponse, LotteryInfo, PrizesResponse, SetLightningAddressResponse,
    WinnersResponse, WithdrawResponse,
};
use reqwest::{header, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = concat!("btry-client/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ApiClient`].
#[derive(Clone, Debug)]
pub struct ApiClientBuilder {
    base: Url,
    timeout: Duration,
    connect_timeout: Duration,
    public_key: String,
    user_agent: Option<String>,
    use_proxy: bool,
}

impl ApiClientBuilder {
    /// `api_url` is the server origin; requests go to `{api_url}/api/...`.
    pub fn new(api_url: Url) -> Self {
        let mut base = api_url;
        let path = format!("{}/api/", base.path().trim_end_matches('/'));
        base.set_path(&path);
        Self {
            base,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            public_key: String::new(),
            user_agent: None,
            use_proxy: true,
        }
    }

    pub fn from_str(api_url: &str) -> Result<Self> {
        Ok(Self::new(api_url.parse::<Url>()?))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Public key sent as bearer token.
    pub fn public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = public_key.into();
        self
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_owned());
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let ua = self
            .user_agent
            .as_deref()
            .and_then(|ua| header::HeaderValue::from_str(ua).ok())
            .unwrap_or_else(|| header::HeaderValue::from_static(USER_AGENT));
        headers.insert(header::USER_AGENT, ua);

        let mut builder = Client::builder();
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .default_headers(headers)
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Network(format!("reqwest build: {e}")))?;

        Ok(ApiClient {
            base: self.base,
            client,
            public_key: RwLock::new(self.public_key),
            abort: Mutex::new(CancellationToken::new()),
        })
    }
}

/// Async client for the lottery REST API.
pub struct ApiClient {
    base: Url,
    client: Client,
    public_key: RwLock<String>,
    abort: Mutex<CancellationToken>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base.as_str()).finish()
    }
}

impl ApiClient {
    /// Quick constructor with defaults.
    pub fn new(api_url: &str) -> Result<Self> {
        ApiClientBuilder::from_str(api_url)?.build()
    }

    pub fn builder(api_url: &str) -> Result<ApiClientBuilder> {
        ApiClientBuilder::from_str(api_url)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        ApiClientBuilder::new(config.api_url.clone()).build()
    }

    /// `{api_url}/api/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Change the bearer identity; an empty key disables the header.
    pub fn set_public_key(&self, public_key: &str) {
        *self.public_key.write().unwrap_or_else(PoisonError::into_inner) = public_key.to_owned();
    }

    pub fn public_key(&self) -> String {
        self.public_key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Abort every in-flight request. Later requests are unaffected.
    pub fn abort(&self) {
        let mut token = self.abort.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
        tracing::debug!("aborted in-flight requests");
    }

    // ------------------------------ endpoints -----------------------------------

    /// Bets of the lottery at `height`. `limit = 0` means no limit.
    pub async fn get_bets(&self, height: u32, offset: u64, limit: u64, reverse: bool) -> Result<BetsResponse> {
        let query = [
            ("height", height.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("reverse", reverse.to_string()),
        ];
        self.get("bets", &query).await
    }

    /// Heights of past lotteries.
    pub async fn get_heights(&self, offset: u64, limit: u64, reverse: bool) -> Result<HeightsResponse> {
        let query = [
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("reverse", reverse.to_string()),
        ];
        self.get("heights", &query).await
    }

    pub async fn get_lottery(&self) -> Result<LotteryInfo> {
        self.get("lottery", &[]).await
    }

    /// Invoice for a bet of `amount` sats.
    pub async fn get_invoice(&self, amount: u64) -> Result<InvoiceResponse> {
        self.get("invoice", &[("amount", amount.to_string())]).await
    }

    /// Withdrawable prizes of the current identity.
    pub async fn get_prizes(&self) -> Result<PrizesResponse> {
        self.get("prizes", &[]).await
    }

    pub async fn get_winners(&self, height: u32) -> Result<WinnersResponse> {
        self.get("winners", &[("height", height.to_string())]).await
    }

    /// Winners between two lottery heights, inclusive.
    pub async fn get_winners_history(&self, from: u32, to: u32) -> Result<WinnersResponse> {
        let query = [("from", from.to_string()), ("to", to.to_string())];
        self.get("winners/history", &query).await
    }

    /// URL a wallet calls to start an LNURL withdrawal.
    pub fn lnurl_withdraw_url(&self, public_key: &str, signature: &str) -> Result<Url> {
        self.url("lightning/lnurlw", &[("pubkey", public_key.to_owned()), ("signature", signature.to_owned())])
    }

    /// LNURL-withdraw metadata for the signed identity.
    pub async fn lnurl_withdraw(&self, public_key: &str, signature: &str) -> Result<LnurlWithdrawResponse> {
        let url = self.lnurl_withdraw_url(public_key, signature)?;
        self.send(Method::GET, url).await
    }

    /// Ask the server to pay `pr`, authorized by `k1` (the identity signature).
    pub async fn withdraw(&self, k1: &str, pr: &str, public_key: &str, fee: u64) -> Result<WithdrawResponse> {
        let query = [
            ("k1", k1.to_owned()),
            ("pr", pr.to_owned()),
            ("pubkey", public_key.to_owned()),
            ("fee", fee.to_string()),
        ];
        self.post("withdraw", &query).await
    }

    pub async fn get_lightning_address(&self) -> Result<LightningAddressResponse> {
        self.get("lightning/address", &[]).await
    }

    /// Register the address prizes are paid to automatically.
    pub async fn set_lightning_address(&self, address: &str) -> Result<SetLightningAddressResponse> {
        self.post("lightning/address", &[("address", address.to_owned())]).await
    }

    // ------------------------------ internals -----------------------------------

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, query)?;
        self.send(Method::GET, url).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, query)?;
        self.send(Method::POST, url).await
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        let token = self.abort.lock().unwrap_or_else(PoisonError::into_inner).clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Aborted),
            res = self.execute(method, url) => res,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        let mut req = self.client.request(method.clone(), url.clone());
        let public_key = self.public_key();
        if !public_key.is_empty() {
            req = req.bearer_auth(public_key);
        }
        if method == Method::POST {
            req = req.header(header::CONTENT_TYPE, "application/json; charset=UTF-8");
        }

        tracing::debug!(%method, path = url.path(), "api request");
        let resp = req.send().await.map_err(|e| Error::Network(format!("send: {e}")))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("read body: {e}")))?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => return Err(Error::RateLimited),
            StatusCode::NOT_FOUND => return Err(Error::NotFound(url.to_string())),
            StatusCode::NO_CONTENT => return Err(Error::EmptyResponse(url.to_string())),
            s if !s.is_success() => {
                return Err(Error::HttpStatus { status: s.as_u16(), message: error_message(&bytes) })
            }
            _ => {}
        }

        serde_json::from_slice(&bytes).map_err(Error::from)
    }
}

// --------------------------- helpers -----------------------------------------

fn truncate_body(bytes: &[u8]) -> String {
    const LIM: usize = 512;
    let s = String::from_utf8_lossy(bytes);
    if s.len() > LIM {
        let mut end = LIM;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[+{}B]", &s[..end], s.len() - end)
    } else {
        s.into_owned()
    }
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map(ErrorBody::message)
        .unwrap_or_else(|_| truncate_body(body))
}

// ------------------------------ tests ----------------------------------------
