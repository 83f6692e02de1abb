//! Session facade tying identity, REST, the event stream and validation
//! together for the bet, withdraw and LNURL flows.
//!
//! ```no_run
//! use btry_client::{client::LotteryClient, config::ClientConfig, wallet};
//! # async fn demo() -> btry_client::error::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let storage = wallet::FileStorage::open(&config.storage_dir)?;
//! let identity = wallet::load_or_generate(&storage)?;
//! let client = LotteryClient::connect(config, identity)?;
//!
//! let bet = client.place_bet(1_000).await?;
//! println!("pay this: {}", bet.payment_request);
//! let outcome = bet.pending.wait().await?;
//! println!("bet settled: {}", outcome.is_success());
//! client.close();
//! # Ok(()) }
//! ```

use crate::config::ClientConfig;
use crate::error::{Result, ValidationError};
use crate::lightning::{lnurl_encode, validate_invoice, validate_lightning_address, Invoice};
use crate::nickname::nickname_from_key;
use crate::payments::{PaymentTracker, PendingPayment};
use crate::rpc::http::{ApiClient, ApiClientBuilder};
use crate::rpc::sse::{Backoff, EventStream, EventTransport, HttpEventTransport};
use crate::types::{InvoicesPayload, PaymentsPayload};
use crate::wallet::{Identity, IdentityStorage};
use std::sync::{Arc, PoisonError, RwLock};

/// A bet invoice waiting to be paid.
#[derive(Debug)]
pub struct PendingBet {
    /// BOLT11 string to show the user.
    pub payment_request: String,
    pub invoice: Invoice,
    /// Resolves on the matching `invoices` event.
    pub pending: PendingPayment,
}

/// A withdrawal the server accepted and is paying out.
#[derive(Debug)]
pub struct PendingWithdrawal {
    pub invoice: Invoice,
    pub status: String,
    /// Resolves on the matching `payments` event.
    pub pending: PendingPayment,
}

pub struct LotteryClient {
    config: ClientConfig,
    identity: RwLock<Identity>,
    api: ApiClient,
    events: EventStream,
    invoices: Arc<PaymentTracker>,
    payments: Arc<PaymentTracker>,
}

impl std::fmt::Debug for LotteryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LotteryClient")
            .field("api", &self.api)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl LotteryClient {
    /// Connect to the server described by `config` as `identity`.
    pub fn connect(config: ClientConfig, identity: Identity) -> Result<Self> {
        let transport = HttpEventTransport::new(config.events_url()?)?;
        Self::with_transport(config, identity, transport)
    }

    /// Like [`connect`](Self::connect) with a caller-provided event transport.
    pub fn with_transport<T: EventTransport>(config: ClientConfig, identity: Identity, transport: T) -> Result<Self> {
        let api = ApiClientBuilder::new(config.api_url.clone()).build()?;
        Ok(Self::from_parts(config, identity, api, transport))
    }

    /// Assemble a client from a prepared REST client and event transport.
    /// The API client is switched to `identity`'s public key.
    pub fn from_parts<T: EventTransport>(config: ClientConfig, identity: Identity, api: ApiClient, transport: T) -> Self {
        api.set_public_key(&identity.public_key);
        let events = EventStream::spawn(transport, Backoff::new(config.backoff_floor, config.backoff_ceiling));

        let invoices = Arc::new(PaymentTracker::new());
        let payments = Arc::new(PaymentTracker::new());
        invoices.attach::<InvoicesPayload>(&events);
        payments.attach::<PaymentsPayload>(&events);

        tracing::info!(nickname = %identity.nickname, api = %api.base_url(), "lottery client ready");
        Self {
            config,
            identity: RwLock::new(identity),
            api,
            events,
            invoices,
            payments,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn events(&self) -> &EventStream {
        &self.events
    }

    pub fn identity(&self) -> Identity {
        self.identity.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Persist `identity` and switch the session to it. Nothing changes if
    /// saving fails.
    pub fn replace_identity(&self, identity: Identity, storage: &dyn IdentityStorage) -> Result<()> {
        identity.check()?;
        storage.save(&identity)?;
        self.api.set_public_key(&identity.public_key);
        tracing::info!(nickname = %identity.nickname, "switched identity");
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = identity;
        Ok(())
    }

    /// Friendly name for any public key.
    pub fn nickname_of(&self, public_key: &str) -> String {
        nickname_from_key(public_key)
    }

    /// Request an invoice for `amount` sats and start tracking it.
    pub async fn place_bet(&self, amount: u64) -> Result<PendingBet> {
        if amount == 0 {
            return Err(ValidationError::InvalidAmount.into());
        }
        let resp = self.api.get_invoice(amount).await?;
        let invoice = validate_invoice(&resp.invoice, &self.config.bolt11_prefix, Some(amount), None)?;
        let pending = self.invoices.track(resp.payment_id);
        Ok(PendingBet { payment_request: resp.invoice, invoice, pending })
    }

    /// Withdraw prizes to `invoice`, leaving `fee` sats for routing.
    pub async fn withdraw(&self, invoice: &str, fee: u64) -> Result<PendingWithdrawal> {
        let prizes = self.api.get_prizes().await?.prizes;
        let max = withdrawable(prizes, fee)?;
        let validated = validate_invoice(invoice, &self.config.bolt11_prefix, None, Some(max))?;

        let identity = self.identity();
        let signature = identity.signature()?;
        let resp = self.api.withdraw(&signature, invoice, &identity.public_key, fee).await?;
        let pending = self.payments.track(resp.payment_id);
        Ok(PendingWithdrawal { invoice: validated, status: resp.status, pending })
    }

    /// LNURL a wallet can scan to withdraw the current prizes.
    pub fn lnurl_withdraw_code(&self) -> Result<String> {
        let identity = self.identity();
        let signature = identity.signature()?;
        let url = self.api.lnurl_withdraw_url(&identity.public_key, &signature)?;
        lnurl_encode(url.as_str())
    }

    /// Validate and register the address prizes are paid to.
    pub async fn set_lightning_address(&self, address: &str) -> Result<bool> {
        validate_lightning_address(address)?;
        Ok(self.api.set_lightning_address(address).await?.success)
    }

    /// Close the event stream and abort in-flight requests.
    pub fn close(&self) {
        self.events.close();
        self.api.abort();
        self.invoices.clear();
        self.payments.clear();
    }
}

/// Amount that can be withdrawn from `prizes` after reserving `fee`.
pub fn withdrawable(prizes: u64, fee: u64) -> Result<u64> {
    if prizes == 0 {
        return Err(ValidationError::NoPrizes.into());
    }
    prizes.checked_sub(fee).ok_or_else(|| ValidationError::InvalidFee.into())
}
