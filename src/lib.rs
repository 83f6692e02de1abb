//! # btry-client
//!
//! Client core for the BTRY Lightning lottery.
//!
//! - [`wallet`]: ed25519 identity, restore from a secret, local persistence.
//! - [`nickname`]: deterministic friendly names for public keys.
//! - [`lightning`]: BOLT11 checks before paying or withdrawing, LNURL and
//!   Lightning Address helpers.
//! - [`rpc`]: REST client for `/api/*` and the reconnecting event stream.
//! - [`payments`]: waiting for a bet or withdrawal to settle.
//! - [`client`]: [`LotteryClient`], the session facade over all of the above.
//!
//! ```no_run
//! use btry_client::{wallet, ClientConfig, LotteryClient};
//!
//! # async fn demo() -> btry_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let storage = wallet::FileStorage::open(&config.storage_dir)?;
//! let identity = wallet::load_or_generate(&storage)?;
//! println!("playing as {}", identity.nickname);
//!
//! let client = LotteryClient::connect(config, identity)?;
//! let lottery = client.api().get_lottery().await?;
//! println!("prize pool: {} sats", lottery.prize_pool);
//! client.close();
//! # Ok(()) }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lightning;
pub mod nickname;
pub mod payments;
pub mod rpc;
pub mod types;
pub mod utils;
pub mod wallet;

pub use client::{LotteryClient, PendingBet, PendingWithdrawal};
pub use config::{ClientConfig, Network};
pub use error::{CryptoError, Error, Result, ValidationError};
pub use lightning::{lnurl_decode, lnurl_encode, validate_invoice, validate_lightning_address, DecodedInvoice, Invoice};
pub use nickname::nickname_from_key;
pub use payments::{PaymentOutcome, PaymentTracker, PendingPayment};
pub use rpc::{ApiClient, EventStream, StreamState};
pub use wallet::Identity;
