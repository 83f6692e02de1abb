//! Wire types for the lottery API and its event stream.
//!
//! The server omits zero values (`omitempty`), so every field defaults when
//! absent. Amounts are in satoshis.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Hex-encoded ed25519 public key.
pub type PublicKey = String;

/// Server-side id of a tracked invoice or payment.
pub type PaymentId = u64;

/// Event carried by the server-push stream under a fixed name.
pub trait StreamEvent: DeserializeOwned + Send + 'static {
    /// Event name on the wire.
    const NAME: &'static str;
}

/// Terminal status of an invoice or payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PaymentStatus {
    #[default]
    Failed,
    Success,
}

impl From<u8> for PaymentStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => PaymentStatus::Success,
            _ => PaymentStatus::Failed,
        }
    }
}

impl From<PaymentStatus> for u8 {
    fn from(s: PaymentStatus) -> Self {
        match s {
            PaymentStatus::Failed => 0,
            PaymentStatus::Success => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Winner {
    pub public_key: PublicKey,
    pub prizes: u64,
    pub ticket: u64,
    pub expired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bet {
    pub public_key: PublicKey,
    /// Index of the last ticket bought with this bet.
    pub index: u64,
    pub tickets: u64,
}

// ------------------------------- Events ----------------------------------------

/// `info`: lottery state changes. Only changed fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<Winner>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_pool: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
}

impl StreamEvent for InfoPayload {
    const NAME: &'static str = "info";
}

/// `invoices`: outcome of a bet invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicesPayload {
    pub error: String,
    pub payment_id: PaymentId,
    pub public_key: PublicKey,
    pub amount: u64,
    pub status: PaymentStatus,
}

impl StreamEvent for InvoicesPayload {
    const NAME: &'static str = "invoices";
}

/// `payments`: outcome of a withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsPayload {
    pub error: String,
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
}

impl StreamEvent for PaymentsPayload {
    const NAME: &'static str = "payments";
}

// ------------------------------ REST bodies ------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BetsResponse {
    pub bets: Vec<Bet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeightsResponse {
    pub heights: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LotteryInfo {
    pub prize_pool: i64,
    pub capacity: i64,
    pub next_height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvoiceResponse {
    pub invoice: String,
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrizesResponse {
    pub prizes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WinnersResponse {
    pub winners: Vec<Winner>,
}

/// LNURL-withdraw metadata (LUD-03), amounts in millisatoshis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LnurlWithdrawResponse {
    pub tag: String,
    pub callback: String,
    pub k1: String,
    pub default_description: String,
    pub min_withdrawable: u64,
    pub max_withdrawable: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WithdrawResponse {
    pub status: String,
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LightningAddressResponse {
    pub address: String,
    pub has_address: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SetLightningAddressResponse {
    pub success: bool,
}

/// Error bodies: `{ "error": .. }` from most handlers, `{ "status", "reason" }`
/// from the LNURL ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Api { error: String },
    Lnurl { status: String, reason: String },
}

impl ErrorBody {
    pub(crate) fn message(self) -> String {
        match self {
            ErrorBody::Api { error } => error,
            ErrorBody::Lnurl { status, reason } => format!("{status}: {reason}"),
        }
    }
}
