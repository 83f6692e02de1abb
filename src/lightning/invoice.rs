//! BOLT11 payment request decoding and the checks run before an invoice is
//! paid or submitted.
//!
//! Decoding, checksum and signature verification are done by
//! `lightning-invoice`; this module keeps the fields the lottery needs and
//! runs the lottery's own rules on top:
//!
//! ```text
//! network prefix -> decode -> decoded currency -> amount -> max -> expiry
//! ```

use crate::error::{Error, Result, ValidationError};
use lightning_invoice::Bolt11Invoice;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Expiry applied when the `x` field is absent.
pub const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// Fields of a decoded payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInvoice {
    /// Currency part of the HRP, e.g. `lnbc`, `lntb`, `lnbcrt`.
    pub prefix: String,
    pub amount_msat: Option<u64>,
    /// Creation time, unix seconds.
    pub timestamp: u64,
    /// Seconds after `timestamp` the invoice stays payable.
    pub expiry: u64,
    pub payment_hash: String,
    pub payment_secret: String,
    /// Hex-encoded compressed node key, when the `n` field is present.
    pub payee: Option<String>,
    pub min_final_cltv_expiry_delta: u64,
}

impl DecodedInvoice {
    /// Decode a BOLT11 payment request. Upper-case input is accepted.
    pub fn decode(pay_req: &str) -> Result<Self> {
        let invoice = Bolt11Invoice::from_str(pay_req.trim())
            .map_err(|e| ValidationError::InvalidInvoice(e.to_string()))?;
        Ok(Self::from(&invoice))
    }

    /// Amount rounded to the nearest satoshi (half up).
    pub fn amount_sat(&self) -> Option<u64> {
        self.amount_msat.map(|msat| msat.saturating_add(500) / 1000)
    }

    /// Unix time at which the invoice stops being payable.
    pub fn expires_at(&self) -> u64 {
        self.timestamp.saturating_add(self.expiry)
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at() <= now
    }
}

impl From<&Bolt11Invoice> for DecodedInvoice {
    fn from(invoice: &Bolt11Invoice) -> Self {
        Self {
            prefix: format!("ln{}", invoice.currency()),
            amount_msat: invoice.amount_milli_satoshis(),
            timestamp: invoice.duration_since_epoch().as_secs(),
            expiry: invoice.expiry_time().as_secs(),
            payment_hash: hex::encode(invoice.payment_hash()),
            payment_secret: hex::encode(invoice.payment_secret().0),
            payee: invoice.payee_pub_key().map(ToString::to_string),
            min_final_cltv_expiry_delta: invoice.min_final_cltv_expiry_delta(),
        }
    }
}

impl FromStr for DecodedInvoice {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// What a caller gets back from a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub payment_hash: String,
    pub amount_sat: u64,
}

/// Validate `pay_req` against the wallet's network and amount bounds.
///
/// `target_sat` requires an exact amount (bets); `max_sat` caps it
/// (withdrawals). Checks run in order: network prefix, decoding, amount,
/// upper bound, expiry.
pub fn validate_invoice(
    pay_req: &str,
    prefix: &str,
    target_sat: Option<u64>,
    max_sat: Option<u64>,
) -> Result<Invoice> {
    validate_invoice_at(pay_req, prefix, target_sat, max_sat, unix_now())
}

/// [`validate_invoice`] with an explicit clock.
pub fn validate_invoice_at(
    pay_req: &str,
    prefix: &str,
    target_sat: Option<u64>,
    max_sat: Option<u64>,
    now: u64,
) -> Result<Invoice> {
    let pay_req = pay_req.trim();
    let network_error = || ValidationError::InvalidNetwork { expected: prefix.to_owned() };

    if !pay_req.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase()) {
        return Err(network_error().into());
    }

    let decoded = DecodedInvoice::decode(pay_req)?;
    // `lnbc` is also a prefix of `lnbcrt`; compare the decoded currency too.
    if !decoded.prefix.eq_ignore_ascii_case(prefix) {
        return Err(network_error().into());
    }

    let amount_sat = decoded
        .amount_sat()
        .filter(|sat| *sat > 0)
        .ok_or(ValidationError::InvalidAmount)?;
    if target_sat.is_some_and(|target| target != amount_sat) {
        return Err(ValidationError::InvalidAmount.into());
    }
    if max_sat.is_some_and(|max| amount_sat > max) {
        return Err(ValidationError::AmountTooHigh.into());
    }
    if decoded.is_expired_at(now) {
        return Err(ValidationError::InvoiceExpired.into());
    }

    tracing::debug!(payment_hash = %decoded.payment_hash, amount_sat, "invoice validated");
    Ok(Invoice { payment_hash: decoded.payment_hash, amount_sat })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
