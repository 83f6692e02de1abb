use thiserror::Error;

/// Common result alias for the client.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// User-input validation failures.
///
/// These are recoverable and meant to be shown to the user as a transient
/// notification at the action boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Payment request does not carry the configured network prefix.
    #[error("invalid invoice network, it must be {expected}")]
    InvalidNetwork { expected: String },

    /// Payment request could not be decoded.
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),

    /// Amount missing, zero, or different from the expected one.
    #[error("invalid invoice amount")]
    InvalidAmount,

    /// Amount above the allowed maximum.
    #[error("invoice amount is higher than available prizes")]
    AmountTooHigh,

    /// Invoice expiry is in the past.
    #[error("invoice already expired")]
    InvoiceExpired,

    /// Lightning address is not `name@domain.tld`.
    #[error("invalid lightning address")]
    InvalidAddress,

    /// Routing fee is larger than the withdrawable balance.
    #[error("invalid fee amount")]
    InvalidFee,

    /// Nothing to withdraw.
    #[error("no prizes available to withdraw")]
    NoPrizes,

    /// Encoded LNURL would exceed the extended bech32 limit.
    #[error("url too long to encode as lnurl ({len} > {max} chars)")]
    UrlTooLong { len: usize, max: usize },

    /// Restore input is too short to be used as key material.
    #[error("restore input must be at least {min} characters long")]
    InvalidRestoreInput { min: usize },
}

/// Malformed key material. Should not happen in normal flows; it points to
/// corrupted storage or hostile input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("stored identity is corrupted: {0}")]
    CorruptedIdentity(&'static str),
}

/// Top-level client error.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    // ---- Network -----------------------------------------------------------
    /// Transport error (request building, connection, DNS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response with the server's message.
    #[error("http status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// HTTP 429.
    #[error("too many requests")]
    RateLimited,

    /// HTTP 404.
    #[error("404 - not found: {0}")]
    NotFound(String),

    /// HTTP 204 where a body was expected.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// The session abort signal fired.
    #[error("request aborted")]
    Aborted,

    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // ---- Validation / crypto ----------------------------------------------
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Bech32 codec error.
    #[error("bech32 error: {0}")]
    Bech32(#[from] bech32::Error),

    // ---- Event stream ------------------------------------------------------
    /// Event-stream transport failure. Recovered by reconnecting.
    #[error("event stream error: {0}")]
    Stream(String),

    // ---- Storage / config --------------------------------------------------
    /// Filesystem failure while writing the identity record.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Identity storage error (load/save).
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error is meant for a transient user notification
    /// (validation and network failures).
    pub fn is_user_facing(&self) -> bool {
        use Error::*;
        matches!(
            self,
            Validation(_)
                | Network(_)
                | HttpStatus { .. }
                | RateLimited
                | NotFound(_)
                | EmptyResponse(_)
        )
    }

    /// Whether this error is likely transient and safe to retry.
    pub fn is_retryable(&self) -> bool {
        use Error::*;
        match self {
            Network(_) | Stream(_) | RateLimited => true,
            HttpStatus { status, .. } => (500..=599).contains(status) || *status == 408,
            Aborted
            | NotFound(_)
            | EmptyResponse(_)
            | Url(_)
            | Json(_)
            | Validation(_)
            | Crypto(_)
            | Bech32(_)
            | Io(_)
            | Storage(_)
            | Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Error::HttpStatus { status: status.as_u16(), message: e.to_string() }
        } else {
            Error::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        let e: Error = ValidationError::InvoiceExpired.into();
        assert!(e.is_user_facing());
        assert_eq!(e.to_string(), "invoice already expired");

        let e: Error = ValidationError::InvalidNetwork { expected: "lnbc".into() }.into();
        assert_eq!(e.to_string(), "invalid invoice network, it must be lnbc");
    }

    #[test]
    fn crypto_and_stream_errors_stay_internal() {
        let e: Error = CryptoError::InvalidKeyFormat("bad hex").into();
        assert!(!e.is_user_facing());
        assert!(!Error::Stream("eof".into()).is_user_facing());
        assert!(Error::Stream("eof".into()).is_retryable());
    }

    #[test]
    fn retry_heuristics() {
        assert!(Error::HttpStatus { status: 503, message: "down".into() }.is_retryable());
        assert!(!Error::HttpStatus { status: 400, message: "bad".into() }.is_retryable());
        assert!(Error::RateLimited.is_retryable());
        assert!(!Error::Aborted.is_retryable());
    }
}
