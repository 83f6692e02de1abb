//! Wallet module: the player's ed25519 identity and where it is kept.
//!
//! An [`Identity`] bundles the three values the lottery UI needs:
//!
//! ```text
//! private_key = 32 random bytes (hex)
//! public_key  = ed25519_public(private_key) (hex)
//! nickname    = nickname_from_key(public_key)
//! ```
//!
//! The three fields always change together. A new identity is either
//! generated from the OS RNG or restored from arbitrary user input (see
//! [`normalize_restore_input`]).
//!
//! ## Examples
//! ```no_run
//! use btry_client::wallet::Identity;
//! let id = Identity::restore("my very long recovery phrase")?;
//! println!("{} ({})", id.nickname, id.public_key);
//! # Ok::<(), btry_client::error::Error>(())
//! ```
use crate::error::{CryptoError, Result, ValidationError};
use crate::nickname::nickname_from_key;
use crate::utils::bytes::{hex_encode_text, is_hex, HEX_KEY_LEN};
use crate::utils::hash::sha256_hex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub mod keystore;
pub mod signer;

/// Shortest input accepted by [`Identity::restore`].
pub const MIN_RESTORE_LEN: usize = 12;

/// Input length that is hex-encoded instead of hashed when it is not hex.
const RAW_SEED_LEN: usize = 32;

/// The persisted identity record.
///
/// All fields empty means "no identity yet". Missing fields deserialize as
/// empty; the defaults sit on the fields because `Identity` implements
/// `Drop`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub nickname: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key)
            .field("nickname", &self.nickname)
            .finish_non_exhaustive()
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl Identity {
    /// Fresh random identity.
    pub fn generate() -> Self {
        let (private_key, public_key) = signer::generate_key_pair();
        let nickname = nickname_from_key(&public_key);
        tracing::info!(%nickname, "generated new identity");
        Self { private_key, public_key, nickname }
    }

    /// Identity for an existing 64-character hex private key.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let private_key = private_key.to_ascii_lowercase();
        let public_key = signer::get_public_key(&private_key)?;
        let nickname = nickname_from_key(&public_key);
        Ok(Self { private_key, public_key, nickname })
    }

    /// Deterministically derive an identity from user-supplied text.
    pub fn restore(input: &str) -> Result<Self> {
        let private_key = normalize_restore_input(input)?;
        let identity = Self::from_private_key(&private_key)?;
        tracing::info!(nickname = %identity.nickname, "restored identity");
        Ok(identity)
    }

    /// Whether this is the "no identity yet" record.
    pub fn is_empty(&self) -> bool {
        self.private_key.is_empty() && self.public_key.is_empty() && self.nickname.is_empty()
    }

    /// Check that the public key and nickname follow from the private key.
    pub fn check(&self) -> Result<()> {
        let expected = signer::get_public_key(&self.private_key)
            .map_err(|_| CryptoError::CorruptedIdentity("private key is not valid hex"))?;
        if expected != self.public_key.to_ascii_lowercase() {
            return Err(CryptoError::CorruptedIdentity("public key does not match private key").into());
        }
        if nickname_from_key(&self.public_key) != self.nickname {
            return Err(CryptoError::CorruptedIdentity("nickname does not match public key").into());
        }
        Ok(())
    }

    /// Ownership proof: signature over this identity's public key.
    pub fn signature(&self) -> Result<String> {
        signer::sign(&self.private_key, &self.public_key)
    }
}

/// Turn arbitrary restore input into a 64-character hex private key.
///
/// Rules, first match wins:
/// - fewer than 12 characters: rejected;
/// - 64 hex characters: used as is;
/// - hex of any other length: SHA-256 of the text;
/// - exactly 32 non-hex characters: char codes in hex (64 digits only for
///   ASCII input; wider characters yield a key that is rejected);
/// - anything else: SHA-256 of the text.
pub fn normalize_restore_input(input: &str) -> Result<String> {
    let len = input.chars().count();
    if len < MIN_RESTORE_LEN {
        return Err(ValidationError::InvalidRestoreInput { min: MIN_RESTORE_LEN }.into());
    }
    let key = if is_hex(input) {
        if input.len() == HEX_KEY_LEN {
            input.to_ascii_lowercase()
        } else {
            sha256_hex(input)
        }
    } else if len == RAW_SEED_LEN {
        hex_encode_text(input)
    } else {
        sha256_hex(input)
    };
    Ok(key)
}

pub use keystore::{load_or_generate, FileStorage, IdentityStorage, MemoryStorage};
pub use signer::{generate_key_pair, get_public_key, sign, verify, KeyPair};
