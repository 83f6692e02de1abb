//! Byte/hex helpers used across the client.
//!
//! Conventions:
//! - Hex strings are **lowercase** and **unprefixed** (no `0x`), matching what
//!   the lottery server stores and compares.
//! - Key material is always 32 bytes / 64 hex characters.
//! - [`hex_encode_text`] is a char-code encoder, not a UTF-8 encoder. It is
//!   only meaningful for ASCII input.

use crate::error::{CryptoError, Result};

/// Length of a hex-encoded 32-byte key or digest.
pub const HEX_KEY_LEN: usize = 64;

/// Whether `s` is non-empty and made only of hex digits (either case).
#[inline]
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether `s` is a 64-character hex string (a 32-byte key or digest).
#[inline]
pub fn is_hex_key(s: &str) -> bool {
    s.len() == HEX_KEY_LEN && is_hex(s)
}

/// Encode bytes as lowercase hex.
#[inline]
pub fn hex_encode<B: AsRef<[u8]>>(bytes: B) -> String {
    hex::encode(bytes.as_ref())
}

/// Encode each character's code point as zero-padded hex (`"test"` → `"74657374"`).
///
/// Characters above U+00FF yield more than two digits, so the output for
/// non-Latin-1 text is not a byte encoding of anything. Callers that feed
/// user text in must accept that.
pub fn hex_encode_text(text: &str) -> String {
    text.chars().map(|c| format!("{:02x}", c as u32)).collect()
}

/// Decode a 64-character hex string into 32 bytes.
pub fn decode_hex_key(s: &str) -> Result<[u8; 32]> {
    if s.len() != HEX_KEY_LEN {
        return Err(CryptoError::InvalidKeyFormat("expected 64 hex characters").into());
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(s, &mut out)
        .map_err(|_| CryptoError::InvalidKeyFormat("not hex encoded"))?;
    Ok(out)
}
