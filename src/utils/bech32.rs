//! Bech32 helpers for the LNURL codec.
//!
//! LNURL uses the original **bech32** checksum (BIP-0173), not bech32m,
//! and routinely exceeds the 90-character cap of BIP-0173. The codec
//! here therefore applies its own, caller-provided length ceiling.
//!
//! Notes:
//! - Mixed-case strings are rejected; uppercase input (QR codes) is accepted.
//! - We always **emit lowercase**.

use crate::error::{Error, Result, ValidationError};
use bech32::{self, u5, ToBase32, Variant};

/// Length ceiling for LNURL strings (LUD-01 raises the bech32 limit to 1023).
pub const EXTENDED_MAX_LEN: usize = 1023;

/// Encode `payload` as lowercase bech32 under `hrp`, failing with
/// `UrlTooLong` when the result would exceed `max_len` characters.
pub fn encode_extended(hrp: &str, payload: &[u8], max_len: usize) -> Result<String> {
    let s = bech32::encode(hrp, payload.to_base32(), Variant::Bech32)?;
    if s.len() > max_len {
        return Err(ValidationError::UrlTooLong { len: s.len(), max: max_len }.into());
    }
    Ok(s)
}

/// Decode a bech32 string into `(hrp, words)`. The HRP is returned lowercase.
pub fn decode_words(s: &str) -> Result<(String, Vec<u5>)> {
    let (hrp, data, variant) = bech32::decode(s)?;
    if variant != Variant::Bech32 {
        return Err(Error::Bech32(bech32::Error::InvalidChecksum));
    }
    Ok((hrp, data))
}

/// Regroup five-bit words into bytes, dropping trailing bits that do not
/// fill a whole byte.
pub fn words_to_bytes(words: &[u5]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for w in words {
        acc = (acc << 5) | u32::from(w.to_u8());
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lnurl_reference_vector() {
        // LUD-01 example.
        let url = "https://service.com/api?q=3fc3645b439ce8e7f2553a69e5267081d96dcd340693afabe04be7b0ccd178df";
        let s = encode_extended("lnurl", url.as_bytes(), EXTENDED_MAX_LEN).unwrap();
        assert_eq!(
            s,
            "lnurl1dp68gurn8ghj7um9wfmxjcm99e3k7mf0v9cxj0m385ekvcenxc6r2c35xvukxefcv5mkvv34x5ekzd3ev56nyd3hxqurzepexejxxepnxscrvwfnv9nxzcn9xq6xyefhvgcxxcmyxymnserxfq5fns"
        );
        let (hrp, words) = decode_words(&s.to_ascii_uppercase()).unwrap();
        assert_eq!(hrp, "lnurl");
        assert_eq!(words_to_bytes(&words), url.as_bytes());
    }

    #[test]
    fn length_ceiling() {
        let long = vec![b'a'; 700];
        assert!(matches!(
            encode_extended("lnurl", &long, EXTENDED_MAX_LEN),
            Err(Error::Validation(ValidationError::UrlTooLong { max: 1023, .. }))
        ));
        assert!(encode_extended("lnurl", &long[..500], EXTENDED_MAX_LEN).is_ok());
    }

    #[test]
    fn rejects_bech32m() {
        let s = bech32::encode("lnurl", b"abc".to_base32(), Variant::Bech32m).unwrap();
        assert!(decode_words(&s).is_err());
    }
}
