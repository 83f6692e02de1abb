//! LNURL (LUD-01) encoding: the UTF-8 bytes of a URL under bech32 HRP
//! `lnurl`, allowed up to 1023 characters.
//!
//! Encoded strings are lowercase. Wallet QR codes scan better in upper
//! case, which [`lnurl_decode`] also accepts.

use crate::error::{Result, ValidationError};
use crate::utils::bech32::{decode_words, encode_extended, words_to_bytes, EXTENDED_MAX_LEN};

pub const LNURL_HRP: &str = "lnurl";

/// Encode `url` as an LNURL.
pub fn lnurl_encode(url: &str) -> Result<String> {
    encode_extended(LNURL_HRP, url.as_bytes(), EXTENDED_MAX_LEN)
}

/// Decode an LNURL back to its URL.
pub fn lnurl_decode(lnurl: &str) -> Result<String> {
    let lnurl = lnurl.trim();
    let lnurl = lnurl
        .strip_prefix("lightning:")
        .or_else(|| lnurl.strip_prefix("LIGHTNING:"))
        .unwrap_or(lnurl);
    let (hrp, words) = decode_words(lnurl)?;
    if hrp != LNURL_HRP {
        return Err(ValidationError::InvalidInvoice(format!("expected hrp '{LNURL_HRP}', got '{hrp}'")).into());
    }
    String::from_utf8(words_to_bytes(&words))
        .map_err(|_| ValidationError::InvalidInvoice("lnurl payload is not utf-8".into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn encodes_withdraw_url() {
        let url = "https://btry.example/api/lightning/lnurlw?pubkey=ab&signature=cd";
        let code = lnurl_encode(url).unwrap();
        assert!(code.starts_with("lnurl1"));
        assert_eq!(code, code.to_lowercase());
        assert_eq!(lnurl_decode(&code).unwrap(), url);
        assert_eq!(lnurl_decode(&format!("lightning:{}", code.to_uppercase())).unwrap(), url);
    }

    #[test]
    fn long_urls_are_rejected() {
        let url = format!("https://btry.example/{}", "a".repeat(700));
        assert!(matches!(
            lnurl_encode(&url),
            Err(Error::Validation(ValidationError::UrlTooLong { .. }))
        ));
    }

    #[test]
    fn decode_checks_hrp() {
        let other = crate::utils::bech32::encode_extended("lnbc", b"x", EXTENDED_MAX_LEN).unwrap();
        assert!(lnurl_decode(&other).is_err());
    }
}
