//! SHA-256 helpers.
//!
//! `sha256_hex` is the client's `Hash`: digest of the UTF-8 bytes of a
//! string, rendered as 64 lowercase hex characters. It normalizes arbitrary
//! text into key-sized material for nicknames and identity restore.

use crate::utils::bytes::hex_encode;
use sha2::{Digest, Sha256};

/// SHA-256 digest.
#[inline]
pub fn sha256<B: AsRef<[u8]>>(bytes: B) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hasher.finalize().into()
}

/// SHA-256 of `input`'s UTF-8 bytes as lowercase hex.
#[inline]
pub fn sha256_hex(input: &str) -> String {
    hex_encode(sha256(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_vectors() {
        assert_eq!(
            sha256_hex("test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn output_shape() {
        let h = sha256_hex("any passphrase at all");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
