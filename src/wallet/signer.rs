//! Ed25519 key material and the ownership proof sent to the server.
//!
//! Keys travel as 64-character lowercase hex. The proof of ownership is an
//! RFC 8032 signature over the **raw 32 bytes of the public key**:
//!
//! ```text
//! signature = ed25519_sign(private_key, hex_decode(public_key))
//! ```
//!
//! The server checks it with `verify(pub, pub, sig)`. Ed25519 signing is
//! deterministic, so a given key pair always produces the same signature.

use crate::error::{CryptoError, Result};
use crate::utils::bytes::{decode_hex_key, hex_encode};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// An ed25519 key pair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl KeyPair {
    /// Fresh key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Key pair from a 64-character hex private key.
    pub fn from_private_hex(private_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(decode_hex_key(private_key)?);
        Ok(Self { signing_key: SigningKey::from_bytes(&bytes) })
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex_encode(self.signing_key.to_bytes()))
    }

    pub fn public_key_hex(&self) -> String {
        hex_encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign the raw public key bytes.
    pub fn sign_public_key(&self) -> String {
        let message = self.signing_key.verifying_key().to_bytes();
        hex_encode(self.signing_key.sign(&message).to_bytes())
    }
}

/// Generate a key pair, returned as `(private_key_hex, public_key_hex)`.
pub fn generate_key_pair() -> (String, String) {
    let pair = KeyPair::generate();
    let private = pair.private_key_hex();
    (private.as_str().to_owned(), pair.public_key_hex())
}

/// Public key for a 64-character hex private key.
pub fn get_public_key(private_key: &str) -> Result<String> {
    Ok(KeyPair::from_private_hex(private_key)?.public_key_hex())
}

/// Sign `public_key` (decoded to bytes) with `private_key`.
///
/// The public key is taken as given; it is not checked against the private
/// key, which matches what the server receives.
pub fn sign(private_key: &str, public_key: &str) -> Result<String> {
    let pair = KeyPair::from_private_hex(private_key)?;
    let message = decode_hex_key(public_key)?;
    Ok(hex_encode(pair.signing_key.sign(&message).to_bytes()))
}

/// Check a signature produced by [`sign`] against `public_key`.
pub fn verify(public_key: &str, signature: &str) -> Result<()> {
    let key_bytes = decode_hex_key(public_key)?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| CryptoError::InvalidKeyFormat("not a curve point"))?;

    let mut sig_bytes = [0u8; 64];
    hex::decode_to_slice(signature, &mut sig_bytes)
        .map_err(|_| CryptoError::InvalidKeyFormat("signature must be 128 hex characters"))?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(&key_bytes, &signature)
        .map_err(|_| CryptoError::InvalidSignature.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const PRIVATE: &str = "0a20cec75e014c4afb5bccbd194b20e6fea7c727a3ccfdf6b72227154a575343";
    const PUBLIC: &str = "6281adefcbf753053863061d414a905fb5b9063c22ec44feea10d82c8793a9a9";
    const SIGNATURE: &str = "52ac82a03b6fc0d7e4f2aedcaf2b792dbcbd11b1e2664e4659f24429d0b01dbf5707ecb678121c31c2fe6586318c674fe8d04cbf14e194fe461a8dfcb2f7d903";

    #[test]
    fn golden_signature() {
        assert_eq!(get_public_key(PRIVATE).unwrap(), PUBLIC);
        assert_eq!(sign(PRIVATE, PUBLIC).unwrap(), SIGNATURE);
        assert_eq!(KeyPair::from_private_hex(PRIVATE).unwrap().sign_public_key(), SIGNATURE);
        verify(PUBLIC, SIGNATURE).unwrap();
    }

    #[test]
    fn golden_public_key() {
        assert_eq!(
            get_public_key("567dab3c2385a3bd0ce03ca67466cdebedeabfc553588cc31a09bcd77efd4360").unwrap(),
            "3eda780a103cb7038cfad4de468bdc9532de1c223a6e8fb1105adef362c306f6"
        );
    }

    #[test]
    fn generated_pair_is_consistent() {
        let (private, public) = generate_key_pair();
        assert_eq!(private.len(), 64);
        assert_eq!(public.len(), 64);
        assert_eq!(get_public_key(&private).unwrap(), public);
        let sig = sign(&private, &public).unwrap();
        assert_eq!(sig.len(), 128);
        verify(&public, &sig).unwrap();
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(
            get_public_key("abc"),
            Err(Error::Crypto(CryptoError::InvalidKeyFormat(_)))
        ));
        assert!(matches!(
            sign(PRIVATE, "not-a-key"),
            Err(Error::Crypto(CryptoError::InvalidKeyFormat(_)))
        ));
    }

    #[test]
    fn tampered_signature_fails() {
        let mut bad = SIGNATURE.to_string();
        bad.replace_range(0..2, "53");
        assert!(matches!(verify(PUBLIC, &bad), Err(Error::Crypto(CryptoError::InvalidSignature))));
        assert!(verify(PUBLIC, "00").is_err());
    }
}
