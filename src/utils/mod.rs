//! Encoding, hashing and formatting primitives used by the other modules.

pub mod bech32;
pub mod bytes;
pub mod format;
pub mod hash;

pub use self::bytes::{hex_encode_text, is_hex};
pub use self::format::{beautify_number, format_time};
pub use self::hash::sha256_hex;
