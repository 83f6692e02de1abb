//! Deterministic nicknames for public keys.
//!
//! A key is mapped onto a fixed pool of `adjective × noun × [0, 999)`
//! combinations:
//!
//! ```text
//! digest  = key                      if key is 64 hex chars
//!         = sha256_hex(key)          otherwise
//! ratio   = digest / 2^256           (20 decimal places, round half up)
//! nick_id = floor(ratio * pool_size) where pool_size = 999 * |adj| * |nouns|
//! ```
//!
//! `nick_id` is then split into `(adjective, noun, number)` and rendered as
//! `"{Adjective}{Noun}{number}"`, e.g. `WaryBaron635`.
//!
//! The ratio is computed on big integers. Floating point would collapse the
//! low end of the key space onto index 0.
//!
//! Names only match the browser client when `adjectives.txt` and `nouns.txt`
//! hold its RoboSats English lists, one word per line in their original
//! order. The files shipped here are a stand-in of the same shape.

use crate::error::{Error, Result};
use crate::utils::{bytes::is_hex_key, hash::sha256_hex};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Upper bound (exclusive) of the numeric suffix.
pub const MAX_NUMBER: u64 = 999;

/// Decimal places kept when dividing the key by `2^256`.
const RATIO_DECIMALS: u32 = 20;

static DEFAULT_POOL: Lazy<NicknamePool> = Lazy::new(|| NicknamePool {
    adjectives: parse_words(include_str!("adjectives.txt")),
    nouns: parse_words(include_str!("nouns.txt")),
});

fn parse_words(list: &str) -> Vec<String> {
    list.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Word lists a nickname is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicknamePool {
    adjectives: Vec<String>,
    nouns: Vec<String>,
}

impl NicknamePool {
    /// Build a pool from caller-supplied word lists. Both must be non-empty.
    pub fn new(adjectives: Vec<String>, nouns: Vec<String>) -> Result<Self> {
        if adjectives.is_empty() || nouns.is_empty() {
            return Err(Error::Config("nickname word lists must not be empty".into()));
        }
        Ok(Self { adjectives, nouns })
    }

    /// The pool bundled with the crate.
    pub fn bundled() -> &'static NicknamePool {
        &DEFAULT_POOL
    }

    pub fn adjectives(&self) -> &[String] {
        &self.adjectives
    }

    pub fn nouns(&self) -> &[String] {
        &self.nouns
    }

    /// Number of distinct nicknames.
    pub fn size(&self) -> u64 {
        MAX_NUMBER * self.adjectives.len() as u64 * self.nouns.len() as u64
    }

    /// Position of `key` in the pool, in `[0, size)`.
    pub fn index_of(&self, key: &str) -> u64 {
        let digest = if is_hex_key(key) { key.to_owned() } else { sha256_hex(key) };
        let key_num = BigUint::parse_bytes(digest.as_bytes(), 16).unwrap_or_default();

        let scale = BigUint::from(10u32).pow(RATIO_DECIMALS);
        let denom = BigUint::from(1u32) << 256usize;
        // ratio scaled by 10^20, rounded half up
        let ratio = (key_num * &scale * 2u32 + &denom) / (denom * 2u32);
        let id = ratio * self.size() / scale;

        // A ratio that rounds up to exactly 1 would land one past the end.
        u64::try_from(&id).unwrap_or(u64::MAX).min(self.size() - 1)
    }

    /// Nickname for `key`. Pure: the same key always yields the same name.
    pub fn nickname(&self, key: &str) -> String {
        let id = self.index_of(key);
        let per_adjective = MAX_NUMBER * self.nouns.len() as u64;

        let adjective = id / per_adjective;
        let remainder = id - adjective * per_adjective;
        let noun = remainder / MAX_NUMBER;
        let number = remainder - noun * MAX_NUMBER;

        format!(
            "{}{}{}",
            self.adjectives[adjective as usize], self.nouns[noun as usize], number
        )
    }
}

/// Nickname for a public key (or any string) from the bundled pool.
pub fn nickname_from_key(key: &str) -> String {
    DEFAULT_POOL.nickname(key)
}
