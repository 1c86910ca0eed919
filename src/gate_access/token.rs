//! Download token value object
//!
//! A download token is 32 cryptographically random bytes rendered as 64 hex
//! characters. The issuer generates them; the redeemer re-validates the
//! format before touching the database.

use rand::RngCore;
use std::fmt;

/// Single-use, time-boxed download credential value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadToken(String);

impl DownloadToken {
    /// Hex-encoded length: 32 bytes as 64 characters.
    pub const ENCODED_LEN: usize = 64;

    /// Generate a fresh random token (lowercase hex).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a candidate credential, accepting exactly 64 hex characters in
    /// either case. Returns `None` for anything else.
    pub fn parse(candidate: &str) -> Option<Self> {
        if candidate.len() == Self::ENCODED_LEN
            && candidate.chars().all(|c| c.is_ascii_hexdigit())
        {
            Some(Self(candidate.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
