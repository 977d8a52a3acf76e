//! HMAC-SHA256 secret hashing and constant-time verification (C1).
//!
//! Credentials are keyed by a process-wide HMAC secret rather than compared
//! against a single unkeyed digest, since the gateway looks credentials up
//! by hash across many stored keys rather than checking one fixed value.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hashes and compares credential secrets under a process-wide HMAC key.
///
/// Cloning is cheap (the key is an `Arc`-free owned `Vec<u8>` copied once at
/// startup); instances are handed out freely to whichever component needs to
/// hash or verify a secret.
#[derive(Clone)]
pub struct Crypto {
    key: Vec<u8>,
}

impl Crypto {
    /// Builds a `Crypto` from the raw `API_KEY_SECRET` bytes.
    ///
    /// Fatal by contract: callers that need hashing must hold a non-empty
    /// key. An empty key is accepted here (HMAC tolerates zero-length keys)
    /// but `Config::from_env` refuses to start the credential path without
    /// one configured.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { key: secret.into() }
    }

    /// `Hash(secret) -> hex`.
    pub fn hash(&self, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(secret.as_bytes());
        hex_encode(&mac.finalize().into_bytes())
    }

    /// `Verify(secret, storedHash) -> bool`, constant-time, false on any
    /// decode or length mismatch.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let Ok(stored) = hex_decode(stored_hash) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(secret.as_bytes());
        let computed = mac.finalize().into_bytes();

        if computed.len() != stored.len() {
            return false;
        }
        computed.as_slice().ct_eq(&stored).into()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{:02x}", b).expect("writing to a String never fails");
    }
    out
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = hex_digit(chunk[0]).ok_or(())?;
        let lo = hex_digit(chunk[1]).ok_or(())?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let c = Crypto::new("process-secret");
        assert_eq!(c.hash("sk-live-abc"), c.hash("sk-live-abc"));
    }

    #[test]
    fn different_secrets_hash_differently() {
        let c = Crypto::new("process-secret");
        assert_ne!(c.hash("sk-live-abc"), c.hash("sk-live-xyz"));
    }

    #[test]
    fn verify_accepts_matching_secret() {
        let c = Crypto::new("process-secret");
        let hash = c.hash("sk-live-abc");
        assert!(c.verify("sk-live-abc", &hash));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let c = Crypto::new("process-secret");
        let hash = c.hash("sk-live-abc");
        assert!(!c.verify("sk-live-wrong", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let c = Crypto::new("process-secret");
        assert!(!c.verify("sk-live-abc", "not-hex-zz"));
        assert!(!c.verify("sk-live-abc", "abc"));
    }

    #[test]
    fn verify_rejects_different_key() {
        let a = Crypto::new("secret-a");
        let b = Crypto::new("secret-b");
        let hash = a.hash("sk-live-abc");
        assert!(!b.verify("sk-live-abc", &hash));
    }
}
