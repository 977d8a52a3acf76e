//! Credential registry (C3): validates presented secrets, resolves them to
//! an account, and throttles `last_used_at` updates.
//!
//! The throttle map is the only mutable process-wide state in the core; it
//! is kept behind the narrow `try_record_use` interface so the storage
//! strategy can change without touching callers.

use crate::crypto::Crypto;
use crate::error::GatewayError;
use crate::types::{AccountId, Credential, CredentialStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Public prefix every real (non-test, non-legacy) credential must start
/// with. Anything not matching this shape falls through to the legacy
/// "token is the account id" path.
pub const CREDENTIAL_PUBLIC_PREFIX: &str = "sk_live_";
/// Fixed length of the random suffix following the public prefix.
pub const CREDENTIAL_SUFFIX_LEN: usize = 32;

const THROTTLE_WINDOW: Duration = Duration::from_secs(15 * 60);
const THROTTLE_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Format,
    NotFound,
    Revoked,
    Expired,
}

impl InvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            InvalidReason::Format => "malformed credential",
            InvalidReason::NotFound => "unknown credential",
            InvalidReason::Revoked => "credential revoked",
            InvalidReason::Expired => "credential expired",
        }
    }
}

pub struct ValidatedCredential {
    pub account_id: AccountId,
    pub key_id: String,
}

/// Backing store for credential lookups. Implementations resolve a
/// `secretHash` to a `Credential` row and persist throttled `last_used_at`
/// updates; kept as a trait rather than a singleton client so tests can
/// swap in an in-memory double.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_hash(&self, secret_hash: &str) -> Result<Option<Credential>, GatewayError>;
    async fn touch_last_used(&self, key_id: &str) -> Result<(), GatewayError>;
}

/// Checks the structural shape of a presented secret before ever hashing it.
fn has_valid_format(secret: &str) -> bool {
    secret
        .strip_prefix(CREDENTIAL_PUBLIC_PREFIX)
        .map(|suffix| suffix.len() == CREDENTIAL_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(false)
}

/// Process-local, best-effort throttle on `last_used_at` writes. Losing its
/// contents on restart has no correctness impact.
pub struct ThrottleMap {
    entries: Mutex<HashMap<String, Instant>>,
}

impl ThrottleMap {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether the caller should persist a `last_used_at` update for
    /// `key_id` right now (true at most once per `THROTTLE_WINDOW`).
    pub async fn try_record_use(&self, key_id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let should_persist = match entries.get(key_id) {
            Some(last) if now.duration_since(*last) < THROTTLE_WINDOW => false,
            _ => true,
        };

        if should_persist {
            entries.insert(key_id.to_string(), now);
        }

        if entries.len() > THROTTLE_MAX_ENTRIES {
            let cutoff = THROTTLE_WINDOW * 2;
            entries.retain(|_, at| now.duration_since(*at) < cutoff);
        }

        should_persist
    }
}

impl Default for ThrottleMap {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CredentialRegistry {
    store: Box<dyn CredentialStore>,
    crypto: Crypto,
    throttle: ThrottleMap,
}

impl CredentialRegistry {
    pub fn new(store: Box<dyn CredentialStore>, crypto: Crypto) -> Self {
        Self {
            store,
            crypto,
            throttle: ThrottleMap::new(),
        }
    }

    /// Validates a presented secret, returning the resolved account/key on
    /// success or the reason it was rejected.
    pub async fn validate(&self, presented_secret: &str) -> Result<ValidatedCredential, InvalidReason> {
        if !has_valid_format(presented_secret) {
            return Err(InvalidReason::Format);
        }

        let hash = self.crypto.hash(presented_secret);
        let credential = self
            .store
            .find_by_hash(&hash)
            .await
            .map_err(|_| InvalidReason::NotFound)?
            .ok_or(InvalidReason::NotFound)?;

        match credential.status {
            CredentialStatus::Active => {}
            CredentialStatus::Revoked => return Err(InvalidReason::Revoked),
            CredentialStatus::Expired => return Err(InvalidReason::Expired),
        }

        if let Some(expires_at) = credential.expires_at {
            if expires_at < Utc::now() {
                return Err(InvalidReason::Expired);
            }
        }

        if self.throttle.try_record_use(&credential.key_id).await {
            let store_key_id = credential.key_id.clone();
            // Fire-and-forget: a failed write here must not fail the
            // request that is already authenticated.
            if let Err(e) = self.store.touch_last_used(&store_key_id).await {
                log::warn!("failed to persist last_used_at for {store_key_id}: {e}");
            }
        }

        Ok(ValidatedCredential {
            account_id: credential.account_id,
            key_id: credential.key_id,
        })
    }
}

/// Production-shape store: PostgREST over Supabase, primary index on
/// `secret_key_hash`.
pub struct SupabaseCredentialStore {
    base_url: String,
    service_role_key: String,
}

impl SupabaseCredentialStore {
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }
}

#[async_trait]
impl CredentialStore for SupabaseCredentialStore {
    async fn find_by_hash(&self, secret_hash: &str) -> Result<Option<Credential>, GatewayError> {
        let url = format!(
            "{}/rest/v1/credentials?secret_hash=eq.{}&select=*",
            self.base_url,
            urlencoding::encode(secret_hash)
        );
        let req = self.authed(crate::http_client::shared_http_client().get(&url));
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let snippet = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status, snippet });
        }

        let rows: Vec<Credential> = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    async fn touch_last_used(&self, key_id: &str) -> Result<(), GatewayError> {
        let url = format!(
            "{}/rest/v1/credentials?key_id=eq.{}",
            self.base_url,
            urlencoding::encode(key_id)
        );
        let body = serde_json::json!({ "last_used_at": Utc::now() });
        let req = self.authed(crate::http_client::shared_http_client().patch(&url)).json(&body);
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let snippet = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status, snippet });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct FakeStore {
        credential: Option<Credential>,
        touched: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl CredentialStore for FakeStore {
        async fn find_by_hash(&self, _secret_hash: &str) -> Result<Option<Credential>, GatewayError> {
            Ok(self.credential.clone())
        }

        async fn touch_last_used(&self, key_id: &str) -> Result<(), GatewayError> {
            self.touched.lock().unwrap().push(key_id.to_string());
            Ok(())
        }
    }

    fn make_credential(status: CredentialStatus, expires_at: Option<chrono::DateTime<Utc>>) -> Credential {
        Credential {
            key_id: "key_1".to_string(),
            public_prefix: "sk_live_".to_string(),
            secret_hash: "irrelevant-in-these-tests".to_string(),
            account_id: "acct_1".to_string(),
            status,
            expires_at,
            last_used_at: None,
        }
    }

    fn valid_secret() -> String {
        format!("{CREDENTIAL_PUBLIC_PREFIX}{}", "a".repeat(CREDENTIAL_SUFFIX_LEN))
    }

    #[tokio::test]
    async fn rejects_malformed_secret_before_lookup() {
        let store = FakeStore {
            credential: None,
            touched: StdMutex::new(vec![]),
        };
        let registry = CredentialRegistry::new(Box::new(store), Crypto::new("secret"));
        let result = registry.validate("not-a-real-key").await;
        assert_eq!(result.err(), Some(InvalidReason::Format));
    }

    #[tokio::test]
    async fn accepts_active_credential_and_records_use() {
        let store = FakeStore {
            credential: Some(make_credential(CredentialStatus::Active, None)),
            touched: StdMutex::new(vec![]),
        };
        let registry = CredentialRegistry::new(Box::new(store), Crypto::new("secret"));
        let result = registry.validate(&valid_secret()).await.unwrap();
        assert_eq!(result.account_id, "acct_1");
        assert_eq!(result.key_id, "key_1");
    }

    #[tokio::test]
    async fn rejects_revoked_credential() {
        let store = FakeStore {
            credential: Some(make_credential(CredentialStatus::Revoked, None)),
            touched: StdMutex::new(vec![]),
        };
        let registry = CredentialRegistry::new(Box::new(store), Crypto::new("secret"));
        let result = registry.validate(&valid_secret()).await;
        assert_eq!(result.err(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn rejects_expired_credential() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let store = FakeStore {
            credential: Some(make_credential(CredentialStatus::Active, Some(past))),
            touched: StdMutex::new(vec![]),
        };
        let registry = CredentialRegistry::new(Box::new(store), Crypto::new("secret"));
        let result = registry.validate(&valid_secret()).await;
        assert_eq!(result.err(), Some(InvalidReason::Expired));
    }

    #[tokio::test]
    async fn rejects_credential_with_expired_status_distinctly_from_revoked() {
        let store = FakeStore {
            credential: Some(make_credential(CredentialStatus::Expired, None)),
            touched: StdMutex::new(vec![]),
        };
        let registry = CredentialRegistry::new(Box::new(store), Crypto::new("secret"));
        let result = registry.validate(&valid_secret()).await;
        assert_eq!(result.err(), Some(InvalidReason::Expired));
    }

    #[tokio::test]
    async fn throttle_map_triggers_at_most_once_per_window() {
        let throttle = ThrottleMap::new();
        assert!(throttle.try_record_use("key_1").await);
        assert!(!throttle.try_record_use("key_1").await);
        assert!(!throttle.try_record_use("key_1").await);
        assert!(throttle.try_record_use("key_2").await);
    }
}
