//! Shared test doubles and `AppState` wiring for the gateway's integration
//! tests. Not a test file itself (no `#[test]` here) — included via `mod
//! common;` from each scenario file.

use async_trait::async_trait;
use kortix_gateway::app::AppState;
use kortix_gateway::billing::BillingService;
use kortix_gateway::config::EnvMode;
use kortix_gateway::error::GatewayError;
use kortix_gateway::ledger::{DebitOutcome, LedgerAdapter};
use kortix_gateway::llm::LlmProxy;
use kortix_gateway::providers::ProviderRegistry;
use kortix_gateway::types::CreditBalance;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Records every debit attempt so tests can assert on call count and amount
/// without reaching into the ledger's real network path.
#[derive(Clone)]
pub struct FakeLedger {
    pub balance: Arc<Mutex<Option<f64>>>,
    /// Simulates the HTTP ledger's fail-open path (network error or non-2xx
    /// status): `get_balance` returns `CreditBalance::unknown()` regardless
    /// of `balance`.
    pub fail_open: Arc<Mutex<bool>>,
    pub debit_outcome: Arc<Mutex<DebitOutcome>>,
    pub debits: Arc<Mutex<Vec<(String, f64, String)>>>,
}

impl FakeLedger {
    pub fn with_balance(balance: f64) -> Self {
        Self {
            balance: Arc::new(Mutex::new(Some(balance))),
            fail_open: Arc::new(Mutex::new(false)),
            debit_outcome: Arc::new(Mutex::new(DebitOutcome::Success {
                amount_deducted: 0.0,
                new_balance: balance,
                transaction_id: "txn_1".to_string(),
            })),
            debits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Simulates an unreachable ledger: balance reads fail open (spec
    /// §4.2/§7), as if the HTTP ledger hit a network error or non-2xx.
    pub fn unreachable() -> Self {
        let ledger = Self::with_balance(0.0);
        *ledger.fail_open.lock().unwrap() = true;
        ledger
    }

    pub fn debit_calls(&self) -> Vec<(String, f64, String)> {
        self.debits.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerAdapter for FakeLedger {
    async fn get_balance(&self, _account: &str) -> Result<Option<CreditBalance>, GatewayError> {
        if *self.fail_open.lock().unwrap() {
            return Ok(Some(CreditBalance::unknown()));
        }
        Ok(self.balance.lock().unwrap().map(|balance| CreditBalance {
            balance,
            expiring_credits: 0.0,
            non_expiring_credits: 0.0,
            daily_balance: 0.0,
            is_unknown: false,
        }))
    }

    async fn atomic_debit(
        &self,
        account: &str,
        amount: f64,
        description: &str,
        _session_id: Option<&str>,
    ) -> Result<DebitOutcome, GatewayError> {
        self.debits.lock().unwrap().push((account.to_string(), amount, description.to_string()));
        Ok(self.debit_outcome.lock().unwrap().clone())
    }
}

/// Builds a minimal `AppState` directly (bypassing `build_state`'s
/// environment loading) so each test controls exactly which providers,
/// ledger behavior, and auth mode are in play.
pub fn test_state(
    ledger: FakeLedger,
    env_mode: EnvMode,
    allow_legacy_account_fallback: bool,
    bindings: HashMap<String, kortix_gateway::providers::ProviderBinding>,
) -> Arc<AppState> {
    let providers = Arc::new(ProviderRegistry::with_bindings(bindings));
    let billing = Arc::new(BillingService::new(Arc::new(ledger), env_mode));
    let llm = Arc::new(LlmProxy::new(providers.clone(), billing.clone()));

    Arc::new(AppState {
        env_mode,
        providers,
        billing,
        llm,
        credentials: None,
        web_search: None,
        image_search: None,
        allow_legacy_account_fallback,
    })
}
