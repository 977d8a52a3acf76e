//! Billing service (C4): composes the crypto/ledger/credential layers into
//! two high-level operations, with test-account and dev-mode bypasses
//! evaluated ahead of the real ledger path.

use crate::config::EnvMode;
use crate::ledger::{DebitOutcome, LedgerAdapter};
use std::sync::Arc;

/// Fixed bearer sentinel that skips billing entirely — used by integration
/// smoke tests against real provider credentials without touching the
/// ledger.
pub const TEST_SENTINEL: &str = "00000";

pub struct CreditCheck {
    pub has_credits: bool,
    pub balance: Option<f64>,
    pub message: String,
}

pub struct DeductResult {
    pub success: bool,
    pub amount: f64,
    pub new_balance: Option<f64>,
    pub transaction_id: Option<String>,
    pub reason: Option<&'static str>,
}

impl DeductResult {
    fn bypass(reason: &'static str, amount: f64) -> Self {
        Self {
            success: true,
            amount,
            new_balance: None,
            transaction_id: None,
            reason: Some(reason),
        }
    }
}

pub struct BillingService {
    ledger: Arc<dyn LedgerAdapter>,
    env_mode: EnvMode,
}

impl BillingService {
    pub fn new(ledger: Arc<dyn LedgerAdapter>, env_mode: EnvMode) -> Self {
        Self { ledger, env_mode }
    }

    fn is_test_account(account: &str) -> bool {
        account == TEST_SENTINEL
    }

    /// Checks whether `account` has at least `min` credits available.
    pub async fn check_credits(&self, account: &str, min: f64) -> CreditCheck {
        if Self::is_test_account(account) {
            return CreditCheck {
                has_credits: true,
                balance: None,
                message: "test account: credits always sufficient".to_string(),
            };
        }
        if self.env_mode.is_dev_mode() {
            return CreditCheck {
                has_credits: true,
                balance: None,
                message: "dev mode: credit checks bypassed".to_string(),
            };
        }

        match self.ledger.get_balance(account).await {
            // The HTTP ledger's fail-open placeholder: a ledger outage must
            // not gate the request on a real balance it couldn't read.
            Ok(Some(balance)) if balance.is_unknown => CreditCheck {
                has_credits: true,
                balance: None,
                message: "ledger unreachable: credit check failed open".to_string(),
            },
            Ok(Some(balance)) => {
                let has_credits = balance.balance >= min;
                CreditCheck {
                    has_credits,
                    balance: Some(balance.balance),
                    message: if has_credits {
                        "sufficient credits".to_string()
                    } else {
                        format!("Insufficient credits: balance {:.6} below required {:.6}", balance.balance, min)
                    },
                }
            }
            Ok(None) => CreditCheck {
                has_credits: false,
                balance: None,
                message: "Insufficient credits: no balance on file".to_string(),
            },
            Err(e) => {
                log::error!("credit check failed for {account}: {e}");
                CreditCheck {
                    has_credits: false,
                    balance: None,
                    message: "Insufficient credits: unable to verify balance".to_string(),
                }
            }
        }
    }

    /// Shared debit path underlying both the tool-debit and LLM-debit
    /// flavors. A non-positive `amount` is a no-op success; a failing debit
    /// never fails the caller's already-completed request — it is logged
    /// and returned as `{success: false}`.
    pub async fn deduct_credits(
        &self,
        account: &str,
        amount: f64,
        description: &str,
        session_id: Option<&str>,
    ) -> DeductResult {
        if amount <= 0.0 {
            return DeductResult::bypass("zero_amount", amount);
        }
        if Self::is_test_account(account) {
            return DeductResult::bypass("test_token", amount);
        }
        if self.env_mode.is_dev_mode() {
            return DeductResult::bypass("development_mode", amount);
        }

        match self.ledger.atomic_debit(account, amount, description, session_id).await {
            Ok(DebitOutcome::Success {
                amount_deducted,
                new_balance,
                transaction_id,
            }) => DeductResult {
                success: true,
                amount: amount_deducted,
                new_balance: Some(new_balance),
                transaction_id: Some(transaction_id),
                reason: None,
            },
            Ok(DebitOutcome::Insufficient) => {
                log::warn!("debit rejected for {account}: insufficient credits");
                DeductResult {
                    success: false,
                    amount,
                    new_balance: None,
                    transaction_id: None,
                    reason: Some("insufficient_credits"),
                }
            }
            Ok(DebitOutcome::NotFound) => {
                log::warn!("debit rejected for {account}: account not found");
                DeductResult {
                    success: false,
                    amount,
                    new_balance: None,
                    transaction_id: None,
                    reason: Some("not_found"),
                }
            }
            Ok(DebitOutcome::Error(msg)) => {
                log::error!("debit failed for {account}: {msg}");
                DeductResult {
                    success: false,
                    amount,
                    new_balance: None,
                    transaction_id: None,
                    reason: Some("ledger_error"),
                }
            }
            Err(e) => {
                log::error!("debit errored for {account}: {e}");
                DeductResult {
                    success: false,
                    amount,
                    new_balance: None,
                    transaction_id: None,
                    reason: Some("ledger_error"),
                }
            }
        }
    }

    /// LLM-debit description: `"LLM: <model> (<in>/<out> tokens)"`.
    pub fn llm_description(model: &str, input_tokens: u64, output_tokens: u64) -> String {
        format!("LLM: {model} ({input_tokens}/{output_tokens} tokens)")
    }
}
