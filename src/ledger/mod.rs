//! Ledger adapter (C2): two operations against the credit store, with a
//! direct (Supabase) implementation and an HTTP fallback.
//!
//! One async trait with swappable concrete implementations, never a
//! singleton client baked into call sites, so production and test doubles
//! share the same call path.

mod direct;
mod http;

pub use direct::DirectLedger;
pub use http::HttpLedger;

use crate::error::GatewayError;
use crate::types::CreditBalance;
use async_trait::async_trait;

/// Outcome of an atomic debit attempt.
#[derive(Debug, Clone)]
pub enum DebitOutcome {
    Success {
        amount_deducted: f64,
        new_balance: f64,
        transaction_id: String,
    },
    Insufficient,
    NotFound,
    Error(String),
}

/// The two-operation ledger contract. Implementations must
/// serialize concurrent debits for the same account so balance never goes
/// negative and every successful debit yields a unique transaction id; that
/// invariant is the store's responsibility, not this trait's.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    async fn get_balance(&self, account: &str) -> Result<Option<CreditBalance>, GatewayError>;

    async fn atomic_debit(
        &self,
        account: &str,
        amount: f64,
        description: &str,
        session_id: Option<&str>,
    ) -> Result<DebitOutcome, GatewayError>;
}
