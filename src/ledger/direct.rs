use super::{DebitOutcome, LedgerAdapter};
use crate::error::GatewayError;
use crate::http_client::shared_http_client;
use crate::types::CreditBalance;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Talks to a Supabase-fronted relational store: `credit_balances` for reads,
/// the `atomic_use_credits` stored procedure for debits.
pub struct DirectLedger {
    base_url: String,
    service_role_key: String,
}

impl DirectLedger {
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
        }
    }

    fn auth_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }
}

#[derive(Deserialize)]
struct BalanceRow {
    balance: f64,
    #[serde(default)]
    expiring_credits: f64,
    #[serde(default)]
    non_expiring_credits: f64,
    #[serde(default)]
    daily_balance: f64,
}

#[derive(Deserialize)]
struct AtomicUseCreditsResult {
    success: bool,
    #[serde(default)]
    amount_deducted: f64,
    #[serde(default)]
    new_total: f64,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl LedgerAdapter for DirectLedger {
    async fn get_balance(&self, account: &str) -> Result<Option<CreditBalance>, GatewayError> {
        let url = format!(
            "{}/rest/v1/credit_balances?account_id=eq.{}&select=*",
            self.base_url,
            urlencoding::encode(account)
        );
        let req = self.auth_headers(shared_http_client().get(&url));
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let snippet = truncate(&resp.text().await.unwrap_or_default(), 500);
            return Err(GatewayError::Upstream { status, snippet });
        }

        let rows: Vec<BalanceRow> = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(rows.into_iter().next().map(|r| CreditBalance {
            balance: r.balance,
            expiring_credits: r.expiring_credits,
            non_expiring_credits: r.non_expiring_credits,
            daily_balance: r.daily_balance,
            is_unknown: false,
        }))
    }

    async fn atomic_debit(
        &self,
        account: &str,
        amount: f64,
        description: &str,
        session_id: Option<&str>,
    ) -> Result<DebitOutcome, GatewayError> {
        let url = format!("{}/rest/v1/rpc/atomic_use_credits", self.base_url);
        let body = json!({
            "account": account,
            "amount": amount,
            "description": description,
            "thread": session_id,
        });
        let req = self.auth_headers(shared_http_client().post(&url)).json(&body);
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let snippet = truncate(&resp.text().await.unwrap_or_default(), 500);
            return Ok(DebitOutcome::Error(format!("{status}: {snippet}")));
        }

        let result: AtomicUseCreditsResult = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        if !result.success {
            return match result.error.as_deref() {
                Some("insufficient_credits") | Some("insufficient") => Ok(DebitOutcome::Insufficient),
                Some("not_found") => Ok(DebitOutcome::NotFound),
                other => Ok(DebitOutcome::Error(other.unwrap_or("unknown ledger error").to_string())),
            };
        }

        Ok(DebitOutcome::Success {
            amount_deducted: result.amount_deducted,
            new_balance: result.new_total,
            transaction_id: result.transaction_id.unwrap_or_default(),
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
