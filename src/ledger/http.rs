use super::{DebitOutcome, LedgerAdapter};
use crate::error::GatewayError;
use crate::http_client::shared_http_client;
use crate::types::CreditBalance;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Fallback ledger reached over plain HTTP, used only when the direct
/// (Supabase) adapter isn't configured.
pub struct HttpLedger {
    base_url: String,
    api_key: Option<String>,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: f64,
}

#[derive(Deserialize)]
struct DebitResponse {
    success: bool,
    #[serde(default)]
    cost: f64,
    #[serde(default)]
    new_balance: f64,
    #[serde(default)]
    transaction_id: Option<String>,
}

#[async_trait]
impl LedgerAdapter for HttpLedger {
    async fn get_balance(&self, account: &str) -> Result<Option<CreditBalance>, GatewayError> {
        let url = format!("{}/balance?account={}", self.base_url, urlencoding::encode(account));
        let req = self.authed(shared_http_client().get(&url));

        let resp = match req.send().await {
            Ok(r) => r,
            // Network error: fail open rather than gate on a ledger outage.
            Err(e) => {
                log::warn!("http ledger balance check failed open: {e}");
                return Ok(Some(CreditBalance::unknown()));
            }
        };

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            log::warn!("http ledger balance check failed open: status {}", resp.status());
            return Ok(Some(CreditBalance::unknown()));
        }

        let body: BalanceResponse = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(Some(CreditBalance {
            balance: body.balance,
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
        session_id: Option<&str>,
    ) -> Result<DebitOutcome, GatewayError> {
        let url = format!("{}/debit", self.base_url);
        let body = json!({
            "account": account,
            "amount": amount,
            "description": description,
            "session": session_id,
        });
        let req = self.authed(shared_http_client().post(&url)).json(&body);

        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        let status = resp.status();

        if status.as_u16() == 402 {
            return Ok(DebitOutcome::Insufficient);
        }
        if status.as_u16() == 404 {
            return Ok(DebitOutcome::NotFound);
        }
        if !status.is_success() {
            let snippet = resp.text().await.unwrap_or_default();
            return Ok(DebitOutcome::Error(format!("{}: {}", status.as_u16(), snippet)));
        }

        let body: DebitResponse = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        if !body.success {
            return Ok(DebitOutcome::Error("ledger reported failure".to_string()));
        }

        Ok(DebitOutcome::Success {
            amount_deducted: body.cost,
            new_balance: body.new_balance,
            transaction_id: body.transaction_id.unwrap_or_default(),
        })
    }
}
