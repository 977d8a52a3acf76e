//! Auth middleware (C8): per-request extraction and validation of the
//! bearer credential.
//!
//! Implemented as a custom `FromRequestParts` extractor so every protected
//! handler simply takes an `Identity` parameter instead of re-parsing the
//! header itself.

use crate::app::AppState;
use crate::billing::TEST_SENTINEL;
use crate::credentials::{InvalidReason, CREDENTIAL_PUBLIC_PREFIX};
use crate::error::GatewayError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Identity {
    pub account_id: String,
    pub key_id: Option<String>,
    pub is_test: bool,
}

fn bearer_token(parts: &Parts) -> Result<&str, GatewayError> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::AuthMissing)?;
    header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()).ok_or(GatewayError::AuthMissing)
}

impl<S> FromRequestParts<S> for Identity
where
    Arc<AppState>: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: Arc<AppState> = axum::extract::FromRef::from_ref(state);
        let token = bearer_token(parts)?;

        // Step 2: test sentinel fast path.
        if token == TEST_SENTINEL {
            return Ok(Identity {
                account_id: TEST_SENTINEL.to_string(),
                key_id: None,
                is_test: true,
            });
        }

        // Step 3: real credential, iff a credential store is configured.
        if token.starts_with(CREDENTIAL_PUBLIC_PREFIX) {
            if let Some(registry) = &app_state.credentials {
                return match registry.validate(token).await {
                    Ok(validated) => Ok(Identity {
                        account_id: validated.account_id,
                        key_id: Some(validated.key_id),
                        is_test: false,
                    }),
                    Err(InvalidReason::Expired) => Err(GatewayError::AuthExpired),
                    Err(reason) => Err(GatewayError::AuthInvalid(reason.message())),
                };
            }
        }

        // Step 4: legacy bootstrap fallback, production-gated.
        if app_state.allow_legacy_account_fallback {
            Ok(Identity {
                account_id: token.to_string(),
                key_id: None,
                is_test: false,
            })
        } else {
            Err(GatewayError::AuthInvalid("legacy bearer-as-account-id auth is disabled in this environment"))
        }
    }
}
