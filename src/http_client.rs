//! Shared `reqwest::Client` with pooled connections: one client for the
//! whole process, reused by every upstream caller (ledger, provider, search
//! adapters) rather than built per-request.

use lazy_static::lazy_static;
use std::time::Duration;

lazy_static! {
    pub static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("building the shared reqwest client with static config never fails");
}

/// LLM calls may legitimately stream for minutes; this client has no
/// request-level timeout so a long-lived stream isn't cut off by the HTTP
/// client itself — only by client disconnection.
pub fn shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}
