//! Multi-tenant metered API gateway: authentication, credit accounting, and
//! request/response translation in front of LLM, web-search, and
//! image-search upstreams.
//!
//! [`crypto`] hashes and verifies credential secrets, [`ledger`] talks to the
//! credit-balance backend, [`credentials`] resolves bearer tokens to
//! accounts, [`billing`] gates and debits requests, [`providers`] resolves
//! model ids to upstream bindings, [`search`] wraps the web/image search
//! upstream, [`llm`] proxies and translates chat completions, [`auth`]
//! extracts the authenticated identity from each request, and [`app`] +
//! [`routes`] wire all of the above into the HTTP surface.

pub mod app;
pub mod auth;
pub mod billing;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod http_client;
pub mod ledger;
pub mod llm;
pub mod providers;
pub mod routes;
pub mod search;
pub mod types;

pub use app::{build_router, build_state, AppState};
pub use config::Config;
pub use error::{GatewayError, GatewayResult};
