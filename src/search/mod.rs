//! Search adapters (C6): web and image search, each a single `execute`
//! contract over a fixed upstream endpoint.
//!
//! Both adapters talk to Brave Search: an `X-Subscription-Token` header, a
//! `count`/`q` query, and manual JSON field extraction into a normalized
//! shape with missing optionals mapped to `None` rather than empty strings.

pub mod images;
pub mod web;

pub use images::ImageSearchAdapter;
pub use web::WebSearchAdapter;

use crate::error::GatewayError;

pub const BRAVE_WEB_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
pub const BRAVE_IMAGE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/images/search";

/// Builds a `GatewayError::Upstream` from a non-2xx response, truncating
/// the body to a short snippet rather than forwarding it verbatim.
pub(crate) fn upstream_error(status: u16, body: &str) -> GatewayError {
    let snippet: String = body.chars().take(500).collect();
    GatewayError::Upstream { status, snippet }
}
