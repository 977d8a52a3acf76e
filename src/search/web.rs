use super::{upstream_error, BRAVE_WEB_SEARCH_URL};
use crate::error::GatewayError;
use crate::http_client::shared_http_client;
use crate::types::SearchResult;
use serde_json::Value;

const MAX_RESULTS: u32 = 10;

pub struct WebSearchAdapter {
    api_key: String,
}

impl WebSearchAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    /// `Execute(query, maxResults, options) -> []SearchResult` (spec §4.6,
    /// wire shape in §6.2). `search_depth` widens the query in the
    /// "advanced" case; the Brave endpoint itself takes no such parameter,
    /// so it only affects the billed tool name upstream of this call.
    pub async fn execute(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, GatewayError> {
        let count = max_results.clamp(1, MAX_RESULTS);

        let resp = shared_http_client()
            .get(BRAVE_WEB_SEARCH_URL)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(upstream_error(status, &body));
        }

        let data: Value = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(parse_results(&data))
    }
}

fn parse_results(data: &Value) -> Vec<SearchResult> {
    data["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| SearchResult {
                    title: r["title"].as_str().unwrap_or("").to_string(),
                    url: r["url"].as_str().unwrap_or("").to_string(),
                    snippet: r["description"].as_str().unwrap_or("").to_string(),
                    published_date: r["age"].as_str().map(|s| s.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_results_and_maps_missing_fields_to_none() {
        let data = json!({
            "web": {
                "results": [
                    { "title": "Cats", "url": "https://example.com/cats", "description": "all about cats" }
                ]
            }
        });
        let results = parse_results(&data);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Cats");
        assert_eq!(results[0].published_date, None);
    }

    #[test]
    fn missing_web_key_yields_empty_results() {
        let data = json!({});
        assert!(parse_results(&data).is_empty());
    }
}
