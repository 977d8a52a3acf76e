use super::{upstream_error, BRAVE_IMAGE_SEARCH_URL};
use crate::error::GatewayError;
use crate::http_client::shared_http_client;
use crate::types::ImageResult;
use serde_json::Value;

const MAX_RESULTS: u32 = 20;

pub struct ImageSearchAdapter {
    api_key: String,
}

impl ImageSearchAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    /// `Execute(query, maxResults, options) -> []ImageResult` (spec §4.6,
    /// wire shape in §6.3).
    pub async fn execute(&self, query: &str, max_results: u32, safe_search: bool) -> Result<Vec<ImageResult>, GatewayError> {
        let count = max_results.clamp(1, MAX_RESULTS);
        let safesearch = if safe_search { "strict" } else { "off" };

        let resp = shared_http_client()
            .get(BRAVE_IMAGE_SEARCH_URL)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", &count.to_string()), ("safesearch", safesearch)])
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

fn parse_results(data: &Value) -> Vec<ImageResult> {
    data["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| ImageResult {
                    title: r["title"].as_str().unwrap_or("").to_string(),
                    url: r["properties"]["url"].as_str().unwrap_or("").to_string(),
                    thumbnail_url: r["thumbnail"]["src"].as_str().unwrap_or("").to_string(),
                    source_url: r["url"].as_str().unwrap_or("").to_string(),
                    width: r["properties"]["width"].as_u64().map(|w| w as u32),
                    height: r["properties"]["height"].as_u64().map(|h| h as u32),
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
    fn parses_results_and_maps_missing_dimensions_to_none() {
        let data = json!({
            "results": [
                {
                    "title": "Cat photo",
                    "url": "https://example.com/page",
                    "thumbnail": { "src": "https://example.com/thumb.jpg" },
                    "properties": { "url": "https://example.com/full.jpg" }
                }
            ]
        });
        let results = parse_results(&data);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].width, None);
        assert_eq!(results[0].source_url, "https://example.com/page");
    }
}
