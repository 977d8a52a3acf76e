//! Tool pricing table and the LLM cost formula.

use crate::types::ToolPricing;
use std::collections::HashMap;

/// Markup applied to every provider's raw cost unless overridden per
/// provider.
pub const DEFAULT_MARKUP: f64 = 1.20;

pub const TOOL_WEB_SEARCH_BASIC: &str = "web_search_basic";
pub const TOOL_WEB_SEARCH_ADVANCED: &str = "web_search_advanced";
pub const TOOL_IMAGE_SEARCH: &str = "image_search";

/// Process-wide constant pricing table; part of the public contract with
/// the ledger.
pub fn tool_pricing_table() -> HashMap<&'static str, ToolPricing> {
    let mut m = HashMap::new();
    m.insert(
        TOOL_WEB_SEARCH_BASIC,
        ToolPricing { base_cost: 0.001, per_result_cost: 0.0005, markup_multiplier: DEFAULT_MARKUP },
    );
    m.insert(
        TOOL_WEB_SEARCH_ADVANCED,
        ToolPricing { base_cost: 0.003, per_result_cost: 0.001, markup_multiplier: DEFAULT_MARKUP },
    );
    m.insert(
        TOOL_IMAGE_SEARCH,
        ToolPricing { base_cost: 0.002, per_result_cost: 0.0005, markup_multiplier: DEFAULT_MARKUP },
    );
    m
}

/// Humanized description fallback for a tool debit when the caller doesn't
/// supply one.
pub fn humanize_tool_name(tool: &str) -> String {
    tool.replace('_', " ")
}

/// Computes the billable cost of an LLM call. `is_aggregator` gates the
/// reported-cost branch; `provider_reported_cost` is the provider's own
/// `total_cost` field when present.
pub fn calculate_llm_cost(
    is_aggregator: bool,
    input_tokens: u64,
    output_tokens: u64,
    provider_reported_cost: Option<f64>,
    input_per_1m: f64,
    output_per_1m: f64,
    markup: f64,
) -> f64 {
    if is_aggregator {
        if let Some(reported) = provider_reported_cost {
            return reported * markup;
        }
    }
    (input_tokens as f64 / 1_000_000.0 * input_per_1m + output_tokens as f64 / 1_000_000.0 * output_per_1m) * markup
}
