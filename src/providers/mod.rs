//! Provider registry & model resolution (C5).
//!
//! `ProviderBinding` is a tagged sum type over the small set of auth/wire
//! dialects rather than a free-form record, so a new dialect is a new enum
//! variant with its own translate/extract methods instead of a bag of
//! optional fields interpreted by string checks at every call site.

pub mod pricing;

use crate::config::Config;
use crate::types::{ModelConfig, ModelTier};
use std::collections::HashMap;

/// How a provider expects the upstream request to be authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStyle {
    Bearer,
    ApiKeyHeader { header_name: &'static str },
    None,
}

/// The wire dialect a provider speaks. `OpenAiCompatible` passes the
/// normalized request through with only `model`/auth rewritten;
/// `Anthropic` requires the full Messages-API translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenAiCompatible,
    Anthropic,
}

/// Canonical provider name this gateway understands. Distinct from the
/// model-catalog's free-form provider-local model id.
pub const AGGREGATOR: &str = "openrouter";

#[derive(Debug, Clone)]
pub struct ProviderBinding {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub auth_style: AuthStyle,
    pub dialect: Dialect,
    pub extra_headers: Vec<(String, String)>,
}

impl ProviderBinding {
    /// A provider is usable once it has a non-empty API key.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false)
    }

    fn new(name: &str, base_url: &str, api_key: Option<String>, auth_style: AuthStyle, dialect: Dialect) -> Self {
        let extra_headers = if name == AGGREGATOR {
            vec![
                ("HTTP-Referer".to_string(), "https://kortix.ai".to_string()),
                ("X-Title".to_string(), "Kortix Gateway".to_string()),
            ]
        } else if dialect == Dialect::Anthropic {
            // Anthropic auth uses `x-api-key` (handled via `auth_style`), not
            // bearer, plus this fixed version header.
            vec![("anthropic-version".to_string(), "2023-06-01".to_string())]
        } else {
            Vec::new()
        };
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            api_key,
            auth_style,
            dialect,
            extra_headers,
        }
    }
}

/// Result of resolving a request's `model` id to a provider + provider-local
/// model id.
pub struct ResolvedModel {
    pub provider: String,
    pub provider_model_id: String,
    pub model_config: Option<ModelConfig>,
}

pub struct ProviderRegistry {
    bindings: HashMap<String, ProviderBinding>,
    models: HashMap<String, ModelConfig>,
}

/// Maps a request's model-id prefix to a canonical provider name. Prefixes
/// with no matching binding (e.g. `bedrock`, `aws`)
/// still parse, so the subsequent "is configured" check naturally reroutes
/// them to the aggregator.
fn provider_for_prefix(prefix: &str) -> Option<&'static str> {
    match prefix {
        "openrouter" => Some("openrouter"),
        "anthropic" => Some("anthropic"),
        "openai" => Some("openai"),
        "xai" | "x-ai" => Some("xai"),
        "groq" => Some("groq"),
        "gemini" | "google" => Some("gemini"),
        "bedrock" | "aws" => Some("bedrock"),
        _ => None,
    }
}

/// Infers a provider from a bare model id by substring match.
fn provider_for_model_substring(model: &str) -> Option<&'static str> {
    let m = model.to_lowercase();
    if m.starts_with("claude") {
        Some("anthropic")
    } else if m.starts_with("gpt") || m.starts_with("o1") || m.starts_with("o3") {
        Some("openai")
    } else if m.starts_with("grok") {
        Some("xai")
    } else if m.starts_with("gemini") {
        Some("gemini")
    } else if m.starts_with("llama") || m.starts_with("mixtral") || m.starts_with("groq") {
        Some("groq")
    } else {
        None
    }
}

impl ProviderRegistry {
    fn default_binding_spec(name: &str) -> (&'static str, AuthStyle, Dialect) {
        match name {
            "anthropic" => ("https://api.anthropic.com/v1", AuthStyle::ApiKeyHeader { header_name: "x-api-key" }, Dialect::Anthropic),
            "openrouter" => ("https://openrouter.ai/api/v1", AuthStyle::Bearer, Dialect::OpenAiCompatible),
            "openai" => ("https://api.openai.com/v1", AuthStyle::Bearer, Dialect::OpenAiCompatible),
            "xai" => ("https://api.x.ai/v1", AuthStyle::Bearer, Dialect::OpenAiCompatible),
            "groq" => ("https://api.groq.com/openai/v1", AuthStyle::Bearer, Dialect::OpenAiCompatible),
            "gemini" => ("https://generativelanguage.googleapis.com/v1beta/openai", AuthStyle::Bearer, Dialect::OpenAiCompatible),
            _ => ("", AuthStyle::None, Dialect::OpenAiCompatible),
        }
    }

    /// Builds the registry once at startup from environment configuration;
    /// immutable thereafter.
    pub fn from_env(config: &Config) -> Self {
        let mut bindings = HashMap::new();
        for name in ["openrouter", "openai", "anthropic", "xai", "groq", "gemini"] {
            let env = config.provider(name);
            let (default_url, auth_style, dialect) = Self::default_binding_spec(name);
            let base_url = env
                .and_then(|e| e.api_url.clone())
                .unwrap_or_else(|| default_url.to_string());
            let api_key = env.and_then(|e| e.api_key.clone());
            bindings.insert(name.to_string(), ProviderBinding::new(name, &base_url, api_key, auth_style, dialect));
        }

        Self {
            bindings,
            models: default_model_catalog(),
        }
    }

    /// Builds a registry from an explicit binding set, bypassing
    /// environment loading. Used by tests (unit and integration) that need
    /// to point a binding's `base_url` at a local mock server.
    pub fn with_bindings(bindings: HashMap<String, ProviderBinding>) -> Self {
        Self {
            bindings,
            models: default_model_catalog(),
        }
    }

    pub fn binding(&self, name: &str) -> Option<&ProviderBinding> {
        self.bindings.get(name)
    }

    pub fn aggregator(&self) -> Option<&ProviderBinding> {
        self.bindings.get(AGGREGATOR)
    }

    pub fn model_config(&self, model_id: &str) -> Option<&ModelConfig> {
        self.models.get(model_id)
    }

    pub fn models(&self) -> impl Iterator<Item = (&String, &ModelConfig)> {
        self.models.iter()
    }

    /// Full resolution algorithm: exact -> prefixed -> inferred -> aggregator
    /// default, with reroute-to-aggregator when the selected provider's key
    /// is unconfigured.
    pub fn resolve(&self, requested_model: &str) -> Option<ResolvedModel> {
        // Step 1: exact catalog lookup.
        if let Some(cfg) = self.models.get(requested_model) {
            let provider = cfg.provider_binding.clone();
            if self.is_usable(&provider) {
                return Some(ResolvedModel {
                    provider,
                    provider_model_id: requested_model.to_string(),
                    model_config: Some(cfg.clone()),
                });
            }
            return self.reroute_to_aggregator(&provider, requested_model);
        }

        // Step 2: explicit provider prefix (provider/model-id).
        if let Some((prefix, rest)) = requested_model.split_once('/') {
            if let Some(provider) = provider_for_prefix(prefix) {
                if self.is_usable(provider) {
                    return Some(ResolvedModel {
                        provider: provider.to_string(),
                        provider_model_id: rest.to_string(),
                        model_config: self.models.get(requested_model).cloned(),
                    });
                }
                return self.reroute_to_aggregator(prefix, rest);
            }
        }

        // Step 3: substring inference.
        if let Some(provider) = provider_for_model_substring(requested_model) {
            if self.is_usable(provider) {
                return Some(ResolvedModel {
                    provider: provider.to_string(),
                    provider_model_id: requested_model.to_string(),
                    model_config: None,
                });
            }
            return self.reroute_to_aggregator(provider, requested_model);
        }

        // Step 4: aggregator default.
        if self.is_usable(AGGREGATOR) {
            return Some(ResolvedModel {
                provider: AGGREGATOR.to_string(),
                provider_model_id: requested_model.to_string(),
                model_config: None,
            });
        }

        None
    }

    fn is_usable(&self, provider: &str) -> bool {
        self.bindings.get(provider).map(|b| b.is_configured()).unwrap_or(false)
    }

    /// Reroutes to the aggregator, rewriting the model id by prepending the
    /// original provider's prefix. Returns `None` if the aggregator itself
    /// is unconfigured, which the caller surfaces as a fatal 502.
    fn reroute_to_aggregator(&self, original_provider: &str, model_id_without_prefix: &str) -> Option<ResolvedModel> {
        if !self.is_usable(AGGREGATOR) {
            return None;
        }
        Some(ResolvedModel {
            provider: AGGREGATOR.to_string(),
            provider_model_id: format!("{original_provider}/{model_id_without_prefix}"),
            model_config: None,
        })
    }
}

/// Small built-in catalog covering a representative model per provider. A
/// real deployment would load a larger catalog the same way; the shape
/// (provider binding name + per-1M pricing + context + tier) is the
/// contract, not the specific rows.
fn default_model_catalog() -> HashMap<String, ModelConfig> {
    let mut m = HashMap::new();
    m.insert(
        "gpt-4o".to_string(),
        ModelConfig {
            provider_binding: "openai".to_string(),
            input_per_1m_tokens: 2.5,
            output_per_1m_tokens: 10.0,
            context_window: 128_000,
            tier: ModelTier::Paid,
        },
    );
    m.insert(
        "claude-3-5-sonnet".to_string(),
        ModelConfig {
            provider_binding: "anthropic".to_string(),
            input_per_1m_tokens: 3.0,
            output_per_1m_tokens: 15.0,
            context_window: 200_000,
            tier: ModelTier::Paid,
        },
    );
    m.insert(
        "grok-2".to_string(),
        ModelConfig {
            provider_binding: "xai".to_string(),
            input_per_1m_tokens: 2.0,
            output_per_1m_tokens: 10.0,
            context_window: 131_072,
            tier: ModelTier::Paid,
        },
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(configured: &[&str]) -> ProviderRegistry {
        let mut bindings = HashMap::new();
        for name in ["openrouter", "openai", "anthropic", "xai", "groq", "gemini"] {
            let (url, auth, dialect) = ProviderRegistry::default_binding_spec(name);
            let key = if configured.contains(&name) { Some("key".to_string()) } else { None };
            bindings.insert(name.to_string(), ProviderBinding::new(name, url, key, auth, dialect));
        }
        ProviderRegistry::with_bindings(bindings)
    }

    #[test]
    fn exact_catalog_lookup_wins() {
        let r = registry(&["openai", "openrouter"]);
        let resolved = r.resolve("gpt-4o").unwrap();
        assert_eq!(resolved.provider, "openai");
        assert_eq!(resolved.provider_model_id, "gpt-4o");
    }

    #[test]
    fn prefixed_id_selects_provider_explicitly() {
        let r = registry(&["anthropic", "openrouter"]);
        let resolved = r.resolve("anthropic/claude-3-opus").unwrap();
        assert_eq!(resolved.provider, "anthropic");
        assert_eq!(resolved.provider_model_id, "claude-3-opus");
    }

    #[test]
    fn substring_inference_routes_claude_to_anthropic() {
        let r = registry(&["anthropic", "openrouter"]);
        let resolved = r.resolve("claude-3-haiku").unwrap();
        assert_eq!(resolved.provider, "anthropic");
    }

    #[test]
    fn unconfigured_provider_reroutes_to_aggregator_with_prefix() {
        let r = registry(&["openrouter"]);
        let resolved = r.resolve("grok-2").unwrap();
        assert_eq!(resolved.provider, AGGREGATOR);
        assert_eq!(resolved.provider_model_id, "xai/grok-2");
    }

    #[test]
    fn unconfigured_aggregator_is_fatal() {
        let r = registry(&[]);
        assert!(r.resolve("grok-2").is_none());
    }

    #[test]
    fn unknown_model_defaults_to_aggregator() {
        let r = registry(&["openrouter"]);
        let resolved = r.resolve("openrouter/foo/bar-9000").unwrap();
        assert_eq!(resolved.provider, "openrouter");
    }
}
