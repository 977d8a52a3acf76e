//! Process-wide configuration, loaded once at startup from the environment.
//! Operator keys are read straight from `std::env::var`, falling back to
//! `Option<String>` when absent rather than panicking at load time.

use std::env;

/// `ENV_MODE`: controls the dev-mode billing bypass and pretty-JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Local,
    Staging,
    Production,
}

impl EnvMode {
    fn parse(raw: &str) -> Self {
        match raw {
            "production" => EnvMode::Production,
            "staging" => EnvMode::Staging,
            _ => EnvMode::Local,
        }
    }

    /// Dev-mode (`local` or `staging`) implies credit checks and debits are
    /// bypassed; credentials are still validated.
    pub fn is_dev_mode(self) -> bool {
        matches!(self, EnvMode::Local | EnvMode::Staging)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvMode::Local => "local",
            EnvMode::Staging => "staging",
            EnvMode::Production => "production",
        }
    }
}

/// Base URL and API key for one upstream provider, read as
/// `<PROVIDER>_API_URL` / `<PROVIDER>_API_KEY`. Absence of the key means the
/// provider is unconfigured (`ProviderBinding::is_configured`).
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

impl ProviderEnv {
    fn from_env(prefix: &str) -> Self {
        Self {
            api_url: env::var(format!("{prefix}_API_URL")).ok(),
            api_key: env::var(format!("{prefix}_API_KEY")).ok(),
        }
    }
}

/// The fixed set of upstream provider env prefixes the gateway understands,
/// both LLM providers (consumed by the provider registry, C5) and search
/// providers (consumed by `build_state` for the C6 adapters). Adding a
/// provider means adding a prefix here and a binding/adapter construction at
/// its point of use — the two are kept deliberately separate so registry
/// construction can be unit-tested without environment access.
pub const PROVIDER_ENV_PREFIXES: &[&str] = &[
    "OPENROUTER",
    "OPENAI",
    "ANTHROPIC",
    "XAI",
    "GROQ",
    "GEMINI",
    "BRAVE",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub env_mode: EnvMode,
    pub port: u16,
    pub api_key_secret: Option<String>,
    pub backend_api_url: Option<String>,
    pub backend_api_key: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub providers: std::collections::HashMap<String, ProviderEnv>,
    /// Comma-separated `ALLOWED_ORIGINS`, beyond the always-allowed dev
    /// localhost origins.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from the process environment. Never panics on a
    /// missing optional variable; callers that require a secret (the
    /// credential path needing `API_KEY_SECRET`, the ledger paths needing
    /// Supabase or backend settings) surface a `GatewayError::Config` at the
    /// point of use instead, so a deployment that doesn't need credentials
    /// or a direct ledger can still boot.
    pub fn from_env() -> Self {
        let env_mode = env::var("ENV_MODE")
            .map(|v| EnvMode::parse(&v))
            .unwrap_or(EnvMode::Local);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8787);

        let mut providers = std::collections::HashMap::new();
        for prefix in PROVIDER_ENV_PREFIXES {
            providers.insert(prefix.to_lowercase(), ProviderEnv::from_env(prefix));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Self {
            env_mode,
            port,
            api_key_secret: env::var("API_KEY_SECRET").ok(),
            backend_api_url: env::var("BACKEND_API_URL").ok(),
            backend_api_key: env::var("BACKEND_API_KEY").ok(),
            supabase_url: env::var("SUPABASE_URL").ok(),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            providers,
            allowed_origins,
        }
    }

    pub fn provider(&self, key: &str) -> Option<&ProviderEnv> {
        self.providers.get(key)
    }

    /// Whether the direct (Supabase) ledger/credential path is configured.
    pub fn has_direct_ledger(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_role_key.is_some()
    }

    /// Whether the HTTP fallback ledger is configured.
    pub fn has_http_ledger(&self) -> bool {
        self.backend_api_url.is_some()
    }
}
