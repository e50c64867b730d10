// Process configuration
// One required secret for key derivation; everything else has a default.

use crate::error::GatewayError;

pub const ENCRYPTION_SECRET_VAR: &str = "CARETAKER_ENCRYPTION_SECRET";
pub const PROVIDER_API_KEY_VAR: &str = "CARETAKER_OPENAI_API_KEY";
pub const PROVIDER_BASE_URL_VAR: &str = "CARETAKER_OPENAI_BASE_URL";
pub const PROVIDER_MODEL_VAR: &str = "CARETAKER_OPENAI_MODEL";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Absent or blank selects the simulated-response mode rather than
    /// failing; the gateway stays usable without a live provider.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 700,
            temperature: 0.3,
            timeout_secs: 60,
            connect_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub encryption_secret: String,
    pub provider: ProviderConfig,
}

impl GatewayConfig {
    /// Read configuration from the environment. Fails closed when the
    /// encryption secret is missing or blank.
    pub fn from_env() -> Result<Self, GatewayError> {
        let encryption_secret = std::env::var(ENCRYPTION_SECRET_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Configuration(format!("{} is not set", ENCRYPTION_SECRET_VAR))
            })?;

        let defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            api_key: std::env::var(PROVIDER_API_KEY_VAR)
                .ok()
                .filter(|s| !s.trim().is_empty()),
            base_url: std::env::var(PROVIDER_BASE_URL_VAR)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| defaults.base_url.clone()),
            model: std::env::var(PROVIDER_MODEL_VAR)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| defaults.model.clone()),
            ..defaults
        };

        let config = Self {
            encryption_secret,
            provider,
        };
        config.verify_encryption_setup()?;
        Ok(config)
    }

    /// Startup check: key derivation must work before any traffic is served.
    pub fn verify_encryption_setup(&self) -> Result<(), GatewayError> {
        crate::privacy::encryption::derive_key(&self.encryption_secret, "startup-probe")?;
        if self.provider.api_key.is_none() {
            tracing::info!("no provider credential configured; AI responses will be simulated");
        }
        Ok(())
    }
}
