// LLM provider client with graceful fallback
// The contract is "never surface a raw provider error to the caller":
// missing credential, exhausted quota, transport failure, and non-2xx
// responses all degrade to a deterministic simulated response.

mod openai;
mod simulated;

pub use openai::OpenAiBackend;
pub use simulated::simulated_completion;

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::privacy::Redactor;
use crate::quota::QuotaLedger;

/// Seam between the client and the wire. The gateway never talks to a
/// backend directly.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    /// True when the canned fallback was served instead of a live call.
    pub simulated: bool,
}

pub struct ProviderClient {
    backend: Option<Box<dyn CompletionBackend>>,
    quota: Arc<QuotaLedger>,
    redactor: Redactor,
}

impl ProviderClient {
    /// Absent or blank credential selects simulated mode.
    pub fn new(config: &ProviderConfig, quota: Arc<QuotaLedger>) -> Self {
        let backend: Option<Box<dyn CompletionBackend>> = match &config.api_key {
            Some(key) if !key.trim().is_empty() => Some(Box::new(OpenAiBackend::new(config))),
            _ => None,
        };
        Self {
            backend,
            quota,
            redactor: Redactor::new(),
        }
    }

    /// Swap in a backend directly; used by tests and alternative providers.
    pub fn with_backend(backend: Box<dyn CompletionBackend>, quota: Arc<QuotaLedger>) -> Self {
        Self {
            backend: Some(backend),
            quota,
            redactor: Redactor::new(),
        }
    }

    /// Complete `prompt` for `user_id`. Never fails: every degraded path
    /// returns a simulated response. Quota is consumed before the network
    /// call and not refunded on timeout or cancellation; it is a coarse
    /// abuse guard, not a billing meter.
    pub async fn complete(&self, prompt: &str, user_id: &str) -> ProviderResponse {
        let Some(backend) = &self.backend else {
            // Simulated mode bypasses the quota; only live calls count.
            return ProviderResponse {
                text: simulated_completion(prompt),
                simulated: true,
            };
        };

        if !self.quota.try_consume(user_id) {
            tracing::warn!(user = user_id, "daily quota exhausted; serving simulated response");
            return ProviderResponse {
                text: simulated_completion(prompt),
                simulated: true,
            };
        }

        // Last line of defense: the prompt is redacted again even though the
        // gateway already redacted each source field.
        let redacted = self.redactor.redact(prompt);
        match backend.complete(&redacted).await {
            Ok(text) => ProviderResponse {
                text,
                simulated: false,
            },
            Err(_) => {
                // The error may echo request content; log the event, not the
                // message.
                tracing::warn!(user = user_id, "provider unavailable; serving simulated response");
                ProviderResponse {
                    text: simulated_completion(prompt),
                    simulated: true,
                }
            }
        }
    }
}
