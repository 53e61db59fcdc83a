//! Provider wiring from API keys.

use std::sync::Arc;

use clap::Args;
use dialectic_ai::providers::{AnthropicBackend, OpenAiCompatibleBackend, OpenAiEmbedder};
use dialectic_ai::{CompletionBackend, EmbeddingBackend, Gateway};
use tracing::info;

/// Provider credentials and model overrides, read from flags or the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderKeys {
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_key: Option<String>,
    #[arg(long, env = "ANTHROPIC_MODEL")]
    pub anthropic_model: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_key: Option<String>,
    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_key: Option<String>,
    #[arg(long, env = "PERPLEXITY_MODEL")]
    pub perplexity_model: Option<String>,

    #[arg(long, env = "OPENAI_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,
}

fn present(key: &Option<String>) -> Option<String> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

impl ProviderKeys {
    /// One backend per provider with a key; order is fixed by the gateway.
    pub fn gateway(&self) -> Gateway {
        let mut backends: Vec<Arc<dyn CompletionBackend>> = Vec::new();
        if let Some(key) = present(&self.anthropic_key) {
            backends.push(Arc::new(AnthropicBackend::new(
                key,
                self.anthropic_model.clone(),
            )));
        }
        if let Some(key) = present(&self.openai_key) {
            backends.push(Arc::new(OpenAiCompatibleBackend::openai(
                key,
                self.openai_model.clone(),
            )));
        }
        if let Some(key) = present(&self.perplexity_key) {
            backends.push(Arc::new(OpenAiCompatibleBackend::perplexity(
                key,
                self.perplexity_model.clone(),
            )));
        }
        let gateway = Gateway::new(backends);
        info!(providers = ?gateway.providers(), "completion providers configured");
        gateway
    }

    /// Embeddings need an OpenAI key.
    pub fn embedder(&self) -> Option<Arc<dyn EmbeddingBackend>> {
        present(&self.openai_key).map(|key| {
            Arc::new(OpenAiEmbedder::new(key, self.embedding_model.clone()))
                as Arc<dyn EmbeddingBackend>
        })
    }
}
