//! Concrete completion and embedding backends.
//!
//! The HTTP clients live behind the `http` feature so the orchestration
//! layer builds and tests without a network stack.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{AnthropicBackend, OpenAiCompatibleBackend, OpenAiEmbedder, ProviderError};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_PERPLEXITY_MODEL: &str = "sonar-pro";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
