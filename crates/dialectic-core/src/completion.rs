//! Completion request value and provider identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A text-completion backend.
///
/// Declaration order is the canonical failover order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Anthropic,
    OpenAi,
    Perplexity,
}

impl ProviderId {
    pub const CANONICAL: [ProviderId; 3] = [
        ProviderId::Anthropic,
        ProviderId::OpenAi,
        ProviderId::Perplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "open_ai" | "gpt" => Ok(Self::OpenAi),
            "perplexity" => Ok(Self::Perplexity),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// One completion call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    system_prompt: String,
    user_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl CompletionRequest {
    /// Temperature is clamped to [0, 1]; `max_tokens` is at least 1.
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        let temperature = if temperature.is_finite() {
            temperature.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature,
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_clamps_out_of_range_values() {
        let req = CompletionRequest::new("sys", "user", 1.7, 0);
        assert_eq!(req.temperature(), 1.0);
        assert_eq!(req.max_tokens(), 1);

        let req = CompletionRequest::new("sys", "user", f32::NAN, 512);
        assert_eq!(req.temperature(), 0.0);
        assert_eq!(req.max_tokens(), 512);
    }

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("Claude".parse::<ProviderId>(), Ok(ProviderId::Anthropic));
        assert_eq!("openai".parse::<ProviderId>(), Ok(ProviderId::OpenAi));
        assert!("mistral".parse::<ProviderId>().is_err());
    }

    #[test]
    fn canonical_order_matches_declaration() {
        let mut sorted = ProviderId::CANONICAL;
        sorted.sort();
        assert_eq!(sorted, ProviderId::CANONICAL);
    }
}
