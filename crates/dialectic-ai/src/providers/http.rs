//! HTTP clients for the Anthropic Messages API and OpenAI-compatible
//! chat-completions and embeddings APIs.

use async_trait::async_trait;
use dialectic_core::{CompletionRequest, ProviderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{
    ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_MODEL,
    DEFAULT_PERPLEXITY_MODEL, OPENAI_BASE_URL, PERPLEXITY_BASE_URL,
};
use crate::embedding::EmbeddingBackend;
use crate::gateway::CompletionBackend;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} returned no content")]
    EmptyReply(ProviderId),
}

async fn read_body(resp: reqwest::Response) -> Result<String, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.text().await?)
}

// ── Anthropic ──

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn messages_body<'a>(model: &'a str, request: &'a CompletionRequest) -> MessagesBody<'a> {
    MessagesBody {
        model,
        max_tokens: request.max_tokens(),
        temperature: request.temperature(),
        system: request.system_prompt(),
        messages: [ChatMessage {
            role: "user",
            content: request.user_prompt(),
        }],
    }
}

fn parse_messages_reply(raw: &str) -> Result<String, ProviderError> {
    let reply: MessagesReply = serde_json::from_str(raw)?;
    let text: String = reply
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyReply(ProviderId::Anthropic));
    }
    Ok(text)
}

/// Client for the Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self::with_base_url(ANTHROPIC_BASE_URL.into(), api_key, model)
    }

    /// `base_url` is like `https://api.anthropic.com` (trailing slash tolerated).
    pub fn with_base_url(base_url: String, api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.into()),
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, model = %self.model, "anthropic completion");
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&messages_body(&self.model, request))
            .send()
            .await?;
        parse_messages_reply(&read_body(resp).await?)
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn invoke(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        Ok(self.send(request).await?)
    }
}

// ── OpenAI-compatible chat completions ──

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_body<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatBody<'a> {
    ChatBody {
        model,
        temperature: request.temperature(),
        max_tokens: request.max_tokens(),
        messages: [
            ChatMessage {
                role: "system",
                content: request.system_prompt(),
            },
            ChatMessage {
                role: "user",
                content: request.user_prompt(),
            },
        ],
    }
}

fn parse_chat_reply(provider: ProviderId, raw: &str) -> Result<String, ProviderError> {
    let reply: ChatReply = serde_json::from_str(raw)?;
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyReply(provider))
}

/// Client for chat-completions endpoints (OpenAI, Perplexity).
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    provider: ProviderId,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleBackend {
    pub fn openai(api_key: String, model: Option<String>) -> Self {
        Self::new(
            ProviderId::OpenAi,
            OPENAI_BASE_URL.into(),
            api_key,
            model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
        )
    }

    pub fn perplexity(api_key: String, model: Option<String>) -> Self {
        Self::new(
            ProviderId::Perplexity,
            PERPLEXITY_BASE_URL.into(),
            api_key,
            model.unwrap_or_else(|| DEFAULT_PERPLEXITY_MODEL.into()),
        )
    }

    /// `base_url` is the API root that `/chat/completions` hangs off.
    pub fn new(provider: ProviderId, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, provider = %self.provider, model = %self.model, "chat completion");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_body(&self.model, request))
            .send()
            .await?;
        parse_chat_reply(self.provider, &read_body(resp).await?)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn invoke(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        Ok(self.send(request).await?)
    }
}

// ── Embeddings ──

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingReply {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

fn parse_embedding_reply(raw: &str) -> Result<Vec<f32>, ProviderError> {
    let reply: EmbeddingReply = serde_json::from_str(raw)?;
    reply
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(ProviderError::EmptyReply(ProviderId::OpenAi))
}

/// Client for the OpenAI embeddings endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self::with_base_url(OPENAI_BASE_URL.into(), api_key, model)
    }

    pub fn with_base_url(base_url: String, api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
        }
    }

    async fn send(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);
        debug!(url = %url, model = %self.model, chars = text.len(), "embedding request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingBody {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;
        parse_embedding_reply(&read_body(resp).await?)
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.send(text).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new("Return JSON.", "Analyse this.", 0.3, 1024)
    }

    #[test]
    fn messages_body_shape() {
        let req = request();
        let json = serde_json::to_value(messages_body("claude-test", &req)).unwrap();
        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["system"], "Return JSON.");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Analyse this.");
    }

    #[test]
    fn messages_reply_joins_text_blocks() {
        let raw = r#"{"id":"msg_1","content":[{"type":"text","text":"{\"a\":"},{"type":"text","text":" 1}"}]}"#;
        assert_eq!(parse_messages_reply(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn messages_reply_without_text_is_empty() {
        let err = parse_messages_reply(r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyReply(ProviderId::Anthropic)));
    }

    #[test]
    fn chat_body_carries_system_then_user() {
        let req = request();
        let json = serde_json::to_value(chat_body("gpt-test", &req)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Analyse this.");
    }

    #[test]
    fn chat_reply_first_choice() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"ok\":true}"}}]}"#;
        assert_eq!(
            parse_chat_reply(ProviderId::Perplexity, raw).unwrap(),
            "{\"ok\":true}"
        );
        let err = parse_chat_reply(ProviderId::Perplexity, r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyReply(ProviderId::Perplexity)));
    }

    #[test]
    fn embedding_reply_first_vector() {
        let raw = r#"{"data":[{"index":0,"embedding":[0.1,0.2,0.3]}],"model":"m"}"#;
        assert_eq!(parse_embedding_reply(raw).unwrap(), vec![0.1, 0.2, 0.3]);
        assert!(parse_embedding_reply("not json").is_err());
    }

    #[test]
    fn base_urls_trim_trailing_slash() {
        let anthropic =
            AnthropicBackend::with_base_url("http://localhost:8080/".into(), "k".into(), None);
        assert_eq!(anthropic.base_url, "http://localhost:8080");
        assert_eq!(anthropic.model, DEFAULT_ANTHROPIC_MODEL);

        let chat = OpenAiCompatibleBackend::new(
            ProviderId::OpenAi,
            "http://localhost:9000/v1//".into(),
            "k".into(),
            "m".into(),
        );
        assert_eq!(chat.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn compatible_backends_report_their_provider() {
        let perplexity = OpenAiCompatibleBackend::perplexity("k".into(), None);
        assert_eq!(perplexity.provider(), ProviderId::Perplexity);
        assert_eq!(perplexity.base_url, PERPLEXITY_BASE_URL);
        assert_eq!(perplexity.model, DEFAULT_PERPLEXITY_MODEL);
    }
}
