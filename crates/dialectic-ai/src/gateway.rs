//! Completion gateway: sequential failover across text-completion providers.
//!
//! Providers are tried one at a time, never raced, each at most once per
//! call: the preferred provider first, then the rest in canonical order.
//! The first success wins; Markdown code fences around the reply are
//! stripped so callers always receive raw JSON text.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use dialectic_core::{CompletionRequest, ProviderId};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One concrete text-completion backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn invoke(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no completion providers configured")]
    NoProviders,

    #[error("all providers failed ({}); last error from {last_provider}: {last_error}", join_providers(.attempted))]
    Exhausted {
        attempted: Vec<ProviderId>,
        last_provider: ProviderId,
        last_error: String,
    },
}

fn join_providers(providers: &[ProviderId]) -> String {
    providers
        .iter()
        .map(ProviderId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failover chain over injected backend handles.
#[derive(Clone)]
pub struct Gateway {
    backends: Vec<Arc<dyn CompletionBackend>>,
    default_preferred: Option<ProviderId>,
}

impl Gateway {
    /// Build a gateway from backend handles.
    ///
    /// Backends are kept in canonical provider order; if two handles claim the
    /// same provider, the first one given wins.
    pub fn new(backends: Vec<Arc<dyn CompletionBackend>>) -> Self {
        let mut unique: Vec<Arc<dyn CompletionBackend>> = Vec::with_capacity(backends.len());
        for backend in backends {
            if unique.iter().any(|b| b.provider() == backend.provider()) {
                warn!(provider = %backend.provider(), "duplicate backend ignored");
                continue;
            }
            unique.push(backend);
        }
        unique.sort_by_key(|b| b.provider());
        Self {
            backends: unique,
            default_preferred: None,
        }
    }

    /// Provider to try first when a call does not name one.
    pub fn with_preferred(mut self, preferred: Option<ProviderId>) -> Self {
        self.default_preferred = preferred;
        self
    }

    /// Configured providers in canonical order.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.backends.iter().map(|b| b.provider()).collect()
    }

    /// Order in which providers will be tried for a call.
    ///
    /// A preferred provider that is not configured is ignored.
    pub fn trial_order(&self, preferred: Option<ProviderId>) -> Vec<ProviderId> {
        let mut order = self.providers();
        if let Some(p) = preferred.or(self.default_preferred)
            && let Some(pos) = order.iter().position(|&id| id == p)
        {
            let first = order.remove(pos);
            order.insert(0, first);
        }
        order
    }

    /// Send `request` through the failover chain.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        preferred: Option<ProviderId>,
    ) -> Result<String, GatewayError> {
        let order = self.trial_order(preferred);
        let mut attempted = Vec::with_capacity(order.len());
        let mut last_failure: Option<(ProviderId, String)> = None;

        for provider in order {
            let Some(backend) = self.backends.iter().find(|b| b.provider() == provider) else {
                continue;
            };
            attempted.push(provider);
            debug!(%provider, max_tokens = request.max_tokens(), "invoking completion backend");

            match backend.invoke(request).await {
                Ok(text) => {
                    if attempted.len() > 1 {
                        info!(%provider, attempts = attempted.len(), "completion succeeded after failover");
                    }
                    return Ok(strip_code_fence(&text));
                }
                Err(err) => {
                    warn!(%provider, error = %err, "completion backend failed");
                    last_failure = Some((provider, format!("{err:#}")));
                }
            }
        }

        match last_failure {
            Some((last_provider, last_error)) => Err(GatewayError::Exhausted {
                attempted,
                last_provider,
                last_error,
            }),
            None => Err(GatewayError::NoProviders),
        }
    }
}

static FENCE: OnceLock<Regex> = OnceLock::new();

/// Strip a single outer Markdown code fence (```` ``` ```` or ```` ```json ````).
///
/// Unfenced text is returned unchanged.
pub fn strip_code_fence(text: &str) -> String {
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```$")
            .expect("valid fence regex")
    });
    match fence.captures(text.trim()) {
        Some(caps) => caps.get(1).map_or_else(String::new, |m| m.as_str().to_string()),
        None => text.to_string(),
    }
}
