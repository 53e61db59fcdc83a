//! Argument gate: decides whether a text is argumentative before analysis.
//!
//! A marker heuristic answers most inputs without a backend call. Only texts
//! with no inferential marker are sent to the model.

use std::sync::{Arc, OnceLock};

use dialectic_core::{CompletionRequest, ProviderId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DetectionError;
use crate::gateway::Gateway;
use crate::reply::Reply;

const MARKER_CONFIDENCE: f64 = 0.9;
const DEFAULT_CONFIDENCE: f64 = 0.5;
const MARKER_REASONING: &str = "Inferential markers found; text treated as argumentative.";
const UNAVAILABLE_REASONING: &str = "Detection service unavailable; assuming argumentative text.";

/// Default number of words of the input shown to the model.
pub const DEFAULT_EXCERPT_WORDS: usize = 2000;

const SYSTEM_PROMPT: &str = "You classify texts as argumentative or not. A text is \
argumentative if it advances at least one claim supported by reasons. Respond with a \
single JSON object: {\"is_argumentative\": boolean, \"confidence\": number between 0 and 1, \
\"reasoning\": string}. No other text.";

static MARKERS: OnceLock<Regex> = OnceLock::new();

fn markers() -> &'static Regex {
    MARKERS.get_or_init(|| {
        Regex::new(
            r"(?i)\b(therefore|thus|hence|consequently|accordingly|because|entails?|it follows that|for this reason|(?:we|one) (?:can|may|must) conclude|which (?:shows|proves|implies) that|implies that)\b",
        )
        .expect("valid marker regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Heuristic,
    Model,
    /// Model unavailable or unparseable; permissive default.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDetection {
    pub is_argumentative: bool,
    /// [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub source: DetectionSource,
}

impl ArgumentDetection {
    fn unavailable() -> Self {
        Self {
            is_argumentative: true,
            confidence: DEFAULT_CONFIDENCE,
            reasoning: UNAVAILABLE_REASONING.into(),
            source: DetectionSource::Fallback,
        }
    }
}

/// True when the text contains at least one inferential marker.
pub fn has_inference_markers(text: &str) -> bool {
    markers().is_match(text)
}

pub struct ArgumentGate {
    gateway: Arc<Gateway>,
    preferred: Option<ProviderId>,
    excerpt_words: usize,
    temperature: f32,
}

impl ArgumentGate {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            preferred: None,
            excerpt_words: DEFAULT_EXCERPT_WORDS,
            temperature: 0.1,
        }
    }

    pub fn with_preferred(mut self, preferred: Option<ProviderId>) -> Self {
        self.preferred = preferred;
        self
    }

    /// Cap on the words of input included in the model prompt.
    pub fn with_excerpt_words(mut self, words: usize) -> Self {
        self.excerpt_words = words.max(1);
        self
    }

    /// Classify `text`. Errors only on the model path.
    pub async fn detect(&self, text: &str) -> Result<ArgumentDetection, DetectionError> {
        if has_inference_markers(text) {
            debug!("argument gate: markers found");
            return Ok(ArgumentDetection {
                is_argumentative: true,
                confidence: MARKER_CONFIDENCE,
                reasoning: MARKER_REASONING.into(),
                source: DetectionSource::Heuristic,
            });
        }

        let excerpt = text
            .split_whitespace()
            .take(self.excerpt_words)
            .collect::<Vec<_>>()
            .join(" ");
        let request = CompletionRequest::new(
            SYSTEM_PROMPT,
            format!("Text:\n\n{excerpt}"),
            self.temperature,
            512,
        );
        let raw = self.gateway.complete(&request, self.preferred).await?;
        let reply = Reply::parse(&raw)?;

        Ok(ArgumentDetection {
            is_argumentative: reply.flag("is_argumentative", true),
            confidence: reply.score("confidence", DEFAULT_CONFIDENCE, 1.0),
            reasoning: reply.text("reasoning"),
            source: DetectionSource::Model,
        })
    }

    /// Classify `text`, resolving any failure to the permissive default.
    pub async fn detect_or_default(&self, text: &str) -> ArgumentDetection {
        match self.detect(text).await {
            Ok(detection) => detection,
            Err(err) => {
                warn!(error = %err, "argument detection degraded to default");
                ArgumentDetection::unavailable()
            }
        }
    }
}
