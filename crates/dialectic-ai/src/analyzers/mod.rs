//! Per-module analyzers and the chunked run loop they share.
//!
//! An analyzer supplies its prompts, a lenient reply parser and a
//! synthesizer. [`run`] segments the input, calls the gateway once per chunk
//! in order, and folds multi-chunk results through the synthesizer so the
//! caller always sees the single-chunk shape.

mod continuity;
mod inference;
mod integrity;
mod justification;
mod utility;

pub use continuity::{ContinuityAnalyzer, ReferenceText};
pub use inference::InferenceAnalyzer;
pub use integrity::IntegrityAnalyzer;
pub use justification::JustificationAnalyzer;
pub use utility::UtilityAnalyzer;

use dialectic_core::{Chunk, CompletionRequest, ModuleKind, ProviderId, ScoreBucket, chunks};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::gateway::Gateway;
use crate::reply::Reply;

/// Default for a missing unit-interval score.
pub(crate) const UNIT_DEFAULT: f64 = 0.5;
/// Default for a missing ten-point score.
pub(crate) const TEN_POINT_DEFAULT: f64 = 5.0;

pub trait Analyzer: Send + Sync {
    type Output: Send;

    const KIND: ModuleKind;

    fn system_prompt(&self) -> String;

    /// User prompt for one chunk. `total` is the number of chunks.
    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String;

    /// Build a result from a reply, defaulting every missing field.
    fn parse(&self, reply: &Reply) -> Self::Output;

    /// Merge per-chunk results, in chunk order, into one result.
    fn synthesize(&self, parts: Vec<Self::Output>) -> Self::Output;
}

/// Per-call knobs for [`run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub max_chunk_words: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub preferred: Option<ProviderId>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_chunk_words: 2000,
            temperature: 0.3,
            max_tokens: 4096,
            preferred: None,
        }
    }
}

/// Outcome of [`run`]: the synthesized result and how many chunks fed it.
#[derive(Debug)]
pub struct ModuleRun<T> {
    pub output: T,
    pub chunk_count: usize,
}

/// Analyze `text` with `analyzer`, chunking when it exceeds the word budget.
///
/// Chunks are processed one at a time in order. Any backend or parse failure
/// aborts the run; no partial result is returned.
pub async fn run<A: Analyzer>(
    analyzer: &A,
    gateway: &Gateway,
    text: &str,
    opts: &RunOptions,
) -> Result<ModuleRun<A::Output>, AnalysisError> {
    let parts = chunks(text, opts.max_chunk_words);
    let total = parts.len();
    let system = analyzer.system_prompt();

    if total > 1 {
        info!(module = %A::KIND, chunks = total, "analysing in chunks");
    }

    let mut outputs = Vec::with_capacity(total);
    for chunk in &parts {
        debug!(module = %A::KIND, chunk = chunk.index, total, words = chunk.word_count, "chunk");
        let request = CompletionRequest::new(
            system.clone(),
            analyzer.user_prompt(chunk, total),
            opts.temperature,
            opts.max_tokens,
        );
        let raw = gateway.complete(&request, opts.preferred).await?;
        let reply = Reply::parse(&raw).map_err(|source| AnalysisError::MalformedReply {
            module: A::KIND,
            chunk: chunk.index,
            source,
        })?;
        outputs.push(analyzer.parse(&reply));
    }

    let output = if outputs.len() == 1 {
        outputs.pop().ok_or(AnalysisError::EmptyInput)?
    } else {
        analyzer.synthesize(outputs)
    };
    Ok(ModuleRun {
        output,
        chunk_count: total,
    })
}

// ── Synthesis helpers ──

/// Unweighted arithmetic mean; 0 for no values.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Join non-empty narratives as "Chunk k: ..." paragraphs, k being 1-based.
pub(crate) fn labelled<'a>(narratives: impl IntoIterator<Item = &'a str>) -> String {
    narratives
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| format!("Chunk {}: {}", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pick one of three phrasings by the bucket of a unit-interval score.
pub(crate) fn by_bucket(score: f64, high: &str, moderate: &str, low: &str) -> String {
    match ScoreBucket::of(score) {
        ScoreBucket::High => high,
        ScoreBucket::Moderate => moderate,
        ScoreBucket::Low => low,
    }
    .to_string()
}

/// Prompt preamble placing a chunk within the document.
pub(crate) fn chunk_header(chunk: &Chunk, total: usize) -> String {
    if total > 1 {
        format!(
            "This is section {} of {} of a longer document. Analyze this section on its own.\n\n",
            chunk.index, total
        )
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{ScriptedBackend, gateway_of};

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    /// 4500 words in three 1500-word paragraphs.
    fn long_text() -> String {
        [words(1500), words(1500), words(1500)].join("\n\n")
    }

    #[test]
    fn mean_is_unweighted() {
        assert!((mean([0.6, 0.8, 0.7]) - 0.7).abs() < 1e-9);
        assert_eq!(mean(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn labelled_skips_blank_narratives() {
        assert_eq!(
            labelled(["first", "  ", "third"]),
            "Chunk 1: first\n\nChunk 3: third"
        );
    }

    #[tokio::test]
    async fn chunks_processed_in_order_and_averaged() {
        let backend = ScriptedBackend::replies(
            ProviderId::Anthropic,
            &[
                r#"{"arguments": [{"conclusion": "A"}], "coherence_score": 0.6, "overall_strength": 0.5}"#,
                r#"{"arguments": [{"conclusion": "B"}], "coherence_score": 0.8, "overall_strength": 0.7}"#,
                r#"{"arguments": [{"conclusion": "C"}], "coherence_score": 0.7, "overall_strength": 0.9}"#,
            ],
        );
        let gateway = gateway_of([&backend]);

        let outcome = run(&InferenceAnalyzer, &gateway, &long_text(), &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(backend.calls(), 3);
        assert!((outcome.output.coherence_score - 0.7).abs() < 1e-9);
        let conclusions: Vec<_> = outcome
            .output
            .arguments
            .iter()
            .map(|a| a.conclusion.as_str())
            .collect();
        assert_eq!(conclusions, ["A", "B", "C"]);

        let prompts = backend.prompts();
        assert!(prompts[0].contains("section 1 of 3"));
        assert!(prompts[2].contains("section 3 of 3"));
    }

    #[tokio::test]
    async fn single_chunk_makes_one_call_without_header() {
        let backend = ScriptedBackend::ok(ProviderId::OpenAi, r#"{"coherence_score": 0.9}"#);
        let gateway = gateway_of([&backend]);

        let outcome = run(
            &InferenceAnalyzer,
            &gateway,
            "Short text, therefore one chunk.",
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(backend.calls(), 1);
        assert_eq!(outcome.output.coherence_score, 0.9);
        assert!(!backend.prompts()[0].contains("section"));
    }

    #[tokio::test]
    async fn malformed_chunk_aborts_run() {
        let backend = ScriptedBackend::replies(
            ProviderId::Anthropic,
            &[r#"{"coherence_score": 0.6}"#, "not json at all", r#"{}"#],
        );
        let gateway = gateway_of([&backend]);

        let err = run(&InferenceAnalyzer, &gateway, &long_text(), &RunOptions::default())
            .await
            .unwrap_err();

        match err {
            AnalysisError::MalformedReply { module, chunk, .. } => {
                assert_eq!(module, ModuleKind::Inference);
                assert_eq!(chunk, 2);
            }
            other => panic!("expected malformed reply, got {other:?}"),
        }
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn backend_exhaustion_propagates() {
        let backend: Arc<ScriptedBackend> = ScriptedBackend::failing(ProviderId::Perplexity, "down");
        let gateway = gateway_of([&backend]);
        let err = run(&UtilityAnalyzer, &gateway, "Some text.", &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(_)));
    }
}
