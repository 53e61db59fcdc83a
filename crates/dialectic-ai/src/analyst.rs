//! The analysis orchestrator.
//!
//! [`Analyst`] wires the gateway, detectors, analyzers and stores together:
//! validate the input, gate it, run the requested module, attach embedding
//! similarities for continuity, and persist the record.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dialectic_core::{
    AnalysisConfig, AnalysisRecord, DoctrineAlignment, DoctrinePolicy, ModuleKind, ModuleResult,
    ProviderId, ReferenceSimilarity, StanceDimension, normalize_label, word_count,
};
use dialectic_store::{PolicyStore, RecordStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzers::{
    Analyzer, ContinuityAnalyzer, InferenceAnalyzer, IntegrityAnalyzer, JustificationAnalyzer,
    ReferenceText, RunOptions, UtilityAnalyzer, run,
};
use crate::doctrine::align;
use crate::embedding::{EmbeddingBackend, cosine_similarity};
use crate::error::AnalysisError;
use crate::gate::{ArgumentDetection, ArgumentGate};
use crate::gateway::Gateway;
use crate::stance::{StanceExtraction, StanceExtractor};

/// A prior text for continuity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceInput {
    /// A stored analysis record, compared through its input text.
    Record(String),
    Inline { label: String, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub module: ModuleKind,
    pub text: String,
    /// Only used by continuity.
    pub references: Vec<ReferenceInput>,
    /// Overrides the configured preferred provider for this request.
    pub preferred_provider: Option<ProviderId>,
    pub skip_gate: bool,
}

impl AnalysisRequest {
    pub fn new(module: ModuleKind, text: impl Into<String>) -> Self {
        Self {
            module,
            text: text.into(),
            references: Vec::new(),
            preferred_provider: None,
            skip_gate: false,
        }
    }

    pub fn with_references(mut self, references: Vec<ReferenceInput>) -> Self {
        self.references = references;
        self
    }

    pub fn with_preferred(mut self, provider: Option<ProviderId>) -> Self {
        self.preferred_provider = provider;
        self
    }

    pub fn skip_gate(mut self) -> Self {
        self.skip_gate = true;
        self
    }
}

/// What a completed analysis hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// `None` when persistence failed.
    pub record_id: Option<String>,
    pub module_type: ModuleKind,
    pub word_count: usize,
    pub chunk_count: usize,
    pub processing_time_ms: u64,
    /// `None` when the gate was skipped.
    pub detection: Option<ArgumentDetection>,
    pub result: ModuleResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceReport {
    pub extraction: StanceExtraction,
    pub alignment: DoctrineAlignment,
}

pub struct Analyst {
    gateway: Arc<Gateway>,
    gate: ArgumentGate,
    stance: StanceExtractor,
    embedder: Option<Arc<dyn EmbeddingBackend>>,
    records: Arc<dyn RecordStore>,
    policy: Arc<dyn PolicyStore>,
    config: AnalysisConfig,
}

impl Analyst {
    pub fn new(
        gateway: Gateway,
        records: Arc<dyn RecordStore>,
        policy: Arc<dyn PolicyStore>,
        config: AnalysisConfig,
    ) -> Self {
        let gateway = Arc::new(gateway.with_preferred(config.preferred_provider));
        let gate = ArgumentGate::new(Arc::clone(&gateway))
            .with_preferred(config.preferred_provider)
            .with_excerpt_words(config.max_chunk_words);
        let stance = StanceExtractor::new(Arc::clone(&gateway))
            .with_threshold(config.stance_threshold)
            .with_preferred(config.preferred_provider);
        Self {
            gateway,
            gate,
            stance,
            embedder: None,
            records,
            policy,
            config,
        }
    }

    /// Embedding backend for continuity similarities.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        self.gateway.providers()
    }

    /// Run the argument gate alone; never fails.
    pub async fn detect(&self, text: &str) -> ArgumentDetection {
        self.gate.detect_or_default(text).await
    }

    /// Validate, gate, analyze and persist one request.
    pub async fn process(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();
        let text = request.text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let words = word_count(text);
        if words > self.config.max_input_words {
            return Err(AnalysisError::OverLength {
                words,
                limit: self.config.max_input_words,
            });
        }

        let references = if request.module == ModuleKind::Continuity {
            self.resolve_references(&request.references).await?
        } else {
            Vec::new()
        };

        let detection = if request.skip_gate {
            None
        } else {
            let detection = self.gate.detect_or_default(text).await;
            if !detection.is_argumentative && detection.confidence >= self.config.gate_threshold {
                info!(
                    confidence = detection.confidence,
                    "input rejected as non-argumentative"
                );
                return Err(AnalysisError::NotArgumentative {
                    confidence: detection.confidence,
                    reasoning: detection.reasoning,
                });
            }
            Some(detection)
        };

        let opts = RunOptions {
            max_chunk_words: self.config.max_chunk_words,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            preferred: request.preferred_provider,
        };
        let (result, chunk_count) = match request.module {
            ModuleKind::Inference => self.run_module(&InferenceAnalyzer, text, &opts).await?,
            ModuleKind::Justification => {
                self.run_module(&JustificationAnalyzer, text, &opts).await?
            }
            ModuleKind::Utility => self.run_module(&UtilityAnalyzer, text, &opts).await?,
            ModuleKind::Integrity => self.run_module(&IntegrityAnalyzer, text, &opts).await?,
            ModuleKind::Continuity => {
                let analyzer = ContinuityAnalyzer::new(references.clone());
                let outcome = run(&analyzer, &self.gateway, text, &opts).await?;
                let mut output = outcome.output;
                output.similarities = self.similarities(text, &references).await?;
                (ModuleResult::from(output), outcome.chunk_count)
            }
        };

        let processing_time_ms = started.elapsed().as_millis() as u64;
        let record = AnalysisRecord {
            id: None,
            module_type: request.module,
            input_text: text.to_string(),
            word_count: words,
            result: result.clone(),
            processing_time_ms,
            created_at: Utc::now(),
        };
        let record_id = match self.records.save(record).await {
            Ok(saved) => saved.id,
            Err(err) => {
                warn!(module = %request.module, error = %err, "failed to persist analysis record");
                None
            }
        };

        info!(
            module = %request.module,
            words,
            chunks = chunk_count,
            elapsed_ms = processing_time_ms,
            "analysis complete"
        );
        Ok(AnalysisOutcome {
            record_id,
            module_type: request.module,
            word_count: words,
            chunk_count,
            processing_time_ms,
            detection,
            result,
        })
    }

    pub async fn process_inference(&self, text: &str) -> Result<AnalysisOutcome, AnalysisError> {
        self.process(AnalysisRequest::new(ModuleKind::Inference, text))
            .await
    }

    pub async fn process_justification(
        &self,
        text: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.process(AnalysisRequest::new(ModuleKind::Justification, text))
            .await
    }

    pub async fn process_utility(&self, text: &str) -> Result<AnalysisOutcome, AnalysisError> {
        self.process(AnalysisRequest::new(ModuleKind::Utility, text))
            .await
    }

    pub async fn process_integrity(&self, text: &str) -> Result<AnalysisOutcome, AnalysisError> {
        self.process(AnalysisRequest::new(ModuleKind::Integrity, text))
            .await
    }

    pub async fn process_continuity(
        &self,
        text: &str,
        references: Vec<ReferenceInput>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.process(AnalysisRequest::new(ModuleKind::Continuity, text).with_references(references))
            .await
    }

    /// Stance extraction alone, without alignment.
    pub async fn extract_stance(&self, text: &str) -> StanceExtraction {
        self.stance.extract(text).await
    }

    /// Extract the text's stance and score it against the stored doctrine.
    pub async fn stance_alignment(&self, text: &str) -> Result<StanceReport, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let extraction = self.stance.extract(text).await;
        let policy = self.policy.get_all().await?;
        let alignment = align(&extraction.tokens, &policy);
        info!(
            source = ?extraction.source,
            score = alignment.composite_score,
            conflicts = alignment.conflicts.len(),
            "doctrine alignment scored"
        );
        Ok(StanceReport {
            extraction,
            alignment,
        })
    }

    pub async fn doctrine(&self) -> Result<DoctrinePolicy, AnalysisError> {
        Ok(self.policy.get_all().await?)
    }

    pub async fn set_doctrine(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<(), AnalysisError> {
        // Stance dimensions only accept their own labels, stored canonically.
        let value = match StanceDimension::from_key(key) {
            Some(dimension) => {
                let label = normalize_label(value);
                let allowed = dimension.labels();
                if !allowed.contains(&label.as_str()) {
                    return Err(AnalysisError::InvalidDoctrine {
                        key: key.to_string(),
                        value: value.to_string(),
                        allowed,
                    });
                }
                label
            }
            None => value.trim().to_string(),
        };
        self.policy.set(key.trim(), &value, description).await?;
        info!(key, value = %value, "doctrine updated");
        Ok(())
    }

    async fn run_module<A>(
        &self,
        analyzer: &A,
        text: &str,
        opts: &RunOptions,
    ) -> Result<(ModuleResult, usize), AnalysisError>
    where
        A: Analyzer,
        A::Output: Into<ModuleResult>,
    {
        let outcome = run(analyzer, &self.gateway, text, opts).await?;
        Ok((outcome.output.into(), outcome.chunk_count))
    }

    async fn resolve_references(
        &self,
        inputs: &[ReferenceInput],
    ) -> Result<Vec<ReferenceText>, AnalysisError> {
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            match input {
                ReferenceInput::Record(id) => {
                    let record = self
                        .records
                        .get_by_id(id)
                        .await?
                        .ok_or_else(|| AnalysisError::ReferenceNotFound(id.clone()))?;
                    resolved.push(ReferenceText {
                        label: id.clone(),
                        text: record.input_text,
                    });
                }
                ReferenceInput::Inline { label, text } => resolved.push(ReferenceText {
                    label: label.clone(),
                    text: text.clone(),
                }),
            }
        }
        Ok(resolved)
    }

    /// Embed the whole text and each reference once.
    async fn similarities(
        &self,
        text: &str,
        references: &[ReferenceText],
    ) -> Result<Vec<ReferenceSimilarity>, AnalysisError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }
        let Some(embedder) = &self.embedder else {
            warn!(
                references = references.len(),
                "no embedding backend configured, skipping similarities"
            );
            return Ok(Vec::new());
        };

        let target = embedder
            .embed(text)
            .await
            .map_err(|e| AnalysisError::Embedding(format!("{e:#}")))?;
        let mut similarities = Vec::with_capacity(references.len());
        for reference in references {
            let vector = embedder
                .embed(&reference.text)
                .await
                .map_err(|e| AnalysisError::Embedding(format!("{e:#}")))?;
            similarities.push(ReferenceSimilarity {
                reference: reference.label.clone(),
                similarity: cosine_similarity(&target, &vector),
            });
        }
        Ok(similarities)
    }
}
