//! Module result shapes and the persisted analysis record.
//!
//! Every analysis module produces one closed variant of [`ModuleResult`].
//! Scores are always populated: a result built from a malformed backend reply
//! carries defaults, never missing values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five analysis modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Inference,
    Justification,
    Utility,
    Integrity,
    Continuity,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 5] = [
        ModuleKind::Inference,
        ModuleKind::Justification,
        ModuleKind::Utility,
        ModuleKind::Integrity,
        ModuleKind::Continuity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Justification => "justification",
            Self::Utility => "utility",
            Self::Integrity => "integrity",
            Self::Continuity => "continuity",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inference" => Ok(Self::Inference),
            "justification" => Ok(Self::Justification),
            "utility" => Ok(Self::Utility),
            "integrity" => Ok(Self::Integrity),
            "continuity" => Ok(Self::Continuity),
            other => Err(format!("unknown module type: {other}")),
        }
    }
}

/// Qualitative tier of an averaged score.
///
/// Boundaries are shared by every module: `> 0.7` is high, `> 0.5` moderate,
/// anything else low. Each module words the tiers its own way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBucket {
    High,
    Moderate,
    Low,
}

impl ScoreBucket {
    /// Bucket a score on the unit interval.
    pub fn of(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.5 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

// ── Inference ──

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedArgument {
    pub premises: Vec<String>,
    pub conclusion: String,
    /// e.g. "deductive", "inductive", "abductive".
    pub inference_type: String,
    /// Support the premises lend the conclusion, in [0, 1].
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub arguments: Vec<ExtractedArgument>,
    /// [0, 1]
    pub coherence_score: f64,
    /// [0, 1]
    pub overall_strength: f64,
    pub summary: String,
}

// ── Justification ──

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Claim {
    pub text: String,
    /// e.g. "thesis", "premise", "assumption".
    pub role: String,
    pub justified: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JustificationChain {
    pub claim: String,
    pub support: Vec<String>,
    /// Where the chain ends: "foundational", "circular", "infinite", "unsupported".
    pub terminus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustificationResult {
    pub claims: Vec<Claim>,
    pub justification_chains: Vec<JustificationChain>,
    pub weaknesses: Vec<String>,
    /// [0, 1]
    pub justification_score: f64,
    pub foundation_type: String,
    pub assessment: String,
}

// ── Utility ──

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeItem {
    pub statement: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityMapping {
    pub knowledge: String,
    pub application: String,
    /// [0, 10]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityResult {
    pub knowledge_items: Vec<KnowledgeItem>,
    pub mappings: Vec<UtilityMapping>,
    /// [0, 10]
    pub utility_score: f64,
    pub practical_value: String,
}

// ── Integrity ──

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticBlock {
    pub dimension: String,
    /// [0, 1]
    pub score: f64,
    pub finding: String,
}

/// Categorical integrity tier derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityLabel {
    High,
    Partial,
    Low,
}

impl IntegrityLabel {
    /// `>= 0.80` high, `>= 0.50` partial, otherwise low.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            Self::High
        } else if score >= 0.50 {
            Self::Partial
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Partial => "partial",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub diagnostics: Vec<DiagnosticBlock>,
    pub limitations: Vec<String>,
    /// [0, 1]
    pub composite_score: f64,
    pub label: IntegrityLabel,
    pub judgment: String,
    pub representative_example: String,
}

// ── Continuity ──

/// Embedding similarity between the analysed text and one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSimilarity {
    /// Record id, or a positional label for inline references.
    pub reference: String,
    /// Cosine similarity in [-1, 1].
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityResult {
    pub similarities: Vec<ReferenceSimilarity>,
    pub shared_themes: Vec<String>,
    pub divergences: Vec<String>,
    /// [0, 1]
    pub continuity_score: f64,
    pub completeness: String,
    pub narrative: String,
}

/// One synthesized module result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module_type", rename_all = "snake_case")]
pub enum ModuleResult {
    Inference(InferenceResult),
    Justification(JustificationResult),
    Utility(UtilityResult),
    Integrity(IntegrityResult),
    Continuity(ContinuityResult),
}

impl ModuleResult {
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Inference(_) => ModuleKind::Inference,
            Self::Justification(_) => ModuleKind::Justification,
            Self::Utility(_) => ModuleKind::Utility,
            Self::Integrity(_) => ModuleKind::Integrity,
            Self::Continuity(_) => ModuleKind::Continuity,
        }
    }
}

impl From<InferenceResult> for ModuleResult {
    fn from(r: InferenceResult) -> Self {
        Self::Inference(r)
    }
}

impl From<JustificationResult> for ModuleResult {
    fn from(r: JustificationResult) -> Self {
        Self::Justification(r)
    }
}

impl From<UtilityResult> for ModuleResult {
    fn from(r: UtilityResult) -> Self {
        Self::Utility(r)
    }
}

impl From<IntegrityResult> for ModuleResult {
    fn from(r: IntegrityResult) -> Self {
        Self::Integrity(r)
    }
}

impl From<ContinuityResult> for ModuleResult {
    fn from(r: ContinuityResult) -> Self {
        Self::Continuity(r)
    }
}

/// A completed analysis as handed to the record store.
///
/// `id` is `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Option<String>,
    pub module_type: ModuleKind,
    pub input_text: String,
    pub word_count: usize,
    pub result: ModuleResult,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries_are_exclusive() {
        assert_eq!(ScoreBucket::of(0.71), ScoreBucket::High);
        assert_eq!(ScoreBucket::of(0.7), ScoreBucket::Moderate);
        assert_eq!(ScoreBucket::of(0.51), ScoreBucket::Moderate);
        assert_eq!(ScoreBucket::of(0.5), ScoreBucket::Low);
        assert_eq!(ScoreBucket::of(0.0), ScoreBucket::Low);
    }

    #[test]
    fn integrity_label_boundaries_are_inclusive() {
        assert_eq!(IntegrityLabel::from_score(0.80), IntegrityLabel::High);
        assert_eq!(IntegrityLabel::from_score(0.79), IntegrityLabel::Partial);
        assert_eq!(IntegrityLabel::from_score(0.50), IntegrityLabel::Partial);
        assert_eq!(IntegrityLabel::from_score(0.49), IntegrityLabel::Low);
    }

    #[test]
    fn module_kind_parses_case_insensitively() {
        assert_eq!("Integrity".parse::<ModuleKind>(), Ok(ModuleKind::Integrity));
        assert!("rhetoric".parse::<ModuleKind>().is_err());
        for kind in ModuleKind::ALL {
            assert_eq!(kind.as_str().parse::<ModuleKind>(), Ok(kind));
        }
    }

    #[test]
    fn module_result_tagged_by_module_type() {
        let result = ModuleResult::from(UtilityResult {
            knowledge_items: vec![],
            mappings: vec![],
            utility_score: 6.5,
            practical_value: "Useful for policy design.".into(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["module_type"], "utility");
        assert_eq!(json["utility_score"], 6.5);
        assert_eq!(result.kind(), ModuleKind::Utility);

        let parsed: ModuleResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, result);
    }
}
