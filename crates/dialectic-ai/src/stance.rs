//! Hybrid stance extraction: regex scoring per dimension, escalating to the
//! model when the rules are not confident enough.

use std::sync::{Arc, OnceLock};

use dialectic_core::{
    CompletionRequest, DnCommitment, ExplanationOrder, LawKind, ProviderId, RegularityRole,
    StanceDimension, StanceTokens, StanceValue,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DetectionError;
use crate::gateway::Gateway;
use crate::reply::Reply;

const NO_MATCH_CONFIDENCE: f64 = 0.3;
const MODEL_DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_STANCE_THRESHOLD: f64 = 0.6;

// ── Rule tables ──
//
// Each category lists independent pattern groups; the score of a category is
// the number of groups that match anywhere in the text.

const LAW_KIND_RULES: &[(LawKind, &[&str])] = &[
    (
        LawKind::Humean,
        &[
            r"(?:^|[^\w-])humean\b|\bhume\b",
            r"\bbest[- ]systems?\b|\bmill[- ]ramsey[- ]lewis\b",
            r"\blaws? (?:are|is) (?:merely |just |simply |only )?(?:summar(?:y|ies)|descriptions?|regularit(?:y|ies))\b",
            r"\bmosaic\b|\bsupervenien(?:ce|t)\b",
        ],
    ),
    (
        LawKind::NonHumean,
        &[
            r"\b(?:non|anti)[- ]humean\b",
            r"\bnecessitat(?:e|es|ed|ing|ion)\b|\barmstrong\b|\bdretske\b|\btooley\b",
            r"\blaws? (?:govern|produce|compel|force)s?\b|\bgoverning laws?\b",
            r"\bdispositional essentialism\b|\bcausal powers?\b|\bprimitivis[mt]\b",
        ],
    ),
];

const EXPLANATION_ORDER_RULES: &[(ExplanationOrder, &[&str])] = &[
    (
        ExplanationOrder::LawsFirst,
        &[
            r"\blaws? (?:explain|ground|account for|govern)s? (?:the |these |our )?(?:regularit|pattern|phenomen)",
            r"\bexplanatory priority (?:of|to) laws?\b|\blaws? (?:are|is) (?:explanatorily |metaphysically )?prior\b",
            r"\bregularit(?:y|ies) (?:are|is) explained by (?:the )?laws?\b",
        ],
    ),
    (
        ExplanationOrder::RegularitiesFirst,
        &[
            r"\bregularit(?:y|ies) (?:explain|ground|come first|are prior|is prior)",
            r"\blaws? (?:are|is) (?:explained|grounded|derived) (?:by|in|from) (?:the )?regularit",
            r"\bbottom[- ]up\b|\bpatterns? first\b",
        ],
    ),
];

const DN_COMMITMENT_RULES: &[(DnCommitment, &[&str])] = &[
    (
        DnCommitment::Endorses,
        &[
            r"\b(?:deductive[- ]nomological|covering[- ]law|d-?n) (?:model|account) (?:is|remains) (?:correct|adequate|right|sound)\b",
            r"\b(?:endorse|defend|accept|adopt)s? (?:the )?(?:d-?n|deductive[- ]nomological|covering[- ]law)\b",
            r"\bexplanation (?:is|as) (?:a |logical )?deduction from laws\b",
        ],
    ),
    (
        DnCommitment::Rejects,
        &[
            r"\b(?:reject|criticis|criticiz|refute|abandon)(?:e|es|s|ed)? (?:the )?(?:d-?n|deductive[- ]nomological|covering[- ]law)\b",
            r"\bflagpole\b|\bbarometer\b|\bhexed salt\b",
            r"\b(?:d-?n|deductive[- ]nomological|covering[- ]law)(?: model| account)? (?:fails|is inadequate|is flawed|cannot)\b",
            r"\bexplanatory (?:asymmetr(?:y|ies)|irrelevance)\b|\basymmetr(?:y|ies) of explanation\b",
        ],
    ),
];

const REGULARITY_ROLE_RULES: &[(RegularityRole, &[&str])] = &[
    (
        RegularityRole::Constitutive,
        &[
            r"\bregularit(?:y|ies) (?:constitute|make up|are constitutive of)\b",
            r"\blaws? (?:just )?(?:are|is) (?:nothing (?:more|over and above) than )?(?:the )?regularit",
            r"\bconstitutive\b",
        ],
    ),
    (
        RegularityRole::Evidential,
        &[
            r"\bregularit(?:y|ies) (?:are|is|provide|serve as) (?:our |the )?(?:evidence|evidential|a guide|indicators?)\b",
            r"\bevidence (?:for|of) (?:the )?laws?\b",
            r"\b(?:infer|discover)(?:s|red)? (?:the )?laws? from\b|\bevidential\b",
        ],
    ),
];

struct CategoryRules<V> {
    value: V,
    groups: Vec<Regex>,
}

fn compile<V: StanceValue>(table: &[(V, &[&str])]) -> Vec<CategoryRules<V>> {
    table
        .iter()
        .map(|(value, patterns)| CategoryRules {
            value: *value,
            groups: patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("valid stance regex"))
                .collect(),
        })
        .collect()
}

static LAW_KIND: OnceLock<Vec<CategoryRules<LawKind>>> = OnceLock::new();
static EXPLANATION_ORDER: OnceLock<Vec<CategoryRules<ExplanationOrder>>> = OnceLock::new();
static DN_COMMITMENT: OnceLock<Vec<CategoryRules<DnCommitment>>> = OnceLock::new();
static REGULARITY_ROLE: OnceLock<Vec<CategoryRules<RegularityRole>>> = OnceLock::new();

/// Winning category and its confidence for one dimension.
///
/// Ties go to the category listed first. No matching group at all yields the
/// undetermined value at confidence 0.3.
fn classify<V: StanceValue>(text: &str, rules: &[CategoryRules<V>]) -> (V, f64) {
    let mut best: Option<(V, usize)> = None;
    for category in rules {
        let matches = category.groups.iter().filter(|re| re.is_match(text)).count();
        if matches > 0 && best.is_none_or(|(_, top)| matches > top) {
            best = Some((category.value, matches));
        }
    }
    match best {
        Some((value, matches)) => (value, (0.6 + 0.1 * matches as f64).min(0.9)),
        None => (V::UNDETERMINED, NO_MATCH_CONFIDENCE),
    }
}

/// Rule-based stance; `confidence` is the mean of the four dimension confidences.
pub fn rule_stance(text: &str) -> StanceTokens {
    let (law_kind, c1) = classify(text, LAW_KIND.get_or_init(|| compile(LAW_KIND_RULES)));
    let (explanation_order, c2) = classify(
        text,
        EXPLANATION_ORDER.get_or_init(|| compile(EXPLANATION_ORDER_RULES)),
    );
    let (dn_commitment, c3) = classify(
        text,
        DN_COMMITMENT.get_or_init(|| compile(DN_COMMITMENT_RULES)),
    );
    let (regularity_role, c4) = classify(
        text,
        REGULARITY_ROLE.get_or_init(|| compile(REGULARITY_ROLE_RULES)),
    );
    StanceTokens {
        law_kind,
        explanation_order,
        dn_commitment,
        regularity_role,
        confidence: (c1 + c2 + c3 + c4) / 4.0,
    }
}

// ── Extraction ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceSource {
    Rules,
    Model,
    /// Model unavailable or unparseable; all dimensions undetermined.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceExtraction {
    pub tokens: StanceTokens,
    pub source: StanceSource,
    /// Aggregate rule confidence that decided whether to escalate.
    pub rule_confidence: f64,
}

fn allowed<V: StanceValue>() -> String {
    V::CANDIDATES
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .chain(std::iter::once(format!("\"{}\"", V::UNDETERMINED.as_str())))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn system_prompt() -> String {
    format!(
        "You identify a text's position in the philosophy of laws of nature. \
Respond with a single JSON object and no other text:\n\
{{\"{}\": {}, \"{}\": {}, \"{}\": {}, \"{}\": {}, \"confidence\": number between 0 and 1}}\n\
Use the undetermined value when the text takes no position on a dimension.",
        StanceDimension::LawKind.key(),
        allowed::<LawKind>(),
        StanceDimension::ExplanationOrder.key(),
        allowed::<ExplanationOrder>(),
        StanceDimension::DnCommitment.key(),
        allowed::<DnCommitment>(),
        StanceDimension::RegularityRole.key(),
        allowed::<RegularityRole>(),
    )
}

fn read_value<V: StanceValue>(reply: &Reply) -> V {
    V::parse_lenient(&reply.text(V::DIMENSION.key()))
}

pub struct StanceExtractor {
    gateway: Arc<Gateway>,
    threshold: f64,
    preferred: Option<ProviderId>,
    temperature: f32,
    max_tokens: u32,
}

impl StanceExtractor {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            threshold: DEFAULT_STANCE_THRESHOLD,
            preferred: None,
            temperature: 0.1,
            max_tokens: 512,
        }
    }

    /// Rule confidence at or above which the model is not consulted.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_preferred(mut self, preferred: Option<ProviderId>) -> Self {
        self.preferred = preferred;
        self
    }

    /// Extract a stance. Never fails; a failed escalation yields an
    /// all-undetermined stance at confidence 0.5.
    pub async fn extract(&self, text: &str) -> StanceExtraction {
        let rules = rule_stance(text);
        let rule_confidence = rules.confidence;
        if rule_confidence >= self.threshold {
            debug!(confidence = rule_confidence, "stance resolved by rules");
            return StanceExtraction {
                tokens: rules,
                source: StanceSource::Rules,
                rule_confidence,
            };
        }

        info!(
            confidence = rule_confidence,
            threshold = self.threshold,
            "stance rules inconclusive, consulting model"
        );
        match self.extract_with_model(text).await {
            Ok(tokens) => StanceExtraction {
                tokens,
                source: StanceSource::Model,
                rule_confidence,
            },
            Err(err) => {
                warn!(error = %err, "stance extraction degraded to undetermined");
                StanceExtraction {
                    tokens: StanceTokens::undetermined(MODEL_DEFAULT_CONFIDENCE),
                    source: StanceSource::Fallback,
                    rule_confidence,
                }
            }
        }
    }

    /// One model call; missing or unknown labels become undetermined.
    pub async fn extract_with_model(&self, text: &str) -> Result<StanceTokens, DetectionError> {
        let request = CompletionRequest::new(
            system_prompt(),
            format!("Text:\n\n{text}"),
            self.temperature,
            self.max_tokens,
        );
        let raw = self.gateway.complete(&request, self.preferred).await?;
        let reply = Reply::parse(&raw)?;
        Ok(StanceTokens {
            law_kind: read_value(&reply),
            explanation_order: read_value(&reply),
            dn_commitment: read_value(&reply),
            regularity_role: read_value(&reply),
            confidence: reply.score("confidence", MODEL_DEFAULT_CONFIDENCE, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBackend, gateway_of};

    const COMMITTED: &str = "We defend a non-Humean view: laws govern and necessitate the \
regularities we observe. Laws explain the regularities, not the reverse. We reject the \
deductive-nomological model; the flagpole case exposes its explanatory asymmetry problem. \
Regularities are our evidence for the laws.";

    fn extractor(backend: &Arc<ScriptedBackend>) -> StanceExtractor {
        StanceExtractor::new(Arc::new(gateway_of([backend])))
    }

    #[test]
    fn rules_classify_committed_text() {
        let tokens = rule_stance(COMMITTED);
        assert_eq!(tokens.law_kind, LawKind::NonHumean);
        assert_eq!(tokens.explanation_order, ExplanationOrder::LawsFirst);
        assert_eq!(tokens.dn_commitment, DnCommitment::Rejects);
        assert_eq!(tokens.regularity_role, RegularityRole::Evidential);
        assert!(tokens.confidence > 0.8);
    }

    #[test]
    fn non_humean_does_not_count_as_humean() {
        let rules = compile(LAW_KIND_RULES);
        let (value, confidence) = classify("A non-Humean account.", &rules);
        assert_eq!(value, LawKind::NonHumean);
        assert!((confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn ties_go_to_first_listed_category() {
        let rules = compile(LAW_KIND_RULES);
        let (value, _) = classify("Some are Humean; others follow Armstrong.", &rules);
        assert_eq!(value, LawKind::Humean);
    }

    #[test]
    fn confidence_capped_at_point_nine() {
        let rules = compile(DN_COMMITMENT_RULES);
        let (value, confidence) = classify(COMMITTED, &rules);
        assert_eq!(value, DnCommitment::Rejects);
        assert!((confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn no_match_is_undetermined() {
        let tokens = rule_stance("The sky is blue.");
        for dimension in StanceDimension::ALL {
            assert!(!tokens.is_determined(dimension));
        }
        assert!((tokens.confidence - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn confident_rules_skip_model() {
        let backend = ScriptedBackend::failing(ProviderId::Anthropic, "unused");
        let extraction = extractor(&backend).extract(COMMITTED).await;
        assert_eq!(extraction.source, StanceSource::Rules);
        assert_eq!(extraction.tokens.law_kind, LawKind::NonHumean);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn low_confidence_escalates_to_model() {
        let backend = ScriptedBackend::ok(
            ProviderId::Anthropic,
            r#"{"law_kind": "Humean", "explanation_order": "regularities-first", "confidence": 0.75}"#,
        );
        let extraction = extractor(&backend).extract("The sky is blue.").await;

        assert_eq!(extraction.source, StanceSource::Model);
        assert_eq!(extraction.tokens.law_kind, LawKind::Humean);
        assert_eq!(
            extraction.tokens.explanation_order,
            ExplanationOrder::RegularitiesFirst
        );
        assert_eq!(extraction.tokens.dn_commitment, DnCommitment::Neutral);
        assert_eq!(extraction.tokens.regularity_role, RegularityRole::Neutral);
        assert_eq!(extraction.tokens.confidence, 0.75);
        assert!((extraction.rule_confidence - 0.3).abs() < 1e-9);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn model_without_confidence_defaults_to_half() {
        let backend = ScriptedBackend::ok(ProviderId::OpenAi, r#"{"dn_commitment": "endorses"}"#);
        let extraction = extractor(&backend).extract("Nothing much here.").await;
        assert_eq!(extraction.tokens.dn_commitment, DnCommitment::Endorses);
        assert_eq!(extraction.tokens.confidence, 0.5);
    }

    #[tokio::test]
    async fn model_failure_degrades_to_undetermined() {
        let backend = ScriptedBackend::failing(ProviderId::OpenAi, "503");
        let extraction = extractor(&backend).extract("The sky is blue.").await;
        assert_eq!(extraction.source, StanceSource::Fallback);
        assert_eq!(extraction.tokens, StanceTokens::undetermined(0.5));
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let backend = ScriptedBackend::ok(ProviderId::OpenAi, "{}");
        let extraction = extractor(&backend)
            .with_threshold(0.95)
            .extract(COMMITTED)
            .await;
        assert_eq!(extraction.source, StanceSource::Model);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn prompt_lists_allowed_labels() {
        let prompt = system_prompt();
        assert!(prompt.contains("\"law_kind\": \"humean\" | \"non_humean\" | \"unclear\""));
        assert!(prompt.contains("\"regularity_role\""));
    }
}
