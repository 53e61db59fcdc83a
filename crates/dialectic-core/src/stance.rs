//! Stance tokens, doctrine policy, and alignment result types.
//!
//! A stance is four categorical positions on the nature of laws of nature.
//! Each dimension has a small closed set of values plus an undetermined value
//! (`unclear` or `neutral`) used when neither rules nor model can tell.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four stance dimensions, in scoring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceDimension {
    LawKind,
    ExplanationOrder,
    DnCommitment,
    RegularityRole,
}

impl StanceDimension {
    /// Fixed check order; also the order of conflict and alignment entries.
    pub const ALL: [StanceDimension; 4] = [
        StanceDimension::LawKind,
        StanceDimension::ExplanationOrder,
        StanceDimension::DnCommitment,
        StanceDimension::RegularityRole,
    ];

    /// Policy-store key for this dimension.
    pub fn key(&self) -> &'static str {
        match self {
            Self::LawKind => "law_kind",
            Self::ExplanationOrder => "explanation_order",
            Self::DnCommitment => "dn_commitment",
            Self::RegularityRole => "regularity_role",
        }
    }

    /// Score deducted when the stance contradicts the doctrine.
    pub fn penalty(&self) -> f64 {
        match self {
            Self::LawKind | Self::ExplanationOrder | Self::DnCommitment => 0.4,
            Self::RegularityRole => 0.2,
        }
    }

    /// Dimension stored under a policy key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key.trim())
    }

    /// Determined labels a doctrine may expect on this dimension.
    pub fn labels(&self) -> Vec<&'static str> {
        fn of<V: StanceValue>() -> Vec<&'static str> {
            V::CANDIDATES.iter().map(|c| c.as_str()).collect()
        }
        match self {
            Self::LawKind => of::<LawKind>(),
            Self::ExplanationOrder => of::<ExplanationOrder>(),
            Self::DnCommitment => of::<DnCommitment>(),
            Self::RegularityRole => of::<RegularityRole>(),
        }
    }

    /// Expectation used when the policy has no entry for this dimension.
    pub fn default_expectation(&self) -> &'static str {
        match self {
            Self::LawKind => LawKind::NonHumean.as_str(),
            Self::ExplanationOrder => ExplanationOrder::LawsFirst.as_str(),
            Self::DnCommitment => DnCommitment::Rejects.as_str(),
            Self::RegularityRole => RegularityRole::Evidential.as_str(),
        }
    }
}

impl fmt::Display for StanceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A categorical value on one stance dimension.
pub trait StanceValue: Copy + PartialEq + fmt::Debug + 'static {
    const DIMENSION: StanceDimension;
    /// Determined categories. Earlier entries win scoring ties.
    const CANDIDATES: &'static [Self];
    /// The `unclear` / `neutral` value.
    const UNDETERMINED: Self;

    fn as_str(&self) -> &'static str;

    fn is_determined(&self) -> bool {
        *self != Self::UNDETERMINED
    }

    /// Parse a label, mapping anything unrecognised to [`Self::UNDETERMINED`].
    fn parse_lenient(label: &str) -> Self {
        let label = normalize_label(label);
        Self::CANDIDATES
            .iter()
            .copied()
            .find(|c| c.as_str() == label)
            .unwrap_or(Self::UNDETERMINED)
    }
}

/// Canonical label form: trimmed, lowercase, `-` and spaces as `_`.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Whether laws merely summarise regularities or govern them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawKind {
    Humean,
    NonHumean,
    Unclear,
}

impl StanceValue for LawKind {
    const DIMENSION: StanceDimension = StanceDimension::LawKind;
    const CANDIDATES: &'static [Self] = &[Self::Humean, Self::NonHumean];
    const UNDETERMINED: Self = Self::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Humean => "humean",
            Self::NonHumean => "non_humean",
            Self::Unclear => "unclear",
        }
    }
}

/// Direction of explanation between laws and regularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationOrder {
    /// Laws explain the regularities they produce.
    LawsFirst,
    /// Regularities ground the laws that summarise them.
    RegularitiesFirst,
    Unclear,
}

impl StanceValue for ExplanationOrder {
    const DIMENSION: StanceDimension = StanceDimension::ExplanationOrder;
    const CANDIDATES: &'static [Self] = &[Self::LawsFirst, Self::RegularitiesFirst];
    const UNDETERMINED: Self = Self::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Self::LawsFirst => "laws_first",
            Self::RegularitiesFirst => "regularities_first",
            Self::Unclear => "unclear",
        }
    }
}

/// Commitment to the deductive-nomological model of explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnCommitment {
    Endorses,
    Rejects,
    Neutral,
}

impl StanceValue for DnCommitment {
    const DIMENSION: StanceDimension = StanceDimension::DnCommitment;
    const CANDIDATES: &'static [Self] = &[Self::Endorses, Self::Rejects];
    const UNDETERMINED: Self = Self::Neutral;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Endorses => "endorses",
            Self::Rejects => "rejects",
            Self::Neutral => "neutral",
        }
    }
}

/// Role observed regularities play with respect to laws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularityRole {
    /// Regularities are what laws consist in.
    Constitutive,
    /// Regularities are evidence for laws.
    Evidential,
    Neutral,
}

impl StanceValue for RegularityRole {
    const DIMENSION: StanceDimension = StanceDimension::RegularityRole;
    const CANDIDATES: &'static [Self] = &[Self::Constitutive, Self::Evidential];
    const UNDETERMINED: Self = Self::Neutral;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Constitutive => "constitutive",
            Self::Evidential => "evidential",
            Self::Neutral => "neutral",
        }
    }
}

/// Extracted stance on all four dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceTokens {
    pub law_kind: LawKind,
    pub explanation_order: ExplanationOrder,
    pub dn_commitment: DnCommitment,
    pub regularity_role: RegularityRole,
    /// [0, 1]
    pub confidence: f64,
}

impl StanceTokens {
    /// All dimensions undetermined.
    pub fn undetermined(confidence: f64) -> Self {
        Self {
            law_kind: LawKind::Unclear,
            explanation_order: ExplanationOrder::Unclear,
            dn_commitment: DnCommitment::Neutral,
            regularity_role: RegularityRole::Neutral,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn value(&self, dimension: StanceDimension) -> &'static str {
        match dimension {
            StanceDimension::LawKind => self.law_kind.as_str(),
            StanceDimension::ExplanationOrder => self.explanation_order.as_str(),
            StanceDimension::DnCommitment => self.dn_commitment.as_str(),
            StanceDimension::RegularityRole => self.regularity_role.as_str(),
        }
    }

    pub fn is_determined(&self, dimension: StanceDimension) -> bool {
        match dimension {
            StanceDimension::LawKind => self.law_kind.is_determined(),
            StanceDimension::ExplanationOrder => self.explanation_order.is_determined(),
            StanceDimension::DnCommitment => self.dn_commitment.is_determined(),
            StanceDimension::RegularityRole => self.regularity_role.is_determined(),
        }
    }
}

/// Reference positions keyed by [`StanceDimension::key`].
///
/// Owned by an external store; scoring only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctrinePolicy(BTreeMap<String, String>);

impl DoctrinePolicy {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Expected value for a dimension in canonical label form, falling back
    /// to the dimension's built-in default.
    pub fn expected(&self, dimension: StanceDimension) -> String {
        self.0
            .get(dimension.key())
            .map(|v| normalize_label(v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| dimension.default_expectation().to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl FromIterator<(String, String)> for DoctrinePolicy {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentOutcome {
    Aligned,
    Conflict,
    /// Stance undetermined on this dimension; not scored.
    Skipped,
}

/// Per-dimension comparison detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionCheck {
    pub dimension: StanceDimension,
    pub observed: String,
    pub expected: String,
    pub outcome: AlignmentOutcome,
    pub penalty: f64,
}

/// Result of diffing a stance against a doctrine policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctrineAlignment {
    /// [0, 1]
    pub composite_score: f64,
    pub conflicts: Vec<String>,
    pub alignments: Vec<String>,
    pub dimensions: Vec<DimensionCheck>,
}
