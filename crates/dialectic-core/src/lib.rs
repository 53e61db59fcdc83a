pub mod analysis;
pub mod completion;
pub mod config;
pub mod schema;
pub mod stance;
pub mod text;

pub use analysis::{
    AnalysisRecord, Claim, ContinuityResult, DiagnosticBlock, ExtractedArgument,
    InferenceResult, IntegrityLabel, IntegrityResult, JustificationChain, JustificationResult,
    KnowledgeItem, ModuleKind, ModuleResult, ReferenceSimilarity, ScoreBucket, UtilityMapping,
    UtilityResult,
};
pub use completion::{CompletionRequest, ProviderId};
pub use config::{AnalysisConfig, ConfigError};
pub use schema::tables;
pub use stance::{
    AlignmentOutcome, DimensionCheck, DnCommitment, DoctrineAlignment, DoctrinePolicy,
    ExplanationOrder, LawKind, RegularityRole, StanceDimension, StanceTokens, StanceValue,
    normalize_label,
};
pub use text::{Chunk, chunks, segment, word_count};
