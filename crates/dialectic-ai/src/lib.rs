//! LLM orchestration layer: provider failover, chunked module analysis,
//! argument gating, stance extraction, and doctrine alignment.

pub mod analyst;
mod analyzers;
pub mod doctrine;
pub mod embedding;
mod error;
pub mod gate;
pub mod gateway;
pub mod providers;
mod reply;
pub mod stance;

#[cfg(test)]
mod test_support;

pub use analyst::{AnalysisOutcome, AnalysisRequest, Analyst, ReferenceInput, StanceReport};
pub use doctrine::align;
pub use embedding::{EmbeddingBackend, cosine_similarity};
pub use error::{AnalysisError, DetectionError};
pub use gate::{ArgumentDetection, ArgumentGate, DetectionSource};
pub use gateway::{CompletionBackend, Gateway, GatewayError, strip_code_fence};
pub use reply::ReplyError;
pub use stance::{StanceExtraction, StanceExtractor, StanceSource};
