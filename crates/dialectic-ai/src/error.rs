use dialectic_core::ModuleKind;
use dialectic_store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::reply::ReplyError;

/// Unrecoverable failure of a module analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("input is {words} words; the limit is {limit}")]
    OverLength { words: usize, limit: usize },

    #[error("input is not argumentative (confidence {confidence:.2}): {reasoning}")]
    NotArgumentative { confidence: f64, reasoning: String },

    #[error(transparent)]
    Backend(#[from] GatewayError),

    #[error("malformed {module} reply for chunk {chunk}: {source}")]
    MalformedReply {
        module: ModuleKind,
        chunk: usize,
        #[source]
        source: ReplyError,
    },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("reference record not found: {0}")]
    ReferenceNotFound(String),

    #[error("doctrine value '{value}' is not valid for {key}; expected one of: {}", allowed.join(", "))]
    InvalidDoctrine {
        key: String,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure of an advisory detector (argument gate, stance model fallback).
///
/// Callers resolve it to a permissive default rather than failing the request.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Backend(#[from] GatewayError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}
