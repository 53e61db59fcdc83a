//! In-process test doubles for backends and stores.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dialectic_core::{AnalysisRecord, CompletionRequest, ProviderId};
use dialectic_store::{RecordStore, StoreError};

use crate::embedding::EmbeddingBackend;
use crate::gateway::{CompletionBackend, Gateway};

static CALL_SEQ: AtomicUsize = AtomicUsize::new(1);

/// Completion backend that replays a script of replies, then a fallback.
pub(crate) struct ScriptedBackend {
    provider: ProviderId,
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    calls: AtomicUsize,
    first_seq: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn build(
        provider: ProviderId,
        script: Vec<Result<String, String>>,
        fallback: Result<String, String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            first_seq: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers `reply`.
    pub(crate) fn ok(provider: ProviderId, reply: &str) -> Arc<Self> {
        Self::build(provider, Vec::new(), Ok(reply.to_string()))
    }

    /// Always fails with `message`.
    pub(crate) fn failing(provider: ProviderId, message: &str) -> Arc<Self> {
        Self::build(provider, Vec::new(), Err(message.to_string()))
    }

    /// Answers `replies` in order, then fails.
    pub(crate) fn replies(provider: ProviderId, replies: &[&str]) -> Arc<Self> {
        Self::build(
            provider,
            replies.iter().map(|r| Ok(r.to_string())).collect(),
            Err("script exhausted".to_string()),
        )
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Global sequence number of this backend's first call; 0 if never called.
    pub(crate) fn first_call_seq(&self) -> usize {
        self.first_seq.load(Ordering::SeqCst)
    }

    /// User prompts received, in call order.
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn invoke(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let seq = CALL_SEQ.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .first_seq
            .compare_exchange(0, seq, Ordering::SeqCst, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(request.user_prompt().to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or_else(|| self.fallback.clone()) {
            Ok(text) => Ok(text),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }
}

/// Build a gateway over scripted backends.
pub(crate) fn gateway_of<'a>(backends: impl IntoIterator<Item = &'a Arc<ScriptedBackend>>) -> Gateway {
    Gateway::new(
        backends
            .into_iter()
            .map(|b| Arc::clone(b) as Arc<dyn CompletionBackend>)
            .collect(),
    )
}

/// Embedder returning the vector of the first needle found in the text.
pub(crate) struct KeywordEmbedder {
    vectors: Vec<(&'static str, Vec<f32>)>,
    fallback: Vec<f32>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn new(vectors: Vec<(&'static str, Vec<f32>)>, fallback: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            vectors,
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingBackend for KeywordEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .vectors
            .iter()
            .find(|(needle, _)| text.contains(needle))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

pub(crate) struct FailingEmbedder;

#[async_trait]
impl EmbeddingBackend for FailingEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding service unreachable")
    }
}

/// Record store whose writes always fail.
pub(crate) struct BrokenRecordStore;

#[async_trait]
impl RecordStore for BrokenRecordStore {
    async fn save(&self, _record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        Err(StoreError::Other("disk full".into()))
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(None)
    }
}
