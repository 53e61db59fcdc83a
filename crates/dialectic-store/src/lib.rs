//! Storage layer: doctrine policy and analysis record stores.
//!
//! Both stores are consumed through async traits so the analysis pipeline
//! never depends on a concrete backend. [`MemoryStore`] is always available;
//! [`DuckStore`] persists to DuckDB behind the `duckdb` feature.

mod batch;
mod error;
mod memory;

pub use batch::{records_from_batch, records_to_batch};
pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use async_trait::async_trait;
use dialectic_core::{AnalysisRecord, DoctrinePolicy};

/// Key/value store holding the reference doctrine.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Snapshot of every policy entry.
    async fn get_all(&self) -> Result<DoctrinePolicy, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace one entry.
    async fn set(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Store of completed analyses.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record, assigning an id if it has none. Returns the stored record.
    async fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError>;
}

/// Assign a fresh UUID v4 when the record has no id yet.
pub(crate) fn with_id(mut record: AnalysisRecord) -> AnalysisRecord {
    if record.id.as_deref().is_none_or(str::is_empty) {
        record.id = Some(uuid::Uuid::new_v4().to_string());
    }
    record
}
