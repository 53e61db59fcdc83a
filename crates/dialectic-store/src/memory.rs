//! In-process store for doctrine policy and analysis records.

use std::collections::BTreeMap;
use std::sync::RwLock;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dialectic_core::{AnalysisRecord, DoctrinePolicy};
use tracing::debug;

use crate::{PolicyStore, RecordStore, StoreError, records_to_batch, with_id};

#[derive(Debug, Clone)]
struct PolicyEntry {
    value: String,
    description: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Ephemeral store backed by in-memory maps.
///
/// Records keep insertion order, which [`snapshot`](Self::snapshot) preserves.
#[derive(Default)]
pub struct MemoryStore {
    policy: RwLock<BTreeMap<String, PolicyEntry>>,
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the policy with `(key, value)` pairs.
    pub fn with_policy<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let now = Utc::now();
        let policy = entries
            .into_iter()
            .map(|(k, v)| {
                (
                    k.into(),
                    PolicyEntry {
                        value: v.into(),
                        description: None,
                        updated_at: now,
                    },
                )
            })
            .collect();
        Self {
            policy: RwLock::new(policy),
            records: RwLock::default(),
        }
    }

    /// Number of stored analysis records.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        Ok(self.read_records()?.len())
    }

    /// Description attached to a policy entry, if any.
    pub fn description(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_policy()?
            .get(key)
            .and_then(|e| e.description.clone()))
    }

    /// When a policy entry was last written.
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read_policy()?.get(key).map(|e| e.updated_at))
    }

    /// All stored records as one Arrow batch, in insertion order.
    pub fn snapshot(&self) -> Result<RecordBatch, StoreError> {
        records_to_batch(&self.read_records()?)
    }

    fn read_policy(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, PolicyEntry>>, StoreError> {
        self.policy
            .read()
            .map_err(|_| StoreError::Other("policy lock poisoned".into()))
    }

    fn read_records(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<AnalysisRecord>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Other("record lock poisoned".into()))
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn get_all(&self) -> Result<DoctrinePolicy, StoreError> {
        Ok(self
            .read_policy()?
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_policy()?.get(key).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut policy = self
            .policy
            .write()
            .map_err(|_| StoreError::Other("policy lock poisoned".into()))?;
        policy.insert(
            key.to_string(),
            PolicyEntry {
                value: value.to_string(),
                description: description.map(str::to_string),
                updated_at: Utc::now(),
            },
        );
        debug!(key, value, "doctrine entry set");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        let record = with_id(record);
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Other("record lock poisoned".into()))?;
        records.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self
            .read_records()?
            .iter()
            .find(|r| r.id.as_deref() == Some(id))
            .cloned())
    }
}
