//! DuckDB-backed doctrine policy and analysis record store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use dialectic_core::{AnalysisRecord, DoctrinePolicy};
use duckdb::{Connection, params};
use tracing::info;

use crate::batch::get_string;
use crate::{PolicyStore, RecordStore, StoreError, records_from_batch, with_id};

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS doctrine_policy (
        key          VARCHAR PRIMARY KEY,
        value        VARCHAR NOT NULL,
        description  VARCHAR,
        updated_at   VARCHAR NOT NULL
    );
    CREATE TABLE IF NOT EXISTS analysis_records (
        id                  VARCHAR PRIMARY KEY,
        module_type         VARCHAR NOT NULL,
        input_text          VARCHAR NOT NULL,
        word_count          BIGINT  NOT NULL,
        result_json         VARCHAR NOT NULL,
        processing_time_ms  BIGINT  NOT NULL,
        created_at          VARCHAR NOT NULL
    );";

/// DuckDB store for doctrine policy and analysis history.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Tables are created on open, so a fresh file is usable immediately.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened analysis store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of rows in the `analysis_records` table.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        let batches = self.query_arrow("SELECT count(*)::BIGINT AS cnt FROM analysis_records")?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    /// Records for one module, newest first.
    pub fn records_for_module(
        &self,
        module_type: dialectic_core::ModuleKind,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis_records WHERE module_type = ? ORDER BY created_at DESC",
        )?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([module_type.as_str()])?.collect();
        let mut records = Vec::new();
        for batch in &batches {
            records.extend(records_from_batch(batch)?);
        }
        Ok(records)
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("connection lock poisoned".into()))
    }
}

#[async_trait]
impl PolicyStore for DuckStore {
    async fn get_all(&self) -> Result<DoctrinePolicy, StoreError> {
        let batches = self.query_arrow("SELECT key, value FROM doctrine_policy ORDER BY key")?;
        let mut entries = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                let key = get_string(batch.column(0).as_ref(), row);
                let value = get_string(batch.column(1).as_ref(), row);
                if let (Some(key), Some(value)) = (key, value) {
                    entries.push((key, value));
                }
            }
        }
        Ok(entries.into_iter().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM doctrine_policy WHERE key = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([key])?.collect();
        Ok(batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .and_then(|b| get_string(b.column(0).as_ref(), 0)))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO doctrine_policy (key, value, description, updated_at)
             VALUES (?, ?, ?, ?)",
            params![key, value, description, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for DuckStore {
    async fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        let record = with_id(record);
        let id = record.id.clone().ok_or(StoreError::MissingId)?;
        let result_json = serde_json::to_string(&record.result)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO analysis_records (
                id, module_type, input_text, word_count, result_json,
                processing_time_ms, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                record.module_type.as_str(),
                record.input_text,
                record.word_count as i64,
                result_json,
                record.processing_time_ms as i64,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM analysis_records WHERE id = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([id])?.collect();
        for batch in &batches {
            if let Some(record) = records_from_batch(batch)?.into_iter().next() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialectic_core::{ModuleKind, ModuleResult, UtilityResult};

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            id: None,
            module_type: ModuleKind::Utility,
            input_text: "Knowing the boiling point helps cooks at altitude.".into(),
            word_count: 8,
            result: ModuleResult::Utility(UtilityResult {
                knowledge_items: vec![],
                mappings: vec![],
                utility_score: 7.0,
                practical_value: "Cooking guidance.".into(),
            }),
            processing_time_ms: 15,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_fetch_in_memory() {
        let store = DuckStore::open().unwrap();
        let saved = store.save(record()).await.unwrap();
        let id = saved.id.clone().unwrap();

        let fetched = store.get_by_id(&id).await.unwrap().expect("record present");
        assert_eq!(fetched.result, saved.result);
        assert_eq!(fetched.module_type, ModuleKind::Utility);
        assert_eq!(store.record_count().unwrap(), 1);
        assert!(store.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn policy_upsert_replaces_value() {
        let store = DuckStore::open().unwrap();
        store.set("law_kind", "humean", None).await.unwrap();
        store
            .set("law_kind", "non_humean", Some("revised"))
            .await
            .unwrap();

        assert_eq!(
            store.get("law_kind").await.unwrap().as_deref(),
            Some("non_humean")
        );
        assert_eq!(store.get("absent").await.unwrap(), None);
        assert_eq!(store.get_all().await.unwrap().entries().len(), 1);
    }

    #[tokio::test]
    async fn persistent_store_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("history.duckdb");

        let store = DuckStore::open_persistent(&db_path).unwrap();
        let saved = store.save(record()).await.unwrap();
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        let id = saved.id.unwrap();
        assert!(store.get_by_id(&id).await.unwrap().is_some());
        assert_eq!(store.records_for_module(ModuleKind::Utility).unwrap().len(), 1);
    }
}
