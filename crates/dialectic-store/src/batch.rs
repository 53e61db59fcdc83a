//! Conversion between [`AnalysisRecord`]s and Arrow record batches.
//!
//! Batches follow [`tables::analysis_records_schema`]. Module results travel
//! as JSON text so the table layout stays flat.

use std::sync::Arc;

use arrow::array::{Array, Int32Array, Int64Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use dialectic_core::{AnalysisRecord, ModuleKind, ModuleResult, tables};

use crate::StoreError;

/// Build one batch from a slice of stored records. Every record must have an id.
pub fn records_to_batch(records: &[AnalysisRecord]) -> Result<RecordBatch, StoreError> {
    let mut ids = Vec::with_capacity(records.len());
    let mut module_types = Vec::with_capacity(records.len());
    let mut inputs = Vec::with_capacity(records.len());
    let mut word_counts = Vec::with_capacity(records.len());
    let mut results = Vec::with_capacity(records.len());
    let mut timings = Vec::with_capacity(records.len());
    let mut created = Vec::with_capacity(records.len());

    for record in records {
        ids.push(record.id.clone().ok_or(StoreError::MissingId)?);
        module_types.push(record.module_type.as_str());
        inputs.push(record.input_text.as_str());
        word_counts.push(record.word_count as i64);
        results.push(serde_json::to_string(&record.result)?);
        timings.push(record.processing_time_ms as i64);
        created.push(record.created_at.to_rfc3339());
    }

    let batch = RecordBatch::try_new(
        Arc::new(tables::analysis_records_schema()),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(module_types)),
            Arc::new(StringArray::from(inputs)),
            Arc::new(Int64Array::from(word_counts)),
            Arc::new(StringArray::from(results)),
            Arc::new(Int64Array::from(timings)),
            Arc::new(StringArray::from(created)),
        ],
    )?;
    Ok(batch)
}

/// Decode every row of a batch into records.
///
/// Accepts `Utf8` or `LargeUtf8` text columns and `Int64` or `Int32` counts,
/// which covers what DuckDB hands back.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<AnalysisRecord>, StoreError> {
    let col = |name: &str| {
        batch
            .column_by_name(name)
            .ok_or_else(|| StoreError::Corrupt(format!("missing '{name}' column")))
    };
    let id_col = col("id")?;
    let module_col = col("module_type")?;
    let input_col = col("input_text")?;
    let words_col = col("word_count")?;
    let result_col = col("result_json")?;
    let timing_col = col("processing_time_ms")?;
    let created_col = col("created_at")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let required = |c: &Arc<dyn Array>, name: &str| {
            get_string(c.as_ref(), row)
                .ok_or_else(|| StoreError::Corrupt(format!("null {name} at row {row}")))
        };

        let id = required(id_col, "id")?;
        let module_type: ModuleKind = required(module_col, "module_type")?
            .parse()
            .map_err(StoreError::Corrupt)?;
        let result: ModuleResult = serde_json::from_str(&required(result_col, "result_json")?)?;
        let created_at = DateTime::parse_from_rfc3339(&required(created_col, "created_at")?)
            .map_err(|e| StoreError::Corrupt(format!("created_at at row {row}: {e}")))?
            .with_timezone(&Utc);

        records.push(AnalysisRecord {
            id: Some(id),
            module_type,
            input_text: required(input_col, "input_text")?,
            word_count: get_i64(words_col.as_ref(), row).unwrap_or(0).max(0) as usize,
            result,
            processing_time_ms: get_i64(timing_col.as_ref(), row).unwrap_or(0).max(0) as u64,
            created_at,
        });
    }
    Ok(records)
}

pub(crate) fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

fn get_i64(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .map(|arr| arr.value(row))
        .or_else(|| {
            col.as_any()
                .downcast_ref::<Int32Array>()
                .map(|arr| arr.value(row) as i64)
        })
}
