//! Terminal rendering for stored analysis records.
//!
//! History listings go through Arrow's table printer; a single record is
//! shown as a vertical card with the result JSON expanded.

use anyhow::Context;
use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;

const INPUT_PREVIEW_WORDS: usize = 60;

const RECORD_FIELDS: &[&str] = &[
    "module_type",
    "word_count",
    "processing_time_ms",
    "created_at",
];

/// Print record batches as one table.
pub fn print_table(batches: &[RecordBatch]) -> anyhow::Result<()> {
    if batches.iter().all(|b| b.num_rows() == 0) {
        println!("(no records)");
        return Ok(());
    }
    println!("{}", pretty_format_batches(batches)?);
    Ok(())
}

/// Print one row of an `analysis_records` batch as a card.
pub fn print_record_card(batch: &RecordBatch, row: usize) -> anyhow::Result<()> {
    let id = get_utf8(batch, "id", row).unwrap_or_default();
    println!("=== {id} ===");
    println!();

    println!("Record");
    for &name in RECORD_FIELDS {
        if let Some(value) = format_value(batch, name, row)? {
            println!("  {name:<20} {value}");
        }
    }
    println!();

    if let Some(input) = get_utf8(batch, "input_text", row) {
        println!("Input");
        println!("  {}", preview(&input, INPUT_PREVIEW_WORDS));
        println!();
    }

    if let Some(raw) = get_utf8(batch, "result_json", row) {
        let value: serde_json::Value =
            serde_json::from_str(&raw).context("decoding stored result")?;
        println!("Result");
        for line in serde_json::to_string_pretty(&value)?.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}

fn preview(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        words.join(" ")
    } else {
        format!("{} ... ({} words)", words[..max_words].join(" "), words.len())
    }
}

fn format_value(batch: &RecordBatch, name: &str, row: usize) -> anyhow::Result<Option<String>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    if col.is_null(row) {
        return Ok(None);
    }
    let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
    Ok(Some(formatter.value(row).to_string()))
}

fn get_utf8(batch: &RecordBatch, name: &str, row: usize) -> Option<String> {
    let col = batch.column_by_name(name)?;
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|a| a.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|a| a.value(row).to_string())
        })
}
