/// Arrow schema definitions for persisted analysis tables.
pub mod tables {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema for the `analysis_records` table.
    ///
    /// `result_json` holds the serialized module result; `created_at` is an
    /// RFC 3339 timestamp string.
    pub fn analysis_records_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("module_type", DataType::Utf8, false),
            Field::new("input_text", DataType::Utf8, false),
            Field::new("word_count", DataType::Int64, false),
            Field::new("result_json", DataType::Utf8, false),
            Field::new("processing_time_ms", DataType::Int64, false),
            Field::new("created_at", DataType::Utf8, false),
        ])
    }

    /// Schema for the `doctrine_policy` key/value table.
    pub fn doctrine_policy_schema() -> Schema {
        Schema::new(vec![
            Field::new("key", DataType::Utf8, false),
            Field::new("value", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, true),
            Field::new("updated_at", DataType::Utf8, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::tables;

    #[test]
    fn analysis_records_schema_has_expected_fields() {
        let schema = tables::analysis_records_schema();
        assert_eq!(schema.fields().len(), 7);
        assert!(schema.field_with_name("result_json").is_ok());
        assert!(!schema.field_with_name("id").unwrap().is_nullable());
    }

    #[test]
    fn doctrine_policy_description_is_nullable() {
        let schema = tables::doctrine_policy_schema();
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.field_with_name("description").unwrap().is_nullable());
    }
}
