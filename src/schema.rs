use crate::models::ConversionOutcome;
use anyhow::{Context, Result};
use schemars::schema_for;

/// JSON Schema of the document printed by `--json`.
pub fn result_schema() -> Result<String> {
    let schema = schema_for!(ConversionOutcome);
    serde_json::to_string_pretty(&schema).context("Failed to serialize result schema")
}
