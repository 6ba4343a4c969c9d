//! Catalog entry type shared by `tools/list` and the CLI.

use std::sync::Arc;

use rmcp::model::JsonObject;
use rmcp::schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// One advertised tool: its name, the CLI grouping it is listed under, the
/// description shown to agents and the JSON schema of its arguments.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub schema: JsonObject,
}

impl ToolMetadata {
    /// Schema in the shared form `rmcp::model::Tool` expects.
    pub fn input_schema(&self) -> Arc<JsonObject> {
        Arc::new(self.schema.clone())
    }
}

/// Generate the argument schema for `T`. Tool schemas must be objects; anything
/// else is logged and replaced by an empty object schema.
pub fn build_schema<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schema_for!(T)) {
        Ok(Value::Object(schema)) => schema,
        Ok(other) => {
            log::error!("Argument schema is not an object: {other}");
            JsonObject::new()
        }
        Err(e) => {
            log::error!("Failed to serialize argument schema: {e}");
            JsonObject::new()
        }
    }
}
