//! Runtime-observed responses, recorded elsewhere and loaded from JSON.
//!
//! The file is a list of records:
//!
//! ```json
//! [{"path": "/users/:id", "method": "GET",
//!   "responses": {"200": {"example": {"id": 1}, "content_type": "application/json"}}}]
//! ```
//!
//! Each status may carry a schema, a sanitized example, or both. A missing
//! schema is inferred from the example.

use crate::entry::{normalize_path, HttpMethod};
use crate::error::{Error, Result};
use crate::schema::Schema;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// What was observed for one status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl CapturedResponse {
    /// The recorded schema, or one inferred from the example.
    pub fn effective_schema(&self) -> Option<Schema> {
        match (&self.schema, &self.example) {
            (Some(schema), _) => Some(schema.clone()),
            (None, Some(example)) => Some(Schema::infer_from_value(example)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CaptureRecord {
    path: String,
    method: String,
    #[serde(default)]
    responses: IndexMap<String, CapturedResponse>,
}

/// Observed responses keyed by (path template, method).
#[derive(Debug, Clone, Default)]
pub struct CaptureStore {
    entries: HashMap<(String, HttpMethod), IndexMap<String, CapturedResponse>>,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading capture store from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parses the JSON form. Records with an unknown method are skipped.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let records: Vec<CaptureRecord> = serde_json::from_str(content)
            .map_err(|e| Error::SerializationError(format!("capture store: {}", e)))?;
        let mut store = Self::new();
        for record in records {
            let Some(method) = HttpMethod::parse(&record.method) else {
                warn!(
                    "Skipping capture for {} with unknown method {}",
                    record.path, record.method
                );
                continue;
            };
            for (status, response) in record.responses {
                store.record(&record.path, method, &status, response);
            }
        }
        debug!("Loaded captures for {} operations", store.len());
        Ok(store)
    }

    /// Adds or replaces the observation for one status code.
    pub fn record(&mut self, path: &str, method: HttpMethod, status: &str, response: CapturedResponse) {
        self.entries
            .entry((normalize_path(path), method))
            .or_default()
            .insert(status.to_string(), response);
    }

    pub fn lookup(&self, path: &str, method: HttpMethod) -> Option<&IndexMap<String, CapturedResponse>> {
        self.entries.get(&(normalize_path(path), method))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaKind;
    use serde_json::json;

    #[test]
    fn test_load_and_lookup_with_normalized_paths() {
        let store = CaptureStore::from_json_str(
            r#"[
                {"path": "/users/:id", "method": "get",
                 "responses": {"200": {"example": {"id": 7, "name": "Ada"}}}},
                {"path": "/users", "method": "TRACE", "responses": {}}
            ]"#,
        )
        .unwrap();
        assert_eq!(store.len(), 1);
        let responses = store.lookup("/users/{id}", HttpMethod::Get).unwrap();
        let schema = responses["200"].effective_schema().unwrap();
        assert_eq!(schema.kind, Some(SchemaKind::Object));
        assert_eq!(schema.required, vec!["id", "name"]);
    }

    #[test]
    fn test_explicit_schema_wins_over_example() {
        let response = CapturedResponse {
            schema: Some(Schema::string()),
            example: Some(json!(42)),
            content_type: None,
        };
        assert_eq!(response.effective_schema(), Some(Schema::string()));
        assert_eq!(CapturedResponse::default().effective_schema(), None);
    }

    #[test]
    fn test_malformed_store_is_an_error() {
        assert!(CaptureStore::from_json_str("{not json").is_err());
    }
}
