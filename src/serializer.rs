//! Serialization of generated documents to YAML or JSON.
//!
//! The in-memory [`ApiDocument`] already carries OpenAPI 3.0 field names, so
//! both formats are straight serde passes.

use crate::document::ApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML.
pub fn serialize_yaml(doc: &ApiDocument) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes a document to pretty-printed JSON.
pub fn serialize_json(doc: &ApiDocument) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes serialized content to `path`, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
