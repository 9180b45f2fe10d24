//! Operation transformers: tagging and deprecation.

use super::{OperationTransformer, Plugin};
use crate::document::Operation;
use crate::entry::EntryPoint;
use crate::error::Result;

/// Tags from `@tag` annotations, else the first meaningful path segment.
/// A `@summary` annotation replaces the doc-comment summary.
pub struct TagTransformer;

impl Plugin for TagTransformer {
    fn name(&self) -> &str {
        "tags"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn transformer(&self) -> Option<&dyn OperationTransformer> {
        Some(self)
    }
}

impl OperationTransformer for TagTransformer {
    fn transform(&self, mut operation: Operation, entry: &EntryPoint) -> Result<Operation> {
        for annotation in entry.annotations_named("tag") {
            for tag in annotation.value.split(',').map(str::trim) {
                if !tag.is_empty() && !operation.tags.iter().any(|t| t == tag) {
                    operation.tags.push(tag.to_string());
                }
            }
        }
        if operation.tags.is_empty() {
            if let Some(tag) = path_tag(&entry.path) {
                operation.tags.push(tag);
            }
        }

        if let Some(summary) = entry.annotations_named("summary").last() {
            if !summary.value.is_empty() {
                operation.summary = Some(summary.value.clone());
            }
        }
        Ok(operation)
    }
}

/// First path segment that is neither a parameter, `api`, nor a version.
fn path_tag(path: &str) -> Option<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .find(|segment| {
            let is_version = segment.len() > 1
                && segment.starts_with('v')
                && segment[1..].chars().all(|c| c.is_ascii_digit());
            *segment != "api" && !is_version
        })
        .map(str::to_string)
}

/// Marks operations whose handler is `#[deprecated]` or annotated `@deprecated`.
pub struct DeprecationTransformer;

impl Plugin for DeprecationTransformer {
    fn name(&self) -> &str {
        "deprecation"
    }

    fn priority(&self) -> i32 {
        110
    }

    fn transformer(&self) -> Option<&dyn OperationTransformer> {
        Some(self)
    }
}

impl OperationTransformer for DeprecationTransformer {
    fn transform(&self, mut operation: Operation, entry: &EntryPoint) -> Result<Operation> {
        let deprecated = entry.has_annotation("deprecated")
            || entry
                .handler
                .as_ref()
                .is_some_and(|handler| handler.is_deprecated());
        if deprecated {
            operation.deprecated = true;
        }
        Ok(operation)
    }
}
