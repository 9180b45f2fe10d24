//! Responses observed at run time, read from the [`CaptureStore`](crate::capture::CaptureStore).

use super::{Candidate, ExtractionContext, Plugin, Provenance, ResponseExtractor};
use crate::error::Result;
use log::debug;

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn name(&self) -> &str {
        "capture"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn responses(&self) -> Option<&dyn ResponseExtractor> {
        Some(self)
    }
}

impl ResponseExtractor for CapturePlugin {
    fn extract_responses(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let entry = ctx.entry;
        let Some(observed) = ctx.captures.lookup(&entry.path, entry.method) else {
            return Ok(Vec::new());
        };
        debug!("{}: {} captured responses", entry.id, observed.len());

        let candidates = observed
            .iter()
            .map(|(status, response)| {
                let mut candidate = Candidate::response(
                    status,
                    response.effective_schema(),
                    Provenance::Capture,
                );
                if let Some(example) = &response.example {
                    candidate = candidate.with_example(example.clone());
                }
                if let Some(content_type) = &response.content_type {
                    candidate = candidate.with_content_type(content_type);
                }
                candidate
            })
            .collect();
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureStore, CapturedResponse};
    use crate::config::GeneratorConfig;
    use crate::entry::{EntryPoint, HttpMethod};
    use crate::registry::SchemaRegistry;
    use crate::resolver::SchemaResolver;
    use crate::rules::RuleMapper;
    use crate::schema::SchemaKind;
    use crate::type_index::TypeIndex;
    use serde_json::json;

    fn extract(entry: &EntryPoint, captures: &CaptureStore) -> Vec<Candidate> {
        let mut resolver = SchemaResolver::new(TypeIndex::default());
        let mut registry = SchemaRegistry::new();
        let rules = RuleMapper::new();
        let config = GeneratorConfig::default();
        let mut ctx = ExtractionContext {
            entry,
            resolver: &mut resolver,
            registry: &mut registry,
            rules: &rules,
            captures,
            config: &config,
        };
        CapturePlugin.extract_responses(&mut ctx).unwrap()
    }

    #[test]
    fn test_captured_example_becomes_candidate() {
        let mut captures = CaptureStore::new();
        captures.record(
            "/users/:id",
            HttpMethod::Get,
            "200",
            CapturedResponse {
                schema: None,
                example: Some(json!({"id": 7, "name": "Ada"})),
                content_type: None,
            },
        );
        let entry = EntryPoint::new(HttpMethod::Get, "/users/{id}", "get_user");
        let candidates = extract(&entry, &captures);

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.provenance, Provenance::Capture);
        assert_eq!(candidate.examples, vec![json!({"id": 7, "name": "Ada"})]);
        let schema = candidate.schema.as_ref().unwrap();
        assert_eq!(schema.properties["id"].kind, Some(SchemaKind::Integer));
    }

    #[test]
    fn test_other_method_not_matched() {
        let mut captures = CaptureStore::new();
        captures.record("/users", HttpMethod::Get, "200", CapturedResponse::default());
        let entry = EntryPoint::new(HttpMethod::Post, "/users", "create_user");
        assert!(extract(&entry, &captures).is_empty());
    }
}
