//! Three-tier merge of response candidates.
//!
//! Per status code: an annotation candidate is taken verbatim. Otherwise the
//! [`MergePolicy`] picks the authoritative tier among static analysis and
//! runtime capture, and the other tier may fill gaps in the winner, as far as
//! [`FillDepth`] allows.

use crate::document::Header;
use crate::extractor::{Candidate, Provenance};
use crate::registry::SchemaRegistry;
use crate::schema::{Schema, SchemaKind};
use clap::ValueEnum;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which non-annotation tier is authoritative for a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Static analysis wins; captures fill gaps
    #[default]
    StaticFirst,
    /// Captures win; static analysis fills gaps
    CapturedFirst,
}

/// How much the losing tier may contribute to the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FillDepth {
    /// The winner is taken as is
    None,
    /// Description, examples, headers and missing top-level properties
    #[default]
    Shallow,
    /// As `Shallow`, plus missing properties of nested inline objects
    Deep,
}

/// Final result for one status code.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResponse {
    pub schema: Option<Schema>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub content_type: Option<String>,
    pub headers: IndexMap<String, Header>,
    /// Tier the schema came from
    pub provenance: Provenance,
}

impl MergedResponse {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            schema: candidate.schema.clone(),
            description: candidate.description.clone(),
            examples: candidate.examples.clone(),
            content_type: candidate.content_type.clone(),
            headers: candidate.headers.clone(),
            provenance: candidate.provenance,
        }
    }

    /// Generic success response used when no tier produced anything.
    pub fn placeholder() -> Self {
        Self {
            schema: Some(Schema::object()),
            description: None,
            examples: Vec::new(),
            content_type: None,
            headers: IndexMap::new(),
            provenance: Provenance::Static,
        }
    }
}

#[derive(Default)]
struct Tiers<'a> {
    annotation: Vec<&'a Candidate>,
    static_analysis: Vec<&'a Candidate>,
    capture: Vec<&'a Candidate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger {
    pub policy: MergePolicy,
    pub depth: FillDepth,
}

impl ResultMerger {
    pub fn new(policy: MergePolicy, depth: FillDepth) -> Self {
        Self { policy, depth }
    }

    /// Merges response candidates into one result per status code, in the
    /// order statuses were first proposed.
    ///
    /// Non-response candidates are ignored. With no response candidates at
    /// all, a `"200"` placeholder describing a generic object is returned.
    pub fn merge(
        &self,
        candidates: &[Candidate],
        registry: &SchemaRegistry,
    ) -> IndexMap<String, MergedResponse> {
        let mut by_status: IndexMap<&str, Tiers> = IndexMap::new();
        for candidate in candidates {
            let Some(status) = candidate.status() else {
                continue;
            };
            let tiers = by_status.entry(status).or_default();
            match candidate.provenance {
                Provenance::Annotation => tiers.annotation.push(candidate),
                Provenance::Static => tiers.static_analysis.push(candidate),
                Provenance::Capture => tiers.capture.push(candidate),
            }
        }

        let mut merged = IndexMap::new();
        for (status, tiers) in by_status {
            merged.insert(status.to_string(), self.merge_status(status, tiers, registry));
        }
        if merged.is_empty() {
            debug!("No response candidates, using placeholder");
            merged.insert("200".to_string(), MergedResponse::placeholder());
        }
        merged
    }

    fn merge_status(&self, status: &str, tiers: Tiers<'_>, registry: &SchemaRegistry) -> MergedResponse {
        if let Some(annotated) = tiers.annotation.first() {
            debug!("Status {}: annotation wins", status);
            return MergedResponse::from_candidate(annotated);
        }

        let (preferred, fallback) = match self.policy {
            MergePolicy::StaticFirst => (tiers.static_analysis, tiers.capture),
            MergePolicy::CapturedFirst => (tiers.capture, tiers.static_analysis),
        };
        let mut ordered = preferred.into_iter().chain(fallback);
        let Some(winner) = ordered.next() else {
            return MergedResponse::placeholder();
        };

        let mut result = MergedResponse::from_candidate(winner);
        if self.depth == FillDepth::None {
            return result;
        }
        for loser in ordered {
            self.fill_gaps(&mut result, loser, registry);
        }
        result
    }

    fn fill_gaps(&self, result: &mut MergedResponse, loser: &Candidate, registry: &SchemaRegistry) {
        if result.description.is_none() {
            result.description = loser.description.clone();
        }
        if result.examples.is_empty() {
            result.examples = loser.examples.clone();
        }
        if result.content_type.is_none() {
            result.content_type = loser.content_type.clone();
        }
        for (name, header) in &loser.headers {
            if !result.headers.contains_key(name) {
                result.headers.insert(name.clone(), header.clone());
            }
        }

        let (Some(winner), Some(source)) = (result.schema.as_mut(), loser.schema.as_ref()) else {
            return;
        };
        let Some(source) = registry.resolve(source) else {
            return;
        };
        fill_properties(winner, source, self.depth == FillDepth::Deep, registry);
    }
}

/// Adds properties of `source` missing from `target`. References in the
/// target are never altered; added properties are optional.
fn fill_properties(target: &mut Schema, source: &Schema, deep: bool, registry: &SchemaRegistry) {
    if target.is_reference() || target.kind != Some(SchemaKind::Object) {
        if deep && target.kind == Some(SchemaKind::Array) && source.kind == Some(SchemaKind::Array) {
            if let (Some(items), Some(source_items)) = (target.items.as_mut(), source.items.as_ref()) {
                if let Some(source_items) = registry.resolve(source_items) {
                    fill_properties(items, source_items, deep, registry);
                }
            }
        }
        return;
    }

    for (name, property) in &source.properties {
        match target.properties.get_mut(name) {
            None => {
                target.properties.insert(name.clone(), property.clone());
            }
            Some(existing) if deep => {
                if let Some(source_property) = registry.resolve(property) {
                    fill_properties(existing, source_property, deep, registry);
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(fields: &[(&str, Schema)]) -> Schema {
        let mut schema = Schema::object();
        for (name, field) in fields {
            schema.insert_property(name, field.clone(), true);
        }
        schema
    }

    fn response(schema: Schema, provenance: Provenance) -> Candidate {
        Candidate::response("200", Some(schema), provenance)
    }

    #[test]
    fn test_policy_picks_authoritative_tier() {
        let a = object(&[("a", Schema::string())]);
        let b = object(&[("b", Schema::integer())]);
        let candidates = vec![
            response(a.clone(), Provenance::Static),
            response(b.clone(), Provenance::Capture),
        ];
        let registry = SchemaRegistry::new();

        let merger = ResultMerger::new(MergePolicy::StaticFirst, FillDepth::None);
        assert_eq!(merger.merge(&candidates, &registry)["200"].schema, Some(a));

        let merger = ResultMerger::new(MergePolicy::CapturedFirst, FillDepth::None);
        assert_eq!(merger.merge(&candidates, &registry)["200"].schema, Some(b));
    }

    #[test]
    fn test_annotation_returned_unchanged() {
        let annotated = response(Schema::string(), Provenance::Annotation).with_description("Declared");
        let candidates = vec![
            response(object(&[("x", Schema::string())]), Provenance::Static)
                .with_example(json!({"x": "1"})),
            annotated.clone(),
            response(object(&[("y", Schema::string())]), Provenance::Capture),
        ];
        let registry = SchemaRegistry::new();
        for policy in [MergePolicy::StaticFirst, MergePolicy::CapturedFirst] {
            let merged = ResultMerger::new(policy, FillDepth::Deep).merge(&candidates, &registry);
            let result = &merged["200"];
            assert_eq!(result.schema, Some(Schema::string()));
            assert_eq!(result.description.as_deref(), Some("Declared"));
            assert!(result.examples.is_empty());
            assert_eq!(result.provenance, Provenance::Annotation);
        }
    }

    #[test]
    fn test_placeholder_when_nothing_proposed() {
        let merged = ResultMerger::default().merge(&[], &SchemaRegistry::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["200"].schema, Some(Schema::object()));
    }

    #[test]
    fn test_statuses_merge_independently() {
        let candidates = vec![
            Candidate::response("201", Some(Schema::string()), Provenance::Static),
            Candidate::response("404", None, Provenance::Capture),
            Candidate::response("201", Some(Schema::integer()), Provenance::Annotation),
        ];
        let merged = ResultMerger::default().merge(&candidates, &SchemaRegistry::new());
        let statuses: Vec<&String> = merged.keys().collect();
        assert_eq!(statuses, vec!["201", "404"]);
        assert_eq!(merged["201"].schema, Some(Schema::integer()));
        assert_eq!(merged["404"].schema, None);
    }

    fn nested_candidates() -> Vec<Candidate> {
        let winner = object(&[
            ("id", Schema::integer()),
            ("owner", object(&[("name", Schema::string())])),
        ]);
        let loser = object(&[
            ("id", Schema::integer()),
            ("created", Schema::string()),
            ("owner", object(&[("name", Schema::string()), ("email", Schema::string())])),
        ]);
        vec![
            response(winner, Provenance::Static),
            response(loser, Provenance::Capture)
                .with_description("Observed")
                .with_example(json!({"id": 1})),
        ]
    }

    #[test]
    fn test_fill_depth_none() {
        let merged = ResultMerger::new(MergePolicy::StaticFirst, FillDepth::None)
            .merge(&nested_candidates(), &SchemaRegistry::new());
        let result = &merged["200"];
        let schema = result.schema.as_ref().unwrap();
        assert_eq!(schema.properties.len(), 2);
        assert!(result.description.is_none());
        assert!(result.examples.is_empty());
    }

    #[test]
    fn test_fill_depth_shallow() {
        let merged = ResultMerger::new(MergePolicy::StaticFirst, FillDepth::Shallow)
            .merge(&nested_candidates(), &SchemaRegistry::new());
        let result = &merged["200"];
        let schema = result.schema.as_ref().unwrap();
        let keys: Vec<&String> = schema.properties.keys().collect();
        assert_eq!(keys, vec!["id", "owner", "created"]);
        // filled properties stay optional
        assert_eq!(schema.required, vec!["id", "owner"]);
        assert_eq!(schema.properties["owner"].properties.len(), 1);
        assert_eq!(result.description.as_deref(), Some("Observed"));
        assert_eq!(result.examples, vec![json!({"id": 1})]);
    }

    #[test]
    fn test_fill_depth_deep() {
        let merged = ResultMerger::new(MergePolicy::StaticFirst, FillDepth::Deep)
            .merge(&nested_candidates(), &SchemaRegistry::new());
        let schema = merged["200"].schema.clone().unwrap();
        let owner: Vec<&String> = schema.properties["owner"].properties.keys().collect();
        assert_eq!(owner, vec!["name", "email"]);
        assert_eq!(schema.properties["owner"].required, vec!["name"]);
    }

    #[test]
    fn test_reference_winner_is_never_altered() {
        let mut registry = SchemaRegistry::new();
        let reference = registry.register("User", object(&[("id", Schema::integer())]));
        let candidates = vec![
            response(reference.clone(), Provenance::Static),
            response(object(&[("extra", Schema::string())]), Provenance::Capture),
        ];
        let merged = ResultMerger::new(MergePolicy::StaticFirst, FillDepth::Deep)
            .merge(&candidates, &registry);
        assert_eq!(merged["200"].schema, Some(reference));
        assert_eq!(registry.get("User").unwrap().properties.len(), 1);
    }

    #[test]
    fn test_reference_loser_is_resolved_for_filling() {
        let mut registry = SchemaRegistry::new();
        let reference = registry.register(
            "Observed",
            object(&[("id", Schema::integer()), ("name", Schema::string())]),
        );
        let candidates = vec![
            response(object(&[("id", Schema::integer())]), Provenance::Capture),
            response(reference, Provenance::Static),
        ];
        let merged = ResultMerger::new(MergePolicy::CapturedFirst, FillDepth::Shallow)
            .merge(&candidates, &registry);
        let schema = merged["200"].schema.clone().unwrap();
        assert!(schema.properties.contains_key("name"));
    }
}
