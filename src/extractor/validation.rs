//! Request bodies described by validation-rule lines:
//!
//! ```text
//! /// @rule email required|email|max:255
//! /// @rule items.*.sku required|string
//! ```

use super::{Candidate, ExtractionContext, Plugin, Provenance, RequestBodyExtractor};
use crate::error::Result;
use crate::rules::parse_rule_list;
use indexmap::IndexMap;
use log::{debug, warn};

pub struct ValidationRulesPlugin;

impl Plugin for ValidationRulesPlugin {
    fn name(&self) -> &str {
        "validation-rules"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn request_body(&self) -> Option<&dyn RequestBodyExtractor> {
        Some(self)
    }
}

impl RequestBodyExtractor for ValidationRulesPlugin {
    fn extract_request_body(&self, ctx: &mut ExtractionContext<'_>) -> Result<Option<Candidate>> {
        let mut rules: IndexMap<String, Vec<String>> = IndexMap::new();
        for annotation in ctx.entry.annotations_named("rule") {
            let Some((path, list)) = annotation.value.split_once(char::is_whitespace) else {
                warn!("{}: @rule without rules: '{}'", ctx.entry.id, annotation.value);
                continue;
            };
            rules
                .entry(path.to_string())
                .or_default()
                .extend(parse_rule_list(list));
        }
        if rules.is_empty() {
            return Ok(None);
        }

        debug!("{}: {} validated fields", ctx.entry.id, rules.len());
        let schema = ctx.rules.map_all_rules(&rules);
        Ok(Some(Candidate::body(schema, Provenance::Static)))
    }
}
