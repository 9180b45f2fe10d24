//! Declarative annotations from handler doc comments.
//!
//! ```text
//! /// @body CreateUser
//! /// @response 201 User Created
//! /// @response 204 - Nothing to return
//! /// @param page query u32 optional Page number
//! /// @security bearer read:users
//! ```

use super::{
    Candidate, ExtractionContext, ParameterExtractor, Plugin, Provenance, RequestBodyExtractor,
    ResponseExtractor, SecurityCandidate, SecuritySchemeExtractor,
};
use crate::document::SecurityScheme;
use crate::entry::ParameterLocation;
use crate::error::Result;
use crate::schema::Schema;
use log::{debug, warn};

pub struct AnnotationPlugin;

impl Plugin for AnnotationPlugin {
    fn name(&self) -> &str {
        "annotation"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn request_body(&self) -> Option<&dyn RequestBodyExtractor> {
        Some(self)
    }

    fn responses(&self) -> Option<&dyn ResponseExtractor> {
        Some(self)
    }

    fn parameters(&self) -> Option<&dyn ParameterExtractor> {
        Some(self)
    }

    fn security(&self) -> Option<&dyn SecuritySchemeExtractor> {
        Some(self)
    }
}

impl RequestBodyExtractor for AnnotationPlugin {
    fn extract_request_body(&self, ctx: &mut ExtractionContext<'_>) -> Result<Option<Candidate>> {
        let entry = ctx.entry;
        let Some(annotation) = entry.annotations_named("body").next() else {
            return Ok(None);
        };
        let (type_text, description) = split_type(&annotation.value);
        if type_text.is_empty() {
            warn!("{}: @body without a type", entry.id);
            return Ok(None);
        }
        let schema = schema_for_text(ctx, type_text);
        let mut candidate = Candidate::body(schema, Provenance::Annotation);
        if !description.is_empty() {
            candidate = candidate.with_description(description);
        }
        Ok(Some(candidate))
    }
}

impl ResponseExtractor for AnnotationPlugin {
    fn extract_responses(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let entry = ctx.entry;
        let mut candidates = Vec::new();
        for annotation in entry.annotations_named("response") {
            let mut parts = annotation.value.splitn(2, char::is_whitespace);
            let status = parts.next().unwrap_or("");
            if !is_status(status) {
                warn!("{}: ignoring @response with status '{}'", entry.id, status);
                continue;
            }
            let (type_text, description) = split_type(parts.next().unwrap_or(""));
            let schema = match type_text {
                "" | "-" => None,
                text => Some(schema_for_text(ctx, text)),
            };
            let mut candidate = Candidate::response(status, schema, Provenance::Annotation);
            if !description.is_empty() {
                candidate = candidate.with_description(description);
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

impl ParameterExtractor for AnnotationPlugin {
    fn extract_parameters(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let entry = ctx.entry;
        let mut candidates = Vec::new();
        for annotation in entry.annotations_named("param") {
            let mut parts = annotation.value.splitn(3, char::is_whitespace);
            let name = parts.next().unwrap_or("");
            let location = parts.next().and_then(ParameterLocation::parse);
            let (Some(location), false) = (location, name.is_empty()) else {
                warn!("{}: ignoring malformed @param '{}'", entry.id, annotation.value);
                continue;
            };
            let (type_text, rest) = split_type(parts.next().unwrap_or(""));
            let schema = match type_text {
                "" => Schema::string(),
                text => schema_for_text(ctx, text),
            };

            let (mut required, description) = match rest.split_once(char::is_whitespace) {
                Some(("required", tail)) => (true, tail.trim()),
                Some(("optional", tail)) => (false, tail.trim()),
                None if rest == "required" => (true, ""),
                None if rest == "optional" => (false, ""),
                _ => (false, rest),
            };
            if location == ParameterLocation::Path {
                required = true;
            }

            let mut candidate =
                Candidate::parameter(name, location, required, schema, Provenance::Annotation);
            if !description.is_empty() {
                candidate = candidate.with_description(description);
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

impl SecuritySchemeExtractor for AnnotationPlugin {
    fn extract_security(
        &self,
        ctx: &mut ExtractionContext<'_>,
    ) -> Result<Option<SecurityCandidate>> {
        let Some(annotation) = ctx.entry.annotations_named("security").next() else {
            return Ok(None);
        };
        let mut parts = annotation.value.split_whitespace();
        let Some((name, scheme)) = parts.next().and_then(SecurityScheme::parse) else {
            warn!("{}: unknown @security scheme '{}'", ctx.entry.id, annotation.value);
            return Ok(None);
        };
        Ok(Some(SecurityCandidate {
            name,
            scheme,
            scopes: parts.map(str::to_string).collect(),
            provenance: Provenance::Annotation,
        }))
    }
}

fn schema_for_text(ctx: &mut ExtractionContext<'_>, text: &str) -> Schema {
    match ctx.schema_for_name(text) {
        Some(schema) => schema,
        None => {
            debug!("{}: annotated type {} not resolvable", ctx.entry.id, text);
            Schema::object()
        }
    }
}

fn is_status(status: &str) -> bool {
    status == "default"
        || (status.len() == 3
            && status.chars().next().is_some_and(|c| ('1'..='5').contains(&c))
            && status[1..].chars().all(|c| c.is_ascii_digit() || c == 'X' || c == 'x'))
}

/// Splits a leading type expression from the rest of the text. Angle
/// brackets are balanced, so `Page<User, Meta> The page` keeps the whole type.
fn split_type(text: &str) -> (&str, &str) {
    let text = text.trim();
    let mut depth = 0i32;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth <= 0 => {
                return (&text[..index], text[index..].trim());
            }
            _ => {}
        }
    }
    (text, "")
}
