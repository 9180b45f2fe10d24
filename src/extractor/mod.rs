//! Capability extractors and the plugins that bundle them.
//!
//! An extractor looks at one entry point and proposes [`Candidate`]s for one
//! facet of the operation: request body, responses, parameters, security or
//! error responses. A [`Plugin`] declares a priority and exposes whichever
//! capabilities it implements; the [`pipeline`](crate::pipeline) runs them.
//!
//! # Built-in plugins
//!
//! - [`annotation::AnnotationPlugin`]: `@body`, `@response`, `@param`, `@security`
//! - [`validation::ValidationRulesPlugin`]: request bodies from `@rule` lines
//! - [`typed::TypedSignaturePlugin`]: handler signatures (`Json<T>`, `Path<T>`, ...)
//! - [`capture::CapturePlugin`]: runtime-observed responses
//! - [`security::BearerAuthPlugin`]: auth extractor arguments
//! - [`errors::ErrorResponsesPlugin`]: error statuses
//! - [`transform::TagTransformer`], [`transform::DeprecationTransformer`]

pub mod annotation;
pub mod capture;
pub mod errors;
pub mod security;
pub mod transform;
pub mod typed;
pub mod validation;

use crate::capture::CaptureStore;
use crate::config::GeneratorConfig;
use crate::document::{Header, Operation, SecurityScheme};
use crate::entry::{EntryPoint, ParameterLocation, TypeInfo};
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::resolver::SchemaResolver;
use crate::rules::RuleMapper;
use crate::schema::Schema;
use indexmap::IndexMap;
use serde_json::Value;

/// Content type assumed when an extractor does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Which analysis produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Declared by the developer; always authoritative
    Annotation,
    /// Inferred from source code
    Static,
    /// Observed at run time
    Capture,
}

/// The part of an operation a candidate describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    RequestBody,
    /// Response for a status code such as `"200"` or `"default"`
    Response(String),
    Parameter {
        name: String,
        location: ParameterLocation,
        required: bool,
    },
}

/// One proposed schema for one slot.
///
/// A `None` schema describes a slot without content, such as a `204`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub slot: Slot,
    pub schema: Option<Schema>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub provenance: Provenance,
    pub content_type: Option<String>,
    pub headers: IndexMap<String, Header>,
}

impl Candidate {
    fn new(slot: Slot, schema: Option<Schema>, provenance: Provenance) -> Self {
        Self {
            slot,
            schema,
            description: None,
            examples: Vec::new(),
            provenance,
            content_type: None,
            headers: IndexMap::new(),
        }
    }

    pub fn body(schema: Schema, provenance: Provenance) -> Self {
        Self::new(Slot::RequestBody, Some(schema), provenance)
    }

    pub fn response(status: &str, schema: Option<Schema>, provenance: Provenance) -> Self {
        Self::new(Slot::Response(status.to_string()), schema, provenance)
    }

    pub fn parameter(
        name: &str,
        location: ParameterLocation,
        required: bool,
        schema: Schema,
        provenance: Provenance,
    ) -> Self {
        Self::new(
            Slot::Parameter {
                name: name.to_string(),
                location,
                required,
            },
            Some(schema),
            provenance,
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.examples.push(example);
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, header: Header) -> Self {
        self.headers.insert(name.to_string(), header);
        self
    }

    /// Status code for response candidates.
    pub fn status(&self) -> Option<&str> {
        match &self.slot {
            Slot::Response(status) => Some(status),
            _ => None,
        }
    }

    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// A security requirement proposed for an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityCandidate {
    /// Name the scheme is registered under in the document
    pub name: String,
    pub scheme: SecurityScheme,
    pub scopes: Vec<String>,
    pub provenance: Provenance,
}

/// Everything an extractor may consult while analysing one entry point.
pub struct ExtractionContext<'a> {
    pub entry: &'a EntryPoint,
    pub resolver: &'a mut SchemaResolver,
    pub registry: &'a mut SchemaRegistry,
    pub rules: &'a RuleMapper,
    pub captures: &'a CaptureStore,
    pub config: &'a GeneratorConfig,
}

impl ExtractionContext<'_> {
    /// Schema for a type, or a generic object when it cannot be resolved.
    pub fn schema_for(&mut self, ty: &TypeInfo) -> Schema {
        self.resolver.resolve_or_object(ty, self.registry)
    }

    /// Schema for a type written as text; `None` when the text is not a type
    /// or the type cannot be resolved.
    pub fn schema_for_name(&mut self, name: &str) -> Option<Schema> {
        self.resolver.resolve_named(name, self.registry)
    }
}

pub trait RequestBodyExtractor {
    fn extract_request_body(&self, ctx: &mut ExtractionContext<'_>) -> Result<Option<Candidate>>;
}

pub trait ResponseExtractor {
    fn extract_responses(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>>;
}

pub trait ParameterExtractor {
    fn extract_parameters(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>>;
}

pub trait SecuritySchemeExtractor {
    fn extract_security(
        &self,
        ctx: &mut ExtractionContext<'_>,
    ) -> Result<Option<SecurityCandidate>>;
}

pub trait ErrorSchemaExtractor {
    fn extract_errors(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>>;
}

/// Rewrites a finished operation. Transformers run as a fold in priority
/// order.
pub trait OperationTransformer {
    fn transform(&self, operation: Operation, entry: &EntryPoint) -> Result<Operation>;
}

/// A unit of extraction logic registered with the pipeline.
///
/// Capability accessors default to `None`; a plugin overrides the ones it
/// implements, usually by returning `Some(self)`.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Lower values run first.
    fn priority(&self) -> i32 {
        100
    }

    /// Called once at registration. An error drops the plugin.
    fn setup(&mut self, _config: &GeneratorConfig) -> Result<()> {
        Ok(())
    }

    fn request_body(&self) -> Option<&dyn RequestBodyExtractor> {
        None
    }

    fn responses(&self) -> Option<&dyn ResponseExtractor> {
        None
    }

    fn parameters(&self) -> Option<&dyn ParameterExtractor> {
        None
    }

    fn security(&self) -> Option<&dyn SecuritySchemeExtractor> {
        None
    }

    fn errors(&self) -> Option<&dyn ErrorSchemaExtractor> {
        None
    }

    fn transformer(&self) -> Option<&dyn OperationTransformer> {
        None
    }
}

/// The plugins a [`Generator`](crate::generator::Generator) starts with.
pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(annotation::AnnotationPlugin),
        Box::new(validation::ValidationRulesPlugin),
        Box::new(typed::TypedSignaturePlugin),
        Box::new(capture::CapturePlugin),
        Box::new(security::BearerAuthPlugin::default()),
        Box::new(errors::ErrorResponsesPlugin::default()),
        Box::new(transform::TagTransformer),
        Box::new(transform::DeprecationTransformer),
    ]
}

/// Doc-comment text split into a summary line and the rest.
pub(crate) fn split_summary(text: &str) -> (Option<String>, Option<String>) {
    let mut parts = text.trim().splitn(2, "\n\n");
    let summary = parts
        .next()
        .map(|s| s.lines().map(str::trim).collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty());
    let rest = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (summary, rest)
}
