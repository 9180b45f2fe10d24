//! One generation pass from entry points to an [`ApiDocument`].
//!
//! ```text
//! reset → per entry point: extract → merge → register → transform
//!       → fill examples → components
//! ```

use crate::capture::CaptureStore;
use crate::config::{Exclusions, GeneratorConfig};
use crate::document::{
    status_reason, ApiDocument, MediaType, Operation, Parameter, RequestBody, Response,
};
use crate::entry::EntryPoint;
use crate::error::Result;
use crate::example_generator::ExampleGenerator;
use crate::extractor::{default_plugins, Candidate, ExtractionContext, Plugin, Slot};
use crate::merger::{MergedResponse, ResultMerger};
use crate::pipeline::{Diagnostic, Extraction, PluginPipeline};
use crate::registry::SchemaRegistry;
use crate::resolver::SchemaResolver;
use crate::rules::RuleMapper;
use crate::schema::{Schema, SchemaKind};
use crate::type_index::{RenameRule, TypeIndex};
use indexmap::IndexMap;
use log::{debug, info, warn};

/// Owns the per-pass state: resolver cache, component registry and plugins.
pub struct Generator {
    config: GeneratorConfig,
    exclusions: Exclusions,
    resolver: SchemaResolver,
    registry: SchemaRegistry,
    rules: RuleMapper,
    captures: CaptureStore,
    pipeline: PluginPipeline,
    merger: ResultMerger,
}

impl Generator {
    /// Creates a generator with the built-in plugins registered.
    pub fn new(index: TypeIndex, config: GeneratorConfig) -> Result<Self> {
        let exclusions = config.exclusions()?;
        let mut pipeline = PluginPipeline::new();
        for plugin in default_plugins() {
            pipeline.register(plugin, &config);
        }
        debug!("Plugins: {:?}", pipeline.plugin_names());

        Ok(Self {
            exclusions,
            resolver: SchemaResolver::new(index),
            registry: SchemaRegistry::new(),
            rules: RuleMapper::with_overrides(config.rule_overrides.clone()),
            captures: CaptureStore::new(),
            pipeline,
            merger: ResultMerger::new(config.merge_policy, config.fill_depth),
            config,
        })
    }

    pub fn with_captures(mut self, captures: CaptureStore) -> Self {
        self.captures = captures;
        self
    }

    /// Adds a plugin; `false` when its setup failed.
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> bool {
        self.pipeline.register(plugin, &self.config)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.pipeline.plugin_names()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.pipeline.diagnostics()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Documents every entry point not excluded by configuration.
    ///
    /// State from a previous run is discarded first, so running twice over the
    /// same input gives the same document.
    pub fn run(&mut self, entries: &[EntryPoint]) -> ApiDocument {
        self.resolver.reset();
        self.registry.reset();
        self.pipeline.reset();

        let mut document = ApiDocument::new(
            &self.config.title,
            &self.config.version,
            self.config.description.clone(),
        );

        for entry in entries {
            if self.exclusions.is_excluded(&entry.path) {
                debug!("Skipping excluded entry point {} {}", entry.method.as_str(), entry.path);
                continue;
            }
            if document.operation(&entry.path, entry.method).is_some() {
                warn!(
                    "{} {} is served by more than one handler; keeping {}",
                    entry.method.as_str(),
                    entry.path,
                    entry.id
                );
            }
            let operation = self.document_entry(entry, &mut document);
            document.add_operation(&entry.path, entry.method, operation);
        }

        self.registry.map_schemas(|_, schema| {
            ExampleGenerator::fill_in_place(schema);
        });
        document.components.schemas = self.registry.schemas();

        info!(
            "Documented {} operations with {} components",
            document.operation_count(),
            document.components.schemas.len()
        );
        document
    }

    fn document_entry(&mut self, entry: &EntryPoint, document: &mut ApiDocument) -> Operation {
        debug!("Documenting {} {} ({})", entry.method.as_str(), entry.path, entry.id);
        let extraction = {
            let mut ctx = ExtractionContext {
                entry,
                resolver: &mut self.resolver,
                registry: &mut self.registry,
                rules: &self.rules,
                captures: &self.captures,
                config: &self.config,
            };
            self.pipeline.run(&mut ctx)
        };
        let Extraction {
            request_body,
            mut responses,
            parameters,
            security,
            errors,
        } = extraction;

        let base_name = RenameRule::Pascal.apply(&entry.handler_name);
        let description = entry.handler.as_ref().and_then(|h| h.description());
        let (summary, description) = match description {
            Some(text) => crate::extractor::split_summary(&text),
            None => (None, None),
        };

        let mut operation = Operation {
            summary,
            description,
            operation_id: Some(entry.id.clone()),
            parameters: self.build_parameters(parameters),
            request_body: request_body.map(|body| self.build_request_body(body, &base_name)),
            ..Operation::default()
        };

        responses.extend(errors);
        let mut merged = self.merger.merge(&responses, &self.registry);
        if !merged.keys().any(|status| is_success(status)) {
            let mut with_success = IndexMap::new();
            with_success.insert("200".to_string(), MergedResponse::placeholder());
            with_success.extend(merged);
            merged = with_success;
        }
        merged.sort_keys();
        for (status, response) in merged {
            let response = self.build_response(&status, response, &base_name);
            operation.responses.insert(status, response);
        }

        if let Some(security) = security {
            let mut requirement = IndexMap::new();
            requirement.insert(security.name.clone(), security.scopes);
            operation.security.push(requirement);
            document
                .components
                .security_schemes
                .insert(security.name, security.scheme);
        }

        self.pipeline.transform(operation, entry)
    }

    /// One parameter per (name, location); the first candidate wins.
    fn build_parameters(&self, candidates: Vec<Candidate>) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = Vec::new();
        for candidate in candidates {
            let Slot::Parameter {
                name,
                location,
                required,
            } = candidate.slot
            else {
                continue;
            };
            if parameters
                .iter()
                .any(|p| p.name == name && p.location == location)
            {
                continue;
            }
            let mut schema = candidate.schema.unwrap_or_else(Schema::string);
            ExampleGenerator::fill_in_place(&mut schema);
            parameters.push(Parameter {
                name,
                location,
                required,
                schema,
                description: candidate.description,
            });
        }
        parameters
    }

    fn build_request_body(&mut self, candidate: Candidate, base_name: &str) -> RequestBody {
        let content_type = candidate.content_type_or_default().to_string();
        let schema = candidate.schema.unwrap_or_else(Schema::object);
        let schema = self.name_inline(format!("{}Request", base_name), schema);

        let mut content = IndexMap::new();
        content.insert(
            content_type,
            MediaType {
                schema,
                example: candidate.examples.into_iter().next(),
            },
        );
        RequestBody {
            description: candidate.description,
            required: true,
            content,
        }
    }

    fn build_response(&mut self, status: &str, merged: MergedResponse, base_name: &str) -> Response {
        let mut content = IndexMap::new();
        if let Some(schema) = merged.schema {
            let name = if status == "200" {
                format!("{}Response", base_name)
            } else {
                format!("{}{}Response", base_name, status)
            };
            let schema = self.name_inline(name, schema);
            let content_type = merged
                .content_type
                .unwrap_or_else(|| crate::extractor::DEFAULT_CONTENT_TYPE.to_string());
            content.insert(
                content_type,
                MediaType {
                    schema,
                    example: merged.examples.into_iter().next(),
                },
            );
        }
        Response {
            description: merged
                .description
                .unwrap_or_else(|| status_reason(status).to_string()),
            headers: merged.headers,
            content,
        }
    }

    /// Registers an inline object with properties as a component; everything
    /// else stays inline with its examples filled.
    fn name_inline(&mut self, name: String, mut schema: Schema) -> Schema {
        let is_named_object = schema.kind == Some(SchemaKind::Object)
            && !schema.properties.is_empty()
            && !schema.is_reference();
        if is_named_object {
            return self.registry.register_if_complex(&name, schema);
        }
        ExampleGenerator::fill_in_place(&mut schema);
        schema
    }
}

/// Whether a status describes a non-error outcome.
fn is_success(status: &str) -> bool {
    matches!(status.chars().next(), Some('1' | '2' | '3'))
}
