//! Priority-ordered plugin execution with failure isolation.

use crate::config::GeneratorConfig;
use crate::document::Operation;
use crate::entry::EntryPoint;
use crate::error::Error;
use crate::extractor::{Candidate, ExtractionContext, Plugin, SecurityCandidate};
use log::{debug, warn};
use std::collections::HashSet;

/// Record of a plugin failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub plugin: String,
    /// Entry point being processed, `None` for registration failures
    pub entry_point: Option<String>,
    pub message: String,
}

/// Candidates gathered for one entry point.
#[derive(Debug, Default)]
pub struct Extraction {
    pub request_body: Option<Candidate>,
    pub responses: Vec<Candidate>,
    pub parameters: Vec<Candidate>,
    pub security: Option<SecurityCandidate>,
    pub errors: Vec<Candidate>,
}

/// Registered plugins, kept sorted by priority.
///
/// Plugins with equal priority keep their registration order. A plugin that
/// returns an error while extracting is disabled until [`reset`](Self::reset).
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
    disabled: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets up and inserts a plugin. Returns `false` when setup failed and
    /// the plugin was dropped.
    pub fn register(&mut self, mut plugin: Box<dyn Plugin>, config: &GeneratorConfig) -> bool {
        let name = plugin.name().to_string();
        if let Err(e) = plugin.setup(config) {
            warn!("Dropping plugin {}: {}", name, e);
            self.diagnostics.push(Diagnostic {
                plugin: name,
                entry_point: None,
                message: e.to_string(),
            });
            return false;
        }
        let priority = plugin.priority();
        let position = self
            .plugins
            .iter()
            .position(|p| p.priority() > priority)
            .unwrap_or(self.plugins.len());
        debug!("Registered plugin {} at priority {}", name, priority);
        self.plugins.insert(position, plugin);
        true
    }

    /// Names of registered plugins in execution order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn is_disabled(&self, plugin: &str) -> bool {
        self.disabled.contains(plugin)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Re-enables every plugin and forgets run-time diagnostics.
    /// Registration diagnostics are kept.
    pub fn reset(&mut self) {
        self.disabled.clear();
        self.diagnostics.retain(|d| d.entry_point.is_none());
    }

    /// Runs every capability for one entry point.
    ///
    /// Request body and security take the first non-empty result; responses,
    /// parameters and errors are concatenated in priority order.
    pub fn run(&mut self, ctx: &mut ExtractionContext<'_>) -> Extraction {
        let mut extraction = Extraction::default();
        let entry_id = ctx.entry.id.clone();
        let mut failures = Failures {
            disabled: &mut self.disabled,
            diagnostics: &mut self.diagnostics,
            entry_id: &entry_id,
        };

        for plugin in &self.plugins {
            let Some(extractor) = plugin.request_body() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match extractor.extract_request_body(ctx) {
                Ok(Some(candidate)) => {
                    extraction.request_body = Some(candidate);
                    break;
                }
                Ok(None) => {}
                Err(e) => failures.record(plugin.name(), e),
            }
        }

        for plugin in &self.plugins {
            let Some(extractor) = plugin.responses() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match extractor.extract_responses(ctx) {
                Ok(candidates) => extraction.responses.extend(candidates),
                Err(e) => failures.record(plugin.name(), e),
            }
        }

        for plugin in &self.plugins {
            let Some(extractor) = plugin.parameters() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match extractor.extract_parameters(ctx) {
                Ok(candidates) => extraction.parameters.extend(candidates),
                Err(e) => failures.record(plugin.name(), e),
            }
        }

        for plugin in &self.plugins {
            let Some(extractor) = plugin.security() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match extractor.extract_security(ctx) {
                Ok(Some(candidate)) => {
                    extraction.security = Some(candidate);
                    break;
                }
                Ok(None) => {}
                Err(e) => failures.record(plugin.name(), e),
            }
        }

        for plugin in &self.plugins {
            let Some(extractor) = plugin.errors() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match extractor.extract_errors(ctx) {
                Ok(candidates) => extraction.errors.extend(candidates),
                Err(e) => failures.record(plugin.name(), e),
            }
        }

        extraction
    }

    /// Folds the operation through every transformer. A failing transformer
    /// is skipped and its input passed on unchanged.
    pub fn transform(&mut self, operation: Operation, entry: &EntryPoint) -> Operation {
        let mut failures = Failures {
            disabled: &mut self.disabled,
            diagnostics: &mut self.diagnostics,
            entry_id: &entry.id,
        };
        let mut operation = operation;
        for plugin in &self.plugins {
            let Some(transformer) = plugin.transformer() else {
                continue;
            };
            if failures.is_disabled(plugin.name()) {
                continue;
            }
            match transformer.transform(operation.clone(), entry) {
                Ok(next) => operation = next,
                Err(e) => failures.record(plugin.name(), e),
            }
        }
        operation
    }
}

struct Failures<'a> {
    disabled: &'a mut HashSet<String>,
    diagnostics: &'a mut Vec<Diagnostic>,
    entry_id: &'a str,
}

impl Failures<'_> {
    fn is_disabled(&self, plugin: &str) -> bool {
        self.disabled.contains(plugin)
    }

    fn record(&mut self, plugin: &str, error: Error) {
        warn!(
            "Plugin {} failed on {}, disabling it for this run: {}",
            plugin, self.entry_id, error
        );
        self.disabled.insert(plugin.to_string());
        self.diagnostics.push(Diagnostic {
            plugin: plugin.to_string(),
            entry_point: Some(self.entry_id.to_string()),
            message: error.to_string(),
        });
    }
}
