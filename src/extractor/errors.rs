//! Error responses an operation can produce.
//!
//! - `422` when the request body is validated (`@rule` lines, `Json<T>` or
//!   `Form<T>` arguments)
//! - `401` when the operation is secured
//! - every 4xx/5xx `StatusCode::CONSTANT` named in the handler body
//! - `default` carrying the error type of a `Result<_, E>` return
//! - the configured `error_status_codes`, on every operation

use super::typed::status_codes_used;
use super::{Candidate, ErrorSchemaExtractor, ExtractionContext, Plugin, Provenance};
use crate::config::GeneratorConfig;
use crate::entry::EntryPoint;
use crate::error::{Error, Result};
use crate::schema::Schema;
use log::debug;

/// Component describing a plain error body
pub const ERROR_COMPONENT: &str = "ErrorResponse";
/// Component describing a validation failure body
pub const VALIDATION_ERROR_COMPONENT: &str = "ValidationError";

#[derive(Default)]
pub struct ErrorResponsesPlugin {
    configured_codes: Vec<String>,
}

impl Plugin for ErrorResponsesPlugin {
    fn name(&self) -> &str {
        "error-responses"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn setup(&mut self, config: &GeneratorConfig) -> Result<()> {
        for code in &config.error_status_codes {
            let valid = code.len() == 3
                && (code.starts_with('4') || code.starts_with('5'))
                && code.chars().all(|c| c.is_ascii_digit());
            if !valid {
                return Err(Error::plugin(
                    self.name(),
                    format!("'{}' is not an error status code", code),
                ));
            }
        }
        self.configured_codes = config.error_status_codes.clone();
        Ok(())
    }

    fn errors(&self) -> Option<&dyn ErrorSchemaExtractor> {
        Some(self)
    }
}

/// Which body an error status is documented with.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ErrorBody {
    Validation,
    /// The handler's declared error type, or the plain error component
    Handler,
}

impl ErrorSchemaExtractor for ErrorResponsesPlugin {
    fn extract_errors(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let entry = ctx.entry;
        let mut statuses: Vec<(String, ErrorBody)> = Vec::new();
        let mut add = |status: &str, body: ErrorBody| {
            if statuses.iter().all(|(s, _)| s != status) {
                statuses.push((status.to_string(), body));
            }
        };

        if validates_input(entry) {
            add("422", ErrorBody::Validation);
        }
        if is_secured(entry, ctx.config) {
            add("401", ErrorBody::Handler);
        }
        if let Some(handler) = &entry.handler {
            for code in status_codes_used(handler) {
                if code.starts_with('4') || code.starts_with('5') {
                    add(code.as_str(), ErrorBody::Handler);
                }
            }
        }
        let error_type = entry
            .handler
            .as_ref()
            .and_then(|handler| handler.return_type())
            .filter(|returned| returned.name == "Result")
            .and_then(|returned| returned.generic_args.get(1).cloned());
        let declared = match &error_type {
            Some(ty) => ctx.resolver.resolve(ty, ctx.registry),
            None => None,
        };
        if declared.is_some() {
            add("default", ErrorBody::Handler);
        }
        for code in &self.configured_codes {
            add(code.as_str(), ErrorBody::Handler);
        }

        let mut candidates = Vec::with_capacity(statuses.len());
        for (status, body) in statuses {
            let schema = match (body, &declared) {
                (ErrorBody::Validation, _) => ctx
                    .registry
                    .register(VALIDATION_ERROR_COMPONENT, validation_error_body()),
                (ErrorBody::Handler, Some(schema)) => schema.clone(),
                (ErrorBody::Handler, None) => ctx.registry.register(ERROR_COMPONENT, error_body()),
            };
            candidates.push(Candidate::response(&status, Some(schema), Provenance::Static));
        }
        debug!("{}: {} error responses", entry.id, candidates.len());
        Ok(candidates)
    }
}

fn validates_input(entry: &EntryPoint) -> bool {
    entry.has_annotation("rule")
        || entry.handler.as_ref().is_some_and(|handler| {
            handler
                .argument_types()
                .iter()
                .any(|arg| matches!(arg.name.as_str(), "Json" | "Form"))
        })
}

fn is_secured(entry: &EntryPoint, config: &GeneratorConfig) -> bool {
    entry.has_annotation("security")
        || entry.handler.as_ref().is_some_and(|handler| {
            handler.argument_types().iter().any(|arg| {
                config
                    .auth_extractors
                    .keys()
                    .any(|type_name| arg.mentions(type_name))
            })
        })
}

fn error_body() -> Schema {
    let mut schema = Schema::object();
    schema.insert_property("message", Schema::string(), true);
    schema
}

fn validation_error_body() -> Schema {
    let mut schema = error_body();
    schema.insert_property(
        "errors",
        Schema::map(Schema::array(Schema::string())),
        false,
    );
    schema
}
