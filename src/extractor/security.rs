//! Security requirements inferred from authentication extractor arguments.
//!
//! A handler taking `claims: Claims` or
//! `TypedHeader(auth): TypedHeader<Authorization<Bearer>>` is secured by the
//! scheme configured for that type name in `auth_extractors`.

use super::{ExtractionContext, Plugin, Provenance, SecurityCandidate, SecuritySchemeExtractor};
use crate::config::GeneratorConfig;
use crate::document::SecurityScheme;
use crate::error::{Error, Result};
use log::debug;

#[derive(Default)]
pub struct BearerAuthPlugin {
    /// (extractor type name, scheme name, scheme)
    extractors: Vec<(String, String, SecurityScheme)>,
}

impl Plugin for BearerAuthPlugin {
    fn name(&self) -> &str {
        "bearer-auth"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn setup(&mut self, config: &GeneratorConfig) -> Result<()> {
        self.extractors.clear();
        for (type_name, descriptor) in &config.auth_extractors {
            let Some((name, scheme)) = SecurityScheme::parse(descriptor) else {
                return Err(Error::plugin(
                    self.name(),
                    format!("unknown scheme '{}' for extractor {}", descriptor, type_name),
                ));
            };
            self.extractors.push((type_name.clone(), name, scheme));
        }
        debug!("{} auth extractors configured", self.extractors.len());
        Ok(())
    }

    fn security(&self) -> Option<&dyn SecuritySchemeExtractor> {
        Some(self)
    }
}

impl SecuritySchemeExtractor for BearerAuthPlugin {
    fn extract_security(
        &self,
        ctx: &mut ExtractionContext<'_>,
    ) -> Result<Option<SecurityCandidate>> {
        let Some(handler) = &ctx.entry.handler else {
            return Ok(None);
        };
        for arg in handler.argument_types() {
            let matched = self
                .extractors
                .iter()
                .find(|(type_name, _, _)| arg.mentions(type_name));
            if let Some((type_name, name, scheme)) = matched {
                debug!("{}: secured by {} via {}", ctx.entry.id, name, type_name);
                return Ok(Some(SecurityCandidate {
                    name: name.clone(),
                    scheme: scheme.clone(),
                    scopes: Vec::new(),
                    provenance: Provenance::Static,
                }));
            }
        }
        Ok(None)
    }
}
