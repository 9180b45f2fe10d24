//! Generation settings, loadable from a YAML or JSON file.

use crate::error::{Error, Result};
use crate::merger::{FillDepth, MergePolicy};
use crate::parser::ParseCache;
use crate::rules::RuleFragment;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for one generation pass.
///
/// Every field has a default, so a configuration file only needs the keys it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Title of the generated document
    pub title: String,
    /// Version of the documented API
    pub version: String,
    pub description: Option<String>,
    /// Which of static analysis and runtime capture wins a status code
    pub merge_policy: MergePolicy,
    /// How far the losing tier may fill gaps in the winner's schema
    pub fill_depth: FillDepth,
    /// Extra or replacement rule-name → schema fragment entries
    pub rule_overrides: IndexMap<String, RuleFragment>,
    /// Glob patterns for entry-point paths and source files to skip
    /// (`*` within a segment, `**` across segments)
    pub exclude: Vec<String>,
    /// Handler argument type names that imply authentication, mapped to the
    /// scheme they require (`bearer`, `basic` or `apikey:<header>`)
    pub auth_extractors: IndexMap<String, String>,
    /// Status codes documented as errors on every operation
    pub error_status_codes: Vec<String>,
    /// Maximum number of parsed files kept in memory
    pub parse_cache_capacity: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let mut auth_extractors = IndexMap::new();
        for name in ["Bearer", "BearerToken", "Claims", "AuthUser", "CurrentUser", "Jwt"] {
            auth_extractors.insert(name.to_string(), "bearer".to_string());
        }
        auth_extractors.insert("Basic".to_string(), "basic".to_string());

        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            merge_policy: MergePolicy::default(),
            fill_depth: FillDepth::default(),
            rule_overrides: IndexMap::new(),
            exclude: Vec::new(),
            auth_extractors,
            error_status_codes: Vec::new(),
            parse_cache_capacity: ParseCache::DEFAULT_CAPACITY,
        }
    }
}

impl GeneratorConfig {
    /// Loads a configuration file, choosing the format by extension
    /// (`.json`, otherwise YAML).
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Checks values serde cannot: exclusion globs and status codes.
    pub fn validate(&self) -> Result<()> {
        self.exclusions()?;
        for code in &self.error_status_codes {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::ConfigError(format!(
                    "'{}' is not an HTTP status code",
                    code
                )));
            }
        }
        Ok(())
    }

    /// Compiled form of [`exclude`](Self::exclude).
    pub fn exclusions(&self) -> Result<Exclusions> {
        Exclusions::new(&self.exclude)
    }
}

/// Compiled exclusion globs. `*` and `?` stay within one path segment,
/// `**` spans any number of them.
#[derive(Debug, Clone)]
pub struct Exclusions {
    set: GlobSet,
}

impl Exclusions {
    pub fn new(globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    Error::ConfigError(format!("invalid exclude pattern '{}': {}", glob, e))
                })?;
            builder.add(compiled);
        }
        let set = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("invalid exclude patterns: {}", e)))?;
        Ok(Self { set })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }
}
