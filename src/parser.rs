use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Parses Rust source files into `syn` syntax trees.
///
/// Routers, handler signatures and DTO declarations are all read from these
/// trees; nothing is compiled or executed.
///
/// # Example
///
/// ```no_run
/// use schema_from_source::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A source file together with its syntax tree.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Reads and parses one file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let syntax_tree = syn::parse_file(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every path, one result per input.
    ///
    /// A file that fails is logged and reported in place; the others are
    /// still parsed, so a project with a broken file is documented partially.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect();

        let parsed = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            parsed,
            results.len() - parsed
        );
        results
    }
}

/// Bounded cache of parsed files keyed by path.
///
/// An entry is reused only while the file's modification time matches the one
/// recorded when it was parsed; a changed file is parsed again. Past
/// `capacity` entries the least recently inserted one is evicted.
pub struct ParseCache {
    capacity: usize,
    entries: IndexMap<PathBuf, (SystemTime, ParsedFile)>,
}

impl ParseCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached tree for `path`, parsing it when absent or stale.
    pub fn get_or_parse(&mut self, path: &Path) -> Result<ParsedFile> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        if let Some((cached_at, parsed)) = self.entries.get(path) {
            if *cached_at == modified {
                debug!("Parse cache hit: {}", path.display());
                return Ok(parsed.clone());
            }
            debug!("Parse cache stale: {}", path.display());
        }

        let parsed = AstParser::parse_file(path)?;
        self.entries.shift_remove(path);
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!("Parse cache evicted: {}", evicted.display());
            }
        }
        self.entries
            .insert(path.to_path_buf(), (modified, parsed.clone()));
        Ok(parsed)
    }

    /// Like [`AstParser::parse_files`], going through the cache.
    pub fn parse_files(&mut self, paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        paths
            .iter()
            .map(|path| {
                self.get_or_parse(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect()
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
