use crate::config::Exclusions;
use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks through a project directory to find all Rust source files.
/// It automatically skips common directories that should be ignored, such as `target` and hidden
/// directories (those starting with `.`), plus any file matching the configured exclusion globs.
///
/// # Example
///
/// ```no_run
/// use schema_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    exclusions: Exclusions,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// List of paths to all discovered `.rs` files
    pub rust_files: Vec<PathBuf>,
    /// Number of `.rs` files dropped by exclusion globs
    pub excluded: usize,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            exclusions: Exclusions::default(),
        }
    }

    /// Skips files whose path relative to the root (with `/` separators)
    /// matches one of `exclusions`.
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut rust_files = Vec::new();
        let mut excluded = 0;
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("rs") {
                        continue;
                    }
                    if self.exclusions.is_excluded(&self.relative(path)) {
                        debug!("Excluded source file: {}", path.display());
                        excluded += 1;
                        continue;
                    }
                    rust_files.push(path.to_path_buf());
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!(
            "Scan complete: {} files, {} excluded",
            rust_files.len(),
            excluded
        );
        Ok(ScanResult {
            rust_files,
            excluded,
            warnings,
        })
    }

    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root_path).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_names(result: &ScanResult) -> Vec<String> {
        result
            .rust_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_collects_nested_rust_files_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/models")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/models/user.rs"), "struct User {}").unwrap();
        fs::write(root.join("src/lib.rs"), "pub mod models;").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();
        fs::write(root.join("Cargo.toml"), "[package]").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(file_names(&result), vec!["lib.rs", "main.rs", "user.rs"]);
        assert_eq!(result.excluded, 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();
        assert!(result.rust_files.is_empty());
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/build.rs"), "fn main() {}").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/hook.rs"), "// hook").unwrap();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(file_names(&result), vec!["main.rs"]);
    }

    #[test]
    fn test_scan_applies_exclusions_to_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/generated")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/generated/api.rs"), "pub struct Api;").unwrap();

        let exclusions = Exclusions::new(&["src/generated/**".to_string()]).unwrap();
        let scanner = FileScanner::new(root.to_path_buf()).with_exclusions(exclusions);
        let result = scanner.scan().unwrap();

        assert_eq!(result.rust_files, vec![root.join("src/main.rs")]);
        assert_eq!(result.excluded, 1);
    }
}
