use crate::capture::CaptureStore;
use crate::config::GeneratorConfig;
use crate::discovery::discover_entry_points;
use crate::generator::Generator;
use crate::merger::{FillDepth, MergePolicy};
use crate::parser::{ParseCache, ParsedFile};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::type_index::TypeIndex;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Schema From Source - infer OpenAPI payload schemas from a Rust web project
#[derive(Parser, Debug)]
#[command(name = "schema-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Configuration file (YAML, or JSON by extension)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Captured responses to merge with static analysis (JSON)
    #[arg(long = "capture", value_name = "FILE")]
    pub capture_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Overrides the configured merge policy
    #[arg(long = "merge-policy", value_enum)]
    pub merge_policy: Option<MergePolicy>,

    /// Overrides the configured fill depth
    #[arg(long = "fill-depth", value_enum)]
    pub fill_depth: Option<FillDepth>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Loads the configuration file, then applies command-line overrides.
pub fn load_config(args: &CliArgs) -> Result<GeneratorConfig> {
    let mut config = match &args.config_path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(policy) = args.merge_policy {
        config.merge_policy = policy;
    }
    if let Some(depth) = args.fill_depth {
        config.fill_depth = depth;
    }
    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let config = load_config(&args)?;

    info!("Scanning project directory...");
    let scanner = FileScanner::new(args.project_path.clone()).with_exclusions(config.exclusions()?);
    let scan_result = scanner.scan()?;
    info!(
        "Found {} Rust files ({} excluded)",
        scan_result.rust_files.len(),
        scan_result.excluded
    );
    if scan_result.rust_files.is_empty() {
        anyhow::bail!("No Rust files found in the project directory");
    }

    info!("Parsing Rust files...");
    let mut cache = ParseCache::new(config.parse_cache_capacity);
    let parsed_files: Vec<ParsedFile> = cache
        .parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(|r| match r {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping file due to parse error: {}", e);
                None
            }
        })
        .collect();
    info!("Successfully parsed {} files", parsed_files.len());
    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }

    info!("Discovering entry points...");
    let entries = discover_entry_points(&parsed_files);
    if entries.is_empty() {
        anyhow::bail!(
            "No entry points found in {}: no axum Router with routes was discovered",
            args.project_path.display()
        );
    }
    info!("Discovered {} entry points", entries.len());

    let index = TypeIndex::new(&parsed_files);
    debug!("Indexed {} type declarations", index.len());
    let mut generator = Generator::new(index, config)?;
    if let Some(path) = &args.capture_path {
        let captures = CaptureStore::load(path)
            .with_context(|| format!("Failed to load captures: {}", path.display()))?;
        info!("Loaded captures for {} operations", captures.len());
        generator = generator.with_captures(captures);
    }

    let document = generator.run(&entries);
    for diagnostic in generator.diagnostics() {
        warn!(
            "Plugin {} failed{}: {}",
            diagnostic.plugin,
            diagnostic
                .entry_point
                .as_ref()
                .map(|id| format!(" on {}", id))
                .unwrap_or_default(),
            diagnostic.message
        );
    }

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Successfully wrote document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Summary:");
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Operations: {}", document.operation_count());
    info!("  - Components: {}", document.components.schemas.len());

    Ok(())
}
