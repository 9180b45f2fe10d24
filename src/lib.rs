//! Schema From Source - infer OpenAPI payload schemas from Rust web project source.
//!
//! The crate reads a project's syntax trees (it never executes them) and
//! derives request bodies, responses, parameters, error bodies and security
//! requirements for every route, deduplicating repeated structures into named
//! components.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans project directories for Rust files
//! 2. [`parser`] - Parses Rust source files into syntax trees, with a cache
//! 3. [`discovery`] - Finds entry points in axum `Router` chains
//! 4. [`type_index`] - Indexes struct, enum and alias declarations
//! 5. [`resolver`] / [`type_mapper`] / [`rules`] - Turn types and validation
//!    rules into [`schema::Schema`] trees
//! 6. [`extractor`] / [`pipeline`] - Priority-ordered plugins producing candidates
//! 7. [`merger`] - Merges annotation, static and captured candidates
//! 8. [`registry`] / [`example_generator`] - Deduplicated components and examples
//! 9. [`generator`] - One pass producing a [`document::ApiDocument`]
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use schema_from_source::{
//!     config::GeneratorConfig,
//!     discovery::discover_entry_points,
//!     generator::Generator,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     type_index::TypeIndex,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-project")).scan().unwrap();
//! let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let entries = discover_entry_points(&parsed_files);
//! let mut generator =
//!     Generator::new(TypeIndex::new(&parsed_files), GeneratorConfig::default()).unwrap();
//! let document = generator.run(&entries);
//!
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod capture;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod document;
pub mod entry;
pub mod error;
pub mod example_generator;
pub mod extractor;
pub mod generator;
pub mod merger;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod rules;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod type_index;
pub mod type_mapper;
