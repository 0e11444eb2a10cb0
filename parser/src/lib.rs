//! @ai:module:intent Extraction engine for `@!` annotations embedded in source comments
//! @ai:module:layer infrastructure
//! @ai:module:public_api annotation, extractor, project, config, language, model, output, error
//! @ai:module:stateless true
//!
//! # atbang
//!
//! Finds `@!key value { "json": "props" }` directives inside the comments of
//! any text file, resolves what each one applies to (the file, the next
//! declaration, or a `@!begin`/`@!end` region) and reports malformed input as
//! diagnostics instead of failing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use atbang_parser::{extract_source, output, project, Config};
//! use std::path::Path;
//!
//! // Scan a single buffer
//! let file = extract_source("f.py", Some("python"), "# @!owner \"alice\"\ndef f(): pass\n");
//! for annotation in file.by_key("owner") {
//!     println!("{:?}", annotation.scope);
//! }
//!
//! // Scan a directory tree
//! let project = project::scan_path(Path::new("src"), &Config::default()).unwrap();
//! println!("{}", output::format_project(&project, output::OutputFormat::Text));
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod extractor;
pub mod language;
pub mod model;
pub mod output;
pub mod project;
pub mod properties;
pub mod resolver;
pub mod scanner;
pub mod tokenizer;

pub use annotation::{Annotation, AnnotationForm, Diagnostic, DiagnosticKind, Location, Scope};
pub use config::{Config, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use extractor::{extract_bytes, extract_file, extract_source, extract_with_profile, ScanOptions};
pub use language::{detect_language, profile_for, CommentProfile, ProfileRegistry};
pub use model::{FileAnnotations, FileError, ProjectAnnotations};
pub use output::{format_file, format_project, to_json, OutputFormat};
pub use project::{discover_files, extract_project, extract_project_with_cancel, SourceFile};
pub use properties::{parse_properties, parse_tag_shorthand, Properties, PropertyValue, ScalarValue};
