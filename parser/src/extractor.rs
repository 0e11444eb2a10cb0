//! @ai:module:intent Run the scan pipeline over one file's text
//! @ai:module:layer application
//! @ai:module:public_api extract_source, extract_bytes, extract_file, extract_with_profile, ScanOptions
//! @ai:module:depends_on language, scanner, tokenizer, properties, resolver, model, error
//! @ai:module:stateless true

use crate::annotation::DiagnosticKind;
use crate::error::{Error, Result};
use crate::language::{CommentProfile, ProfileRegistry};
use crate::model::{build_model, FileAnnotations};
use crate::properties::parse_payload;
use crate::resolver::ScopeResolver;
use crate::scanner::scan_lines;
use crate::tokenizer::{has_marker, tokenize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// @ai:intent Knobs that change what a scan reports, not what it extracts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Record `UnrecognizedKeyCharset` for `@!` lines with an invalid key.
    pub report_unrecognized_keys: bool,
}

/// @ai:intent Extract annotations from text using the built-in profiles
/// @ai:effects pure
pub fn extract_source(file: impl Into<PathBuf>, hint: Option<&str>, text: &str) -> FileAnnotations {
    extract_with_registry(file, hint, text, &ProfileRegistry::builtin(), ScanOptions::default())
}

/// @ai:intent Extract annotations from text, resolving the hint against a registry
/// @ai:effects pure
pub fn extract_with_registry(
    file: impl Into<PathBuf>,
    hint: Option<&str>,
    text: &str,
    registry: &ProfileRegistry,
    options: ScanOptions,
) -> FileAnnotations {
    let language = hint
        .and_then(|h| registry.lookup(h))
        .map(|e| e.name.clone());
    let profile = registry.profile_for(hint);
    extract_with_profile(file, language, profile, text, options)
}

/// @ai:intent Decode raw bytes as UTF-8 text and extract annotations
/// @ai:post Err(Decode) when the bytes are not text; no partial result
/// @ai:effects pure
pub fn extract_bytes(
    file: impl Into<PathBuf>,
    hint: Option<&str>,
    bytes: &[u8],
    registry: &ProfileRegistry,
    options: ScanOptions,
) -> Result<FileAnnotations> {
    let file = file.into();
    let text = std::str::from_utf8(bytes).map_err(|source| Error::Decode {
        path: file.clone(),
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(extract_with_registry(file, hint, text, registry, options))
}

/// @ai:intent Read a file from disk and extract its annotations
/// @ai:pre path exists and is readable
/// @ai:effects fs:read
pub fn extract_file(path: &Path) -> Result<FileAnnotations> {
    let registry = ProfileRegistry::builtin();
    let hint = registry.detect(path).map(|e| e.name.clone());
    let bytes = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    extract_bytes(path, hint.as_deref(), &bytes, &registry, ScanOptions::default())
}

/// @ai:intent Run scanner, tokenizer, property parser, resolver and model builder
/// @ai:post every annotation and diagnostic carries `file`
/// @ai:effects pure
pub fn extract_with_profile(
    file: impl Into<PathBuf>,
    language: Option<String>,
    profile: &CommentProfile,
    text: &str,
    options: ScanOptions,
) -> FileAnnotations {
    let file = file.into();
    let lines = scan_lines(text, profile);
    let mut resolver = ScopeResolver::new(file.clone());

    for line in &lines {
        let raw = line.stripped.as_deref().and_then(tokenize);

        match raw {
            Some(raw) => {
                let mut payload = parse_payload(&raw);
                for issue in std::mem::take(&mut payload.issues) {
                    resolver.report(issue.kind, line.number, issue.message);
                }
                resolver.annotation(line.number, raw.marker, &raw.key, payload);
            }
            None if line.is_blank() => resolver.blank(line.number),
            None => {
                if options.report_unrecognized_keys
                    && line.stripped.as_deref().is_some_and(has_marker)
                {
                    resolver.report(
                        DiagnosticKind::UnrecognizedKeyCharset,
                        line.number,
                        "`@!` is not followed by a valid key; line ignored",
                    );
                }
                // Comment prose is neither a target nor file content.
                if line.has_code {
                    resolver.content(line.number, &line.raw);
                }
            }
        }
    }

    let (resolved, diagnostics) = resolver.finish(lines.len());
    debug!(
        file = %file.display(),
        lines = lines.len(),
        annotations = resolved.len(),
        diagnostics = diagnostics.len(),
        "scanned file"
    );

    build_model(file, language, resolved, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationForm, Scope};
    use crate::properties::{PropertyValue, ScalarValue};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_literal_python_scenario() {
        let text = r#"# @!readonly true { "author": "alice" }
# @!link "https://x" { "tags": ["backend"] }
def f(): pass
"#;
        let result = extract_source("f.py", Some("python"), text);

        assert!(result.diagnostics().is_empty());
        let annotations = result.annotations();
        assert_eq!(annotations.len(), 2);

        let target = Scope::Declaration {
            target: 3,
            text: "def f(): pass".to_string(),
        };
        let readonly = &annotations[0];
        assert_eq!(readonly.key, "readonly");
        assert_eq!(readonly.form, AnnotationForm::Inline);
        assert_eq!(readonly.value, Some(ScalarValue::Bool(true)));
        assert_eq!(
            readonly.property("author"),
            Some(&PropertyValue::String("alice".to_string()))
        );
        assert!(readonly.tags.is_empty());
        assert_eq!(readonly.scope, target);
        assert_eq!((readonly.location.start, readonly.location.end), (1, 1));

        let link = &annotations[1];
        assert_eq!(link.key, "link");
        assert_eq!(link.value, Some(ScalarValue::String("https://x".to_string())));
        assert!(link.has_tag("backend"));
        assert_eq!(link.tags.len(), 1);
        assert_eq!(link.scope, target);
    }

    #[test]
    fn test_non_comment_marker_is_ignored() {
        let text = "s = \"@!readonly\"\nprint(s)\n";
        let result = extract_source("f.py", Some("python"), text);
        assert!(result.annotations().is_empty());
    }

    #[test]
    fn test_unrecognized_key_reporting_is_opt_in() {
        let text = "# @!9lives\nx = 1\n";
        let quiet = extract_source("f.py", Some("python"), text);
        assert!(quiet.annotations().is_empty());
        assert!(quiet.diagnostics().is_empty());

        let loud = extract_with_registry(
            "f.py",
            Some("python"),
            text,
            &ProfileRegistry::builtin(),
            ScanOptions {
                report_unrecognized_keys: true,
            },
        );
        assert_eq!(loud.diagnostics().len(), 1);
        assert_eq!(loud.diagnostics()[0].kind, DiagnosticKind::UnrecognizedKeyCharset);
    }

    #[test]
    fn test_payload_issues_carry_line_numbers() {
        let text = "x = 1\n# @!cfg {bad}\ny = 2\n";
        let result = extract_source("f.py", Some("py"), text);
        assert_eq!(result.annotations().len(), 1);
        assert!(result.annotations()[0].properties.is_empty());
        let diag = &result.diagnostics()[0];
        assert_eq!(diag.kind, DiagnosticKind::MalformedProperties);
        assert_eq!(diag.location.start, 2);
        assert_eq!(diag.location.file, PathBuf::from("f.py"));
    }

    #[test]
    fn test_extract_bytes_rejects_non_utf8() {
        let err = extract_bytes(
            "bin.dat",
            None,
            &[0xff, 0xfe, 0x00],
            &ProfileRegistry::builtin(),
            ScanOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_extract_bytes_strips_bom() {
        let result = extract_bytes(
            "f.py",
            Some("python"),
            "\u{feff}# @!owner \"a\"\n".as_bytes(),
            &ProfileRegistry::builtin(),
            ScanOptions::default(),
        )
        .unwrap();
        assert_eq!(result.annotations()[0].scope, Scope::FileLevel);
    }

    #[test]
    fn test_extract_rust_file() {
        let mut file = NamedTempFile::with_suffix(".rs").unwrap();
        writeln!(
            file,
            r#"//! @!module {{ "layer": "domain" }}

/// @!pure
fn test_func(x: i32) -> i32 {{
    x
}}"#
        )
        .unwrap();

        let result = extract_file(file.path()).unwrap();

        assert_eq!(result.language(), Some("rust"));
        assert_eq!(result.annotations().len(), 2);
        assert_eq!(result.annotations()[0].scope, Scope::FileLevel);
        assert_eq!(
            result.annotations()[1].scope,
            Scope::Declaration {
                target: 4,
                text: "fn test_func(x: i32) -> i32 {".to_string()
            }
        );
    }

    #[test]
    fn test_comment_prose_is_skipped_when_binding() {
        let text = "/// @!pure\n/// Adds two numbers.\nfn add() {}\n";
        let result = extract_source("add.rs", Some("rust"), text);
        assert_eq!(
            result.annotations()[0].scope,
            Scope::Declaration {
                target: 3,
                text: "fn add() {}".to_string()
            }
        );
    }

    #[test]
    fn test_license_header_does_not_count_as_content() {
        let text = "# Copyright 2026\n# @!owner \"core\"\n\nimport os\n";
        let result = extract_source("h.py", Some("python"), text);
        assert_eq!(result.annotations()[0].scope, Scope::FileLevel);
    }

    #[test]
    fn test_extract_missing_file() {
        let err = extract_file(Path::new("/definitely/not/here.rs")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
