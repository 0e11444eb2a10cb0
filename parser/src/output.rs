//! @ai:module:intent Format scan results as text, JSON or JSON Lines
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_file, format_project, format_annotations, format_check, format_profiles, to_json
//! @ai:module:depends_on model, annotation, language
//! @ai:module:stateless true

use crate::annotation::{Annotation, AnnotationForm, Diagnostic, DiagnosticKind, Scope};
use crate::language::{CommentProfile, ProfileRegistry};
use crate::model::{FileAnnotations, FileError, ProjectAnnotations};
use colored::Colorize;
use serde::Serialize;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    /// One JSON record per annotation, diagnostic or file error.
    JsonLines,
}

/// A single JSON Lines record.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Annotation(&'a Annotation),
    Diagnostic(&'a Diagnostic),
    Error(&'a FileError),
}

fn json_lines<'a>(records: impl Iterator<Item = Record<'a>>) -> String {
    records
        .filter_map(|r| serde_json::to_string(&r).ok())
        .map(|line| line + "\n")
        .collect()
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

/// @ai:intent Format the scan result of one file
/// @ai:effects pure
pub fn format_file(file: &FileAnnotations, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(file, false),
        OutputFormat::JsonPretty => to_json(file, true),
        OutputFormat::JsonLines => json_lines(
            file.annotations()
                .iter()
                .map(Record::Annotation)
                .chain(file.diagnostics().iter().map(Record::Diagnostic)),
        ),
        OutputFormat::Text => format_file_text(file),
    }
}

/// @ai:intent Format the scan result of many files
/// @ai:effects pure
pub fn format_project(project: &ProjectAnnotations, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(project, false),
        OutputFormat::JsonPretty => to_json(project, true),
        OutputFormat::JsonLines => json_lines(
            project
                .annotations()
                .map(Record::Annotation)
                .chain(project.diagnostics().map(Record::Diagnostic))
                .chain(project.errors().iter().map(Record::Error)),
        ),
        OutputFormat::Text => {
            let mut output = String::new();
            for file in project.files().iter().filter(|f| !f.is_empty()) {
                output.push_str(&format_file_text(file));
                output.push('\n');
            }
            output.push_str(&format_errors_text(project.errors()));
            output.push_str(&format!(
                "Scanned {} files: {} annotations, {} diagnostics\n",
                project.files().len(),
                project.annotation_count(),
                project.diagnostic_count()
            ));
            output
        }
    }
}

/// @ai:intent Format a flat list of query matches
/// @ai:effects pure
pub fn format_annotations(annotations: &[&Annotation], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&annotations, false),
        OutputFormat::JsonPretty => to_json(&annotations, true),
        OutputFormat::JsonLines => {
            json_lines(annotations.iter().map(|a| Record::Annotation(a)))
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for annotation in annotations {
                output.push_str(&format!(
                    "{}:{} ",
                    annotation.location.file.display().to_string().dimmed(),
                    annotation.location.start
                ));
                output.push_str(annotation_text(annotation).trim_start());
            }
            output.push_str(&format!("{} matches\n", annotations.len()));
            output
        }
    }
}

/// @ai:intent Format diagnostics and errors for the check command
/// @ai:post kinds in `fail_on` are shown as errors, the rest as warnings
/// @ai:effects pure
pub fn format_check(
    project: &ProjectAnnotations,
    fail_on: &[DiagnosticKind],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            #[derive(Serialize)]
            struct CheckReport<'a> {
                passed: bool,
                diagnostics: Vec<&'a Diagnostic>,
                errors: &'a [FileError],
            }
            let report = CheckReport {
                passed: !project.has_diagnostics_in(fail_on) && project.errors().is_empty(),
                diagnostics: project.diagnostics().collect(),
                errors: project.errors(),
            };
            to_json(&report, format == OutputFormat::JsonPretty)
        }
        OutputFormat::JsonLines => json_lines(
            project
                .diagnostics()
                .map(Record::Diagnostic)
                .chain(project.errors().iter().map(Record::Error)),
        ),
        OutputFormat::Text => format_check_text(project, fail_on),
    }
}

fn format_check_text(project: &ProjectAnnotations, fail_on: &[DiagnosticKind]) -> String {
    let mut output = String::new();
    let mut failures = 0;

    for diagnostic in project.diagnostics() {
        let failing = fail_on.contains(&diagnostic.kind);
        if failing {
            failures += 1;
        }
        output.push_str(&format_diagnostic_text(diagnostic, failing));
    }
    output.push_str(&format_errors_text(project.errors()));

    output.push('\n');
    output.push_str(&format!(
        "Checked {} files, {} annotations\n",
        project.files().len(),
        project.annotation_count()
    ));

    let warnings = project.diagnostic_count() - failures;
    if failures > 0 || !project.errors().is_empty() {
        output.push_str(&format!(
            "{} errors, {} warnings\n",
            (failures + project.errors().len()).to_string().red().bold(),
            warnings.to_string().yellow()
        ));
    } else if warnings > 0 {
        output.push_str(&format!(
            "{} {} warnings\n",
            "OK".green().bold(),
            warnings.to_string().yellow()
        ));
    } else {
        output.push_str(&format!("{} No issues found\n", "OK".green().bold()));
    }

    output
}

fn format_diagnostic_text(diagnostic: &Diagnostic, failing: bool) -> String {
    let label = if failing {
        "ERROR".red().bold()
    } else {
        "WARN".yellow().bold()
    };
    let location = format!(
        "{}:{}",
        diagnostic.location.file.display(),
        diagnostic.location.start
    );
    format!(
        "{} {} - {} ({})\n",
        label,
        location.dimmed(),
        diagnostic.message,
        diagnostic.kind.as_str().dimmed()
    )
}

fn format_errors_text(errors: &[FileError]) -> String {
    errors
        .iter()
        .map(|e| {
            format!(
                "{} {} - {}\n",
                "ERROR".red().bold(),
                e.path.display().to_string().dimmed(),
                e.message
            )
        })
        .collect()
}

fn scope_text(annotation: &Annotation) -> String {
    match &annotation.scope {
        Scope::FileLevel => "file".to_string(),
        Scope::Declaration { target, text } => format!("line {}: {}", target, text.trim()),
        Scope::Region { start, end } if annotation.unclosed => {
            format!("lines {}-{} (unclosed)", start, end)
        }
        Scope::Region { start, end } => format!("lines {}-{}", start, end),
        Scope::Trailing => "trailing".to_string(),
    }
}

fn annotation_text(annotation: &Annotation) -> String {
    let mut output = String::new();

    let form = match annotation.form {
        AnnotationForm::Inline => "inline",
        AnnotationForm::Block => "block",
    };
    let value = annotation
        .value
        .as_ref()
        .map(|v| format!(" = {}", v))
        .unwrap_or_default();

    output.push_str(&format!(
        "  {}{} [{}] -> {}\n",
        annotation.key.cyan(),
        value,
        form.dimmed(),
        scope_text(annotation)
    ));

    for (key, value) in annotation.properties.iter() {
        output.push_str(&format!(
            "      {}: {}\n",
            key,
            serde_json::to_string(value).unwrap_or_default()
        ));
    }

    if !annotation.tags.is_empty() {
        let tags: Vec<_> = annotation.tags.iter().map(String::as_str).collect();
        output.push_str(&format!("      {} {}\n", "tags:".dimmed(), tags.join(", ")));
    }

    output
}

fn format_file_text(file: &FileAnnotations) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} ({})\n",
        file.file().display().to_string().bold(),
        file.language().unwrap_or("unknown")
    ));

    output.push_str(&format!("  Annotations ({}):\n", file.annotations().len()));
    for annotation in file.annotations() {
        output.push_str(&format!("    L{}", annotation.location.start));
        output.push_str(&annotation_text(annotation));
    }

    if !file.diagnostics().is_empty() {
        output.push_str(&format!("  Diagnostics ({}):\n", file.diagnostics().len()));
        for diagnostic in file.diagnostics() {
            output.push_str(&format!(
                "    L{} {} {}\n",
                diagnostic.location.start,
                diagnostic.kind.as_str().yellow(),
                diagnostic.message
            ));
        }
    }

    output
}

fn profile_text(profile: &CommentProfile) -> String {
    let blocks: Vec<_> = profile
        .block_delimiters
        .iter()
        .map(|b| format!("{} {}", b.open, b.close))
        .collect();
    format!(
        "line: {:<12} block: {}",
        profile.line_prefixes.join(" "),
        blocks.join(", ")
    )
}

/// @ai:intent List the rows of a profile registry, then the fallback profile
/// @ai:effects pure
pub fn format_profiles(registry: &ProfileRegistry, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&registry.entries(), false),
        OutputFormat::JsonPretty => to_json(&registry.entries(), true),
        OutputFormat::JsonLines => registry
            .entries()
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .map(|line| line + "\n")
            .collect(),
        OutputFormat::Text => {
            let mut output = String::new();
            for entry in registry.entries() {
                output.push_str(&format!(
                    "{:<12} {:<24} {}\n",
                    entry.name.cyan(),
                    entry.extensions.join(","),
                    profile_text(&entry.profile)
                ));
            }
            output.push_str(&format!(
                "{:<12} {:<24} {}\n",
                "(default)".dimmed(),
                "",
                profile_text(registry.fallback())
            ));
            output
        }
    }
}
