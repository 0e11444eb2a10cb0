//! @ai:module:intent Assemble resolved annotations into the final per-file and per-project model
//! @ai:module:layer domain
//! @ai:module:public_api FileAnnotations, ProjectAnnotations, FileError, build_model
//! @ai:module:depends_on annotation, resolver
//! @ai:module:stateless true

use crate::annotation::{Annotation, AnnotationForm, Diagnostic, DiagnosticKind};
use crate::resolver::Resolved;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// @ai:intent Immutable scan result for one file
///
/// Annotations are ordered by anchor line: file-level annotations first,
/// regions by begin line, inline annotations by target line, trailing ones
/// last. The query methods are views over the same sequence.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnnotations {
    file: PathBuf,
    language: Option<String>,
    annotations: Vec<Annotation>,
    diagnostics: Vec<Diagnostic>,
}

/// @ai:intent Order resolved annotations and freeze them into a FileAnnotations
/// @ai:post annotations sorted by (anchor, marker line), stable
/// @ai:post diagnostics sorted by line, stable
/// @ai:effects pure
pub fn build_model(
    file: PathBuf,
    language: Option<String>,
    mut resolved: Vec<Resolved>,
    mut diagnostics: Vec<Diagnostic>,
) -> FileAnnotations {
    resolved.sort_by_key(|r| (r.anchor, r.marker_line));
    diagnostics.sort_by_key(|d| d.location.start);

    FileAnnotations {
        file,
        language,
        annotations: resolved.into_iter().map(|r| r.annotation).collect(),
        diagnostics,
    }
}

impl FileAnnotations {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.diagnostics.is_empty()
    }

    pub fn by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.key == key)
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.has_tag(tag))
    }

    /// @ai:intent Annotations addressed to an agent via the `agent` property or `@!agent`
    pub fn by_agent<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.targets_agent(agent))
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.form == AnnotationForm::Block)
    }

    pub fn inlines(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.form == AnnotationForm::Inline)
    }

    /// @ai:intent Annotations whose scope covers the given line
    pub fn at_line(&self, line: usize) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.covers_line(line))
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// @ai:intent Check whether any diagnostic has one of the given kinds
    /// @ai:effects pure
    pub fn has_diagnostics_in(&self, kinds: &[DiagnosticKind]) -> bool {
        self.diagnostics.iter().any(|d| kinds.contains(&d.kind))
    }
}

/// @ai:intent A file that could not be scanned at all
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// @ai:intent Scan results for many files, ordered by path
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProjectAnnotations {
    files: Vec<FileAnnotations>,
    errors: Vec<FileError>,
}

impl ProjectAnnotations {
    /// @ai:intent Combine per-file results, ordering both lists by path
    /// @ai:effects pure
    pub fn new(mut files: Vec<FileAnnotations>, mut errors: Vec<FileError>) -> Self {
        files.sort_by(|a, b| a.file.cmp(&b.file));
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files, errors }
    }

    pub fn files(&self) -> &[FileAnnotations] {
        &self.files
    }

    pub fn errors(&self) -> &[FileError] {
        &self.errors
    }

    pub fn file(&self, path: &Path) -> Option<&FileAnnotations> {
        self.files.iter().find(|f| f.file == path)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.files.iter().flat_map(|f| f.annotations.iter())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    pub fn by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations().filter(move |a| a.key == key)
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations().filter(move |a| a.has_tag(tag))
    }

    pub fn by_agent<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations().filter(move |a| a.targets_agent(agent))
    }

    pub fn annotation_count(&self) -> usize {
        self.files.iter().map(|f| f.annotations.len()).sum()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn has_diagnostics_in(&self, kinds: &[DiagnosticKind]) -> bool {
        self.files.iter().any(|f| f.has_diagnostics_in(kinds))
    }
}
