//! @ai:module:intent Define data structures for extracted annotations and diagnostics
//! @ai:module:layer domain
//! @ai:module:public_api Annotation, AnnotationForm, Scope, Location, Diagnostic, DiagnosticKind
//! @ai:module:stateless true

use crate::properties::{Properties, PropertyValue, ScalarValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Property consulted by agent queries.
pub const AGENT_KEY: &str = "agent";

/// @ai:intent Represents a line range in one file
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
}

impl Location {
    /// @ai:intent Create a new Location
    /// @ai:pre start <= end
    pub fn new(file: impl Into<PathBuf>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "location start {} after end {}", start, end);
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// @ai:intent Create a Location covering a single line
    pub fn line(file: impl Into<PathBuf>, line: usize) -> Self {
        Self::new(file, line, line)
    }
}

/// @ai:intent Distinguishes single-line annotations from begin/end regions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationForm {
    Inline,
    Block,
}

/// @ai:intent What part of the file an annotation applies to
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// The annotation opens the file and is not attached to a following line.
    FileLevel,
    /// The next non-blank, non-annotation line.
    Declaration { target: usize, text: String },
    /// Inclusive range between a begin and end marker.
    Region { start: usize, end: usize },
    /// Nothing followed the annotation before end of file.
    Trailing,
}

/// @ai:intent Represents a single resolved annotation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Annotation {
    pub key: String,
    pub form: AnnotationForm,
    /// Absent from JSON when no value was written; `@!k null` serializes as `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ScalarValue>,
    pub properties: Properties,
    pub tags: BTreeSet<String>,
    pub location: Location,
    pub scope: Scope,
    /// Set on regions salvaged at end of file without a matching end marker.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unclosed: bool,
}

impl Annotation {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// @ai:intent Check if the annotation is addressed to the given agent
    /// @ai:post true for an `agent` property equal to or containing `agent`
    /// @ai:post true for an `@!agent "<agent>"` annotation
    /// @ai:effects pure
    pub fn targets_agent(&self, agent: &str) -> bool {
        if self
            .property(AGENT_KEY)
            .is_some_and(|v| v.contains_str(agent))
        {
            return true;
        }
        self.key == AGENT_KEY
            && matches!(&self.value, Some(ScalarValue::String(s)) if s == agent)
    }

    /// @ai:intent Check whether a line falls inside the annotation's scope
    /// @ai:effects pure
    pub fn covers_line(&self, line: usize) -> bool {
        match &self.scope {
            Scope::FileLevel => true,
            Scope::Declaration { target, .. } => *target == line,
            Scope::Region { start, end } => (*start..=*end).contains(&line),
            Scope::Trailing => false,
        }
    }
}

/// @ai:intent Categories of recoverable anomalies found during a scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Brace span is not a valid JSON object; the annotation keeps empty properties.
    MalformedProperties,
    /// `@!end` with no open block of that key; nothing is emitted for it.
    UnmatchedEnd,
    /// End of file reached with an open block; salvaged as a region to end of file.
    UnclosedBlock,
    /// A single tag failed to parse and was dropped.
    MalformedTagToken,
    /// `@!` followed by an invalid key. Only recorded when the scan asks for it.
    UnrecognizedKeyCharset,
    /// Bare value token that is not a number, boolean or null.
    MalformedValue,
    /// Inline annotation with no target line before end of file.
    DanglingAnnotation,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 7] = [
        DiagnosticKind::MalformedProperties,
        DiagnosticKind::UnmatchedEnd,
        DiagnosticKind::UnclosedBlock,
        DiagnosticKind::MalformedTagToken,
        DiagnosticKind::UnrecognizedKeyCharset,
        DiagnosticKind::MalformedValue,
        DiagnosticKind::DanglingAnnotation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedProperties => "malformed_properties",
            DiagnosticKind::UnmatchedEnd => "unmatched_end",
            DiagnosticKind::UnclosedBlock => "unclosed_block",
            DiagnosticKind::MalformedTagToken => "malformed_tag_token",
            DiagnosticKind::UnrecognizedKeyCharset => "unrecognized_key_charset",
            DiagnosticKind::MalformedValue => "malformed_value",
            DiagnosticKind::DanglingAnnotation => "dangling_annotation",
        }
    }
}

impl FromStr for DiagnosticKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("Unknown diagnostic kind: {}", s))
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// @ai:intent A recoverable parse anomaly with a best-effort location
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        file: &Path,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: Location::line(file, line),
            message: message.into(),
        }
    }
}
