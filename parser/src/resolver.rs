//! @ai:module:intent Bind annotations to the declaration, region or file they describe
//! @ai:module:layer application
//! @ai:module:public_api ScopeResolver, Resolved
//! @ai:module:depends_on annotation, properties, tokenizer
//! @ai:module:stateless false
//!
//! One resolver lives for exactly one file. It owns the stack of open
//! `@!begin` frames and the buffer of inline annotations still waiting for a
//! target line; both are dropped when [`ScopeResolver::finish`] returns.

use crate::annotation::{Annotation, AnnotationForm, Diagnostic, DiagnosticKind, Location, Scope};
use crate::properties::{Payload, Properties, ScalarValue};
use crate::tokenizer::MarkerKind;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// @ai:intent A resolved annotation with the line it sorts by
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Begin line for regions, target line for inline annotations.
    pub anchor: usize,
    /// Line of the (begin) marker; breaks ties between equal anchors.
    pub marker_line: usize,
    pub annotation: Annotation,
}

#[derive(Debug)]
struct OpenFrame {
    key: String,
    begin_line: usize,
    value: Option<ScalarValue>,
    properties: Properties,
    tags: BTreeSet<String>,
}

#[derive(Debug)]
struct PendingInline {
    key: String,
    line: usize,
    payload: Payload,
}

/// @ai:intent State machine over one file's lines
#[derive(Debug)]
pub struct ScopeResolver {
    file: PathBuf,
    stack: Vec<OpenFrame>,
    pending: Vec<PendingInline>,
    pending_is_first: bool,
    seen_content: bool,
    resolved: Vec<Resolved>,
    diagnostics: Vec<Diagnostic>,
}

impl ScopeResolver {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            stack: Vec::new(),
            pending: Vec::new(),
            pending_is_first: false,
            seen_content: false,
            resolved: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// @ai:intent Record a diagnostic found by an earlier stage
    pub fn report(&mut self, kind: DiagnosticKind, line: usize, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(kind, &self.file, line, message));
    }

    /// @ai:intent Feed one annotation line
    /// @ai:pre lines are fed in increasing order
    /// @ai:effects mutates resolver state
    pub fn annotation(&mut self, line: usize, marker: MarkerKind, key: &str, payload: Payload) {
        match marker {
            MarkerKind::Inline => {
                if self.pending.is_empty() {
                    self.pending_is_first = !self.seen_content;
                }
                self.pending.push(PendingInline {
                    key: key.to_string(),
                    line,
                    payload,
                });
            }
            MarkerKind::BlockBegin => {
                // A second begin with an already-open key shadows it; `@!end`
                // closes the innermost one.
                self.stack.push(OpenFrame {
                    key: key.to_string(),
                    begin_line: line,
                    value: payload.value,
                    properties: payload.properties,
                    tags: payload.tags,
                });
            }
            MarkerKind::BlockEnd => self.close_block(line, key),
        }
        self.seen_content = true;
    }

    /// @ai:intent Feed a line with no code and no comment text
    pub fn blank(&mut self, _line: usize) {
        if !self.pending.is_empty() && self.pending_is_first {
            self.flush_pending(|_| (Scope::FileLevel, 0));
        }
    }

    /// @ai:intent Feed a non-blank line that is not an annotation
    pub fn content(&mut self, line: usize, text: &str) {
        if !self.pending.is_empty() {
            self.flush_pending(|_| {
                (
                    Scope::Declaration {
                        target: line,
                        text: text.to_string(),
                    },
                    line,
                )
            });
        }
        self.seen_content = true;
    }

    /// @ai:intent Close out the file and hand back everything resolved
    /// @ai:pre last_line is the number of lines in the file
    /// @ai:post the block stack and inline buffer are empty
    pub fn finish(mut self, last_line: usize) -> (Vec<Resolved>, Vec<Diagnostic>) {
        if !self.pending.is_empty() {
            if self.pending_is_first {
                self.flush_pending(|_| (Scope::FileLevel, 0));
            } else {
                let lines: Vec<(usize, String)> =
                    self.pending.iter().map(|p| (p.line, p.key.clone())).collect();
                for (line, key) in lines {
                    self.report(
                        DiagnosticKind::DanglingAnnotation,
                        line,
                        format!("`@!{}` has no following line to attach to", key),
                    );
                }
                self.flush_pending(|_| (Scope::Trailing, usize::MAX));
            }
        }

        let open = std::mem::take(&mut self.stack);
        for frame in open {
            self.report(
                DiagnosticKind::UnclosedBlock,
                frame.begin_line,
                format!(
                    "`@!begin {}` is never closed; region runs to end of file (line {})",
                    frame.key, last_line
                ),
            );
            let end = last_line.max(frame.begin_line);
            self.emit_region(frame, end, true);
        }

        (self.resolved, self.diagnostics)
    }

    fn close_block(&mut self, line: usize, key: &str) {
        match self.stack.iter().rposition(|frame| frame.key == key) {
            Some(idx) => {
                let frame = self.stack.remove(idx);
                self.emit_region(frame, line, false);
            }
            None => {
                let open: Vec<&str> = self.stack.iter().map(|f| f.key.as_str()).collect();
                let message = if open.is_empty() {
                    format!("`@!end {}` without a matching `@!begin {}`", key, key)
                } else {
                    format!(
                        "`@!end {}` without a matching `@!begin {}` (open blocks: {})",
                        key,
                        key,
                        open.join(", ")
                    )
                };
                self.report(DiagnosticKind::UnmatchedEnd, line, message);
            }
        }
    }

    fn emit_region(&mut self, frame: OpenFrame, end: usize, unclosed: bool) {
        let annotation = Annotation {
            key: frame.key,
            form: AnnotationForm::Block,
            value: frame.value,
            properties: frame.properties,
            tags: frame.tags,
            location: Location::new(self.file.clone(), frame.begin_line, end),
            scope: Scope::Region {
                start: frame.begin_line,
                end,
            },
            unclosed,
        };
        self.resolved.push(Resolved {
            anchor: frame.begin_line,
            marker_line: frame.begin_line,
            annotation,
        });
    }

    fn flush_pending(&mut self, scope_for: impl Fn(&PendingInline) -> (Scope, usize)) {
        for pending in std::mem::take(&mut self.pending) {
            let (scope, anchor) = scope_for(&pending);
            let annotation = Annotation {
                key: pending.key,
                form: AnnotationForm::Inline,
                value: pending.payload.value,
                properties: pending.payload.properties,
                tags: pending.payload.tags,
                location: Location::line(self.file.clone(), pending.line),
                scope,
                unclosed: false,
            };
            self.resolved.push(Resolved {
                anchor,
                marker_line: pending.line,
                annotation,
            });
        }
        self.pending_is_first = false;
    }
}
