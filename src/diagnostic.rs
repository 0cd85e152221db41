use std::cmp::Ordering;

use serde::Serialize;

use crate::source::{SourceMap, SourceSpan};
use crate::style::Style;

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Note,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Note => "note",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// A level-tagged message anchored at a source span, possibly carrying
/// sub-diagnostics whose level must be [`Level::Note`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub site: SourceSpan,
    pub notes: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, site: SourceSpan) -> Self {
        Diagnostic { level: Level::Error, message: message.into(), site, notes: Vec::new() }
    }

    pub fn warning(message: impl Into<String>, site: SourceSpan) -> Self {
        Diagnostic { level: Level::Warning, message: message.into(), site, notes: Vec::new() }
    }

    pub fn note(message: impl Into<String>, site: SourceSpan) -> Self {
        Diagnostic { level: Level::Note, message: message.into(), site, notes: Vec::new() }
    }

    pub fn with_note(mut self, note: Diagnostic) -> Self {
        debug_assert_eq!(note.level, Level::Note);
        self.notes.push(note);
        self
    }

    /// Total order: file name, then start position, then level from most to
    /// least severe, then message, then notes.
    pub fn compare_in(&self, other: &Diagnostic, sources: &SourceMap) -> Ordering {
        sources
            .name_of(self.site.source)
            .cmp(&sources.name_of(other.site.source))
            .then(self.site.start.cmp(&other.site.start))
            .then(other.level.cmp(&self.level))
            .then(self.message.cmp(&other.message))
            .then_with(|| {
                for (a, b) in self.notes.iter().zip(other.notes.iter()) {
                    let o = a.compare_in(b, sources);
                    if o != Ordering::Equal {
                        return o;
                    }
                }
                self.notes.len().cmp(&other.notes.len())
            })
    }

    /// Renders this diagnostic and its notes in the GNU style,
    /// `<file>:<line>.<column>[-<line>.<column>]: <level>: <message>`.
    pub fn render(&self, sources: &SourceMap, colors: bool) -> String {
        let mut out = String::new();
        self.render_into(&mut out, sources, colors);
        out
    }

    fn render_into(&self, out: &mut String, sources: &SourceMap, colors: bool) {
        let file = sources.file(self.site.source);
        let (line, column) = file.line_and_column(self.site.start);
        out.push_str(&sources.name_of(self.site.source));
        out.push_str(&format!(":{}.{}", line, column));
        if !self.site.is_empty() {
            let (end_line, end_column) = file.line_and_column(self.site.end);
            out.push_str(&format!("-{}.{}", end_line, end_column));
        }
        let label = self.level.label();
        let label = if colors {
            match self.level {
                Level::Error => Style::bold_red(label),
                Level::Warning => Style::yellow(label),
                Level::Note => Style::cyan(label),
            }
        } else {
            label.to_string()
        };
        out.push_str(&format!(": {}: {}\n", label, self.message));
        for note in &self.notes {
            note.render_into(out, sources, colors);
        }
    }
}

/// The diagnostics of one module, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSet {
    diagnostics: Vec<Diagnostic>,
    contains_error: bool,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, diagnostic: Diagnostic) {
        self.contains_error |= diagnostic.level == Level::Error;
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticSet) {
        self.contains_error |= other.contains_error;
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn contains_error(&self) -> bool {
        self.contains_error
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The diagnostics in their total order rather than insertion order.
    pub fn sorted(&self, sources: &SourceMap) -> Vec<&Diagnostic> {
        let mut items: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        items.sort_by(|a, b| a.compare_in(b, sources));
        items
    }
}
