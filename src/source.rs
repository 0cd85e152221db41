use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The logical name of a source file: a path on disk, or a numeric identifier
/// for sources synthesized in memory (tests, virtual inputs, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceName {
    Local(PathBuf),
    Virtual(u32),
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceName::Local(path) => write!(f, "{}", path.display()),
            SourceName::Virtual(id) => write!(f, "virtual://{}", id),
        }
    }
}

/// An immutable UTF-8 source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: SourceName,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: SourceName, text: impl Into<String>) -> Self {
        SourceFile { name, text: text.into() }
    }

    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The text covered by `span`, which must lie within this file.
    pub fn text_of(&self, span: SourceSpan) -> &str {
        &self.text[span.start as usize..span.end as usize]
    }

    /// 1-based line and column of a byte index.
    pub fn line_and_column(&self, index: u32) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for (i, c) in self.text.char_indices() {
            if i as u32 >= index {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

/// A position in a source file, identified by index into the program's
/// source map and a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    pub source: u32,
    pub index: u32,
}

/// A half-open byte range within a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceSpan {
    pub source: u32,
    pub start: u32,
    pub end: u32,
}

impl SourceSpan {
    pub fn new(source: u32, start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        SourceSpan { source, start, end }
    }

    /// An empty span anchored at `position`.
    pub fn empty_at(position: SourcePosition) -> Self {
        SourceSpan { source: position.source, start: position.index, end: position.index }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn start_position(&self) -> SourcePosition {
        SourcePosition { source: self.source, index: self.start }
    }

    pub fn end_position(&self) -> SourcePosition {
        SourcePosition { source: self.source, index: self.end }
    }

    pub fn intersects(&self, other: SourceSpan) -> bool {
        self.source == other.source && self.start < other.end && other.start < self.end
    }

    pub fn intersection(&self, other: SourceSpan) -> Option<SourceSpan> {
        if !self.intersects(other) {
            return None;
        }
        Some(SourceSpan {
            source: self.source,
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// The smallest span covering both `self` and `other`.
    pub fn extended_to_cover(&self, other: SourceSpan) -> SourceSpan {
        debug_assert_eq!(self.source, other.source);
        SourceSpan {
            source: self.source,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// `self` with its upper bound raised to `index`.
    pub fn extended_up_to(&self, index: u32) -> SourceSpan {
        debug_assert!(index >= self.start);
        SourceSpan { source: self.source, start: self.start, end: index }
    }

    pub fn covers(&self, other: SourceSpan) -> bool {
        self.source == other.source && self.start <= other.start && other.end <= self.end
    }
}

/// The program-wide registry of source files. The index of a file doubles as
/// the module index of the module parsed from it.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: SourceFile) -> u32 {
        let id = self.files.len() as u32;
        self.files.push(file);
        id
    }

    pub fn file(&self, id: u32) -> &SourceFile {
        &self.files[id as usize]
    }

    pub fn name_of(&self, id: u32) -> String {
        self.files[id as usize].name.to_string()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
