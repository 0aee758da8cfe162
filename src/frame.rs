//! Stack frame and filtered-stack value types
//!
//! A captured call stack is reduced to an ordered list of `StackFrame`s,
//! outermost first. Frame-wise equality of that list is the deduplication
//! key used by the signature store: two stacks are the same signature iff
//! every frame matches in order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

/// A single filtered stack frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    /// Source file path of the frame
    pub location: String,
    /// Line number within the file
    pub line: u32,
    /// Enclosing function or scope name
    pub scope: String,
    /// Source text at the location (best-effort; empty when unavailable)
    pub source_text: String,
}

impl StackFrame {
    /// Create a new frame
    pub fn new(
        location: impl Into<String>,
        line: u32,
        scope: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        StackFrame {
            location: location.into(),
            line,
            scope: scope.into(),
            source_text: source_text.into(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File {}, line number {}, in {}\n\t{}",
            self.location, self.line, self.scope, self.source_text
        )
    }
}

/// An ordered sequence of filtered frames, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilteredStack {
    frames: Vec<StackFrame>,
}

impl FilteredStack {
    /// Build a stack from frames ordered outermost first
    pub fn new(frames: Vec<StackFrame>) -> Self {
        FilteredStack { frames }
    }

    /// Frames in outermost-first order
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when no frames survived filtering
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Render every frame for log output, one per line
    pub fn render(&self) -> String {
        let rendered: Vec<String> = self.frames.iter().map(|f| f.to_string()).collect();
        rendered.join("\n")
    }
}

/// Read the source line at `location:line`, if the file is readable.
///
/// Returns `None` on any failure (missing file, binary content, line past
/// end of file); callers degrade to an empty source text.
pub(crate) fn source_line(location: &str, line: u32) -> Option<String> {
    let index = (line as usize).checked_sub(1)?;
    let contents = fs::read_to_string(location).ok()?;
    contents.lines().nth(index).map(|l| l.trim().to_string())
}
