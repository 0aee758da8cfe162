//! Frame filtering with regex ignore-patterns
//!
//! Raw stacks are noisy: toolchain frames, dependency frames, and this
//! crate's own capture machinery appear on every capture. The filter drops
//! every frame whose source location matches one of an ordered list of
//! regex ignore-patterns, leaving only the application frames that make a
//! call site distinctive.
//!
//! An invalid pattern is a configuration error and fails at construction,
//! never at capture time.

use crate::frame::{FilteredStack, StackFrame};
use regex::Regex;
use thiserror::Error;

/// Default ignore-patterns: toolchain and standard-library frames,
/// dependency frames from the cargo registry, and this crate's own frames.
/// The self-exclusion pattern covers registry (`huella-0.2.1/src/`),
/// path/workspace (`huella/src/`), and git-checkout
/// (`huella-<hash>/<rev>/src/`) layouts.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    r"^/rustc/.*$",
    r"^.*/library/(std|core|alloc)/src/.*$",
    r"^.*/\.cargo/registry/.*$",
    r"^.*/huella[^/]*(/[0-9a-f]+)?/src/.*$",
];

/// An ignore-pattern failed to compile
#[derive(Debug, Error)]
#[error("invalid ignore-pattern `{pattern}`: {source}")]
pub struct InvalidPatternError {
    /// The offending pattern text
    pub pattern: String,
    /// Underlying regex compilation error
    #[source]
    pub source: regex::Error,
}

/// Filter that decides which stack frames are noise
#[derive(Debug, Clone)]
pub struct FrameFilter {
    patterns: Vec<Regex>,
}

impl FrameFilter {
    /// Compile an ordered list of ignore-patterns, failing fast on the
    /// first invalid regex.
    pub fn new<I, S>(patterns: I) -> Result<Self, InvalidPatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| InvalidPatternError {
                pattern: pattern.to_string(),
                source,
            })?;
            compiled.push(regex);
        }
        Ok(FrameFilter { patterns: compiled })
    }

    /// Filter with [`DEFAULT_IGNORE_PATTERNS`]
    pub fn with_defaults() -> Self {
        // Compile-time constants, known valid
        Self::new(DEFAULT_IGNORE_PATTERNS.iter().copied())
            .expect("default ignore-patterns compile")
    }

    /// Filter that keeps every frame
    pub fn permissive() -> Self {
        FrameFilter { patterns: Vec::new() }
    }

    /// True when a frame at `location` should be dropped
    pub fn is_ignored(&self, location: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(location))
    }

    /// Drop every frame matching an ignore-pattern, preserving order.
    /// Input is outermost first; so is the output.
    pub fn filter<I>(&self, raw: I) -> FilteredStack
    where
        I: IntoIterator<Item = StackFrame>,
    {
        let kept: Vec<StackFrame> = raw
            .into_iter()
            .filter(|frame| !self.is_ignored(&frame.location))
            .collect();
        FilteredStack::new(kept)
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
