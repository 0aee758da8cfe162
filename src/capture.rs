//! Capture engine
//!
//! Orchestrates one "should this call be recorded" decision: suppression
//! check, stack capture and filtering, novelty lookup, and first-sight
//! logging. Capture is strictly best-effort instrumentation; nothing in
//! here is allowed to propagate a failure into the wrapped operation.
//!
//! Engines are plain objects so tests can run against a fresh instance;
//! [`default_engine`] is the process-scoped one the convenience adapters
//! use.

use crate::entity::EntityId;
use crate::filter::FrameFilter;
use crate::frame::{source_line, FilteredStack, StackFrame};
use crate::store::SignatureStore;
use crate::suppress;
use anyhow::{bail, Result};
use backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Records and logs novel call stacks per tracked entity
#[derive(Debug)]
pub struct CaptureEngine {
    filter: FrameFilter,
    store: SignatureStore,
    enabled: AtomicBool,
}

impl CaptureEngine {
    /// Engine with the given frame filter and an empty store
    pub fn new(filter: FrameFilter) -> Self {
        CaptureEngine {
            filter,
            store: SignatureStore::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Master tracking switch; when off, capture is a no-op
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Current state of the master switch
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// The engine's signature store
    pub fn store(&self) -> &SignatureStore {
        &self.store
    }

    /// Record and log the current call stack for `entity` on first sight.
    ///
    /// Does nothing when tracking is off, the current thread suppresses
    /// `entity`, or the stack was already recorded. Stack-capture failures
    /// are logged as warnings and swallowed; this never propagates an
    /// error into the wrapped operation.
    pub fn capture(&self, entity: EntityId) {
        if !self.is_enabled() || suppress::thread_is_suppressed(&entity) {
            return;
        }
        let stack = match self.current_filtered_stack() {
            Ok(stack) => stack,
            Err(err) => {
                warn!(
                    entity = entity.display_name(),
                    "call-stack capture failed: {err:#}"
                );
                return;
            }
        };
        if let Some(sequence) = self.store.record_if_novel(&entity, stack.clone()) {
            info!(
                "Logging new call stack #{} for {}:\n{}",
                sequence,
                entity.display_name(),
                stack.render()
            );
        }
    }

    /// Log every distinct stack recorded so far for each entity, without
    /// mutating any state. Entities with no recorded stacks are skipped.
    pub fn report(&self, entities: &[EntityId]) {
        for entity in entities {
            let stacks = self.store.distinct_stacks_for(entity);
            if stacks.is_empty() {
                continue;
            }
            let rendered: Vec<String> = stacks
                .iter()
                .enumerate()
                .map(|(i, stack)| format!("#{}\n{}", i + 1, stack.render()))
                .collect();
            info!(
                "Logging unique call stacks of {}:\n{}",
                entity.display_name(),
                rendered.join("\n")
            );
        }
    }

    /// Capture the current stack, resolve symbols, and filter noise.
    ///
    /// Frames come back innermost first from the host facility and are
    /// reversed to the outermost-first order signatures use. Frames with
    /// no resolvable source location are unsymbolized noise and dropped;
    /// a stack with nothing resolvable at all is an error (stripped
    /// binary, missing debug info) reported to the caller.
    fn current_filtered_stack(&self) -> Result<FilteredStack> {
        let backtrace = Backtrace::new();
        let mut frames = Vec::new();
        let mut resolved_any = false;
        for frame in backtrace.frames() {
            for symbol in frame.symbols() {
                let Some(path) = symbol.filename() else {
                    continue;
                };
                resolved_any = true;
                let location = path.display().to_string();
                if self.filter.is_ignored(&location) {
                    continue;
                }
                let scope = symbol
                    .name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let line = symbol.lineno().unwrap_or(0);
                let source_text = source_line(&location, line).unwrap_or_default();
                frames.push(StackFrame::new(location, line, scope, source_text));
            }
        }
        if !resolved_any {
            bail!("stack inspection returned no resolvable frames");
        }
        frames.reverse();
        Ok(FilteredStack::new(frames))
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        Self::new(FrameFilter::with_defaults())
    }
}

static DEFAULT_ENGINE: OnceLock<CaptureEngine> = OnceLock::new();

/// Process-scoped engine with the default ignore-patterns, created on
/// first use and never torn down
pub fn default_engine() -> &'static CaptureEngine {
    DEFAULT_ENGINE.get_or_init(CaptureEngine::default)
}
