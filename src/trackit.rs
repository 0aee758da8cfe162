//! Callable interception: `trackit`, `donottrack`, `track_till_now`
//!
//! `trackit` wraps an arbitrary callable under a
//! `"<module-path>.<qualified-name>"` identity. The callable's binding
//! kind is declared up front as an explicit strategy instead of being
//! sniffed at call time; constructor invocations skip capture, every other
//! kind captures before delegating.
//!
//! `donottrack` opens a suppression scope around a call. For callables
//! that return a lazily produced sequence, `donottrack_iter` defers the
//! scope's end to the sequence's exhaustion or teardown rather than the
//! wrapping call's return.

use crate::capture::{default_engine, CaptureEngine};
use crate::entity::EntityId;
use crate::suppress::{self, SuppressedIter, SuppressedSet};

/// How a wrapped callable is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    /// Free function
    Function,
    /// Method bound to an instance
    InstanceMethod,
    /// Method associated with the type itself
    ClassMethod,
    /// Direct type construction; capture is skipped for these
    Constructor,
}

/// Wrapper around an arbitrary callable, keyed by qualified name
#[derive(Debug)]
pub struct TrackedCall<'e> {
    engine: &'e CaptureEngine,
    kind: CallableKind,
    entity: EntityId,
}

impl TrackedCall<'static> {
    /// Wrap on the process-scoped default engine
    pub fn new(kind: CallableKind, module_path: &str, qualname: &str) -> Self {
        Self::with_engine(default_engine(), kind, module_path, qualname)
    }
}

impl<'e> TrackedCall<'e> {
    /// Wrap on a specific engine
    pub fn with_engine(
        engine: &'e CaptureEngine,
        kind: CallableKind,
        module_path: &str,
        qualname: &str,
    ) -> Self {
        TrackedCall {
            engine,
            kind,
            entity: EntityId::named(module_path, qualname),
        }
    }

    /// The callable's identity
    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    /// The declared binding kind
    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Capture (unless a constructor invocation), then delegate.
    /// The delegate's return value passes through untouched.
    pub fn invoke<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.kind != CallableKind::Constructor {
            self.engine.capture(self.entity.clone());
        }
        f()
    }
}

/// Shorthand for a free-function wrapper on the default engine
pub fn trackit(module_path: &str, qualname: &str) -> TrackedCall<'static> {
    TrackedCall::new(CallableKind::Function, module_path, qualname)
}

/// Run `f` with `entities` suppressed on the current thread.
///
/// An empty list suppresses everything (the non-parameterized mode). The
/// scope ends when `f` returns or unwinds; the result passes through
/// untouched.
pub fn donottrack<R>(entities: Vec<EntityId>, f: impl FnOnce() -> R) -> R {
    let _guard = suppress::suppress(SuppressedSet::from_entities(entities));
    f()
}

/// Suppression scope for a callable producing a lazy sequence.
///
/// The scope opens before `f` runs and stays live for every resumption of
/// the returned iterator; it ends when the iterator is exhausted or
/// dropped, not when this call returns the handle.
pub fn donottrack_iter<I: Iterator>(
    entities: Vec<EntityId>,
    f: impl FnOnce() -> I,
) -> SuppressedIter<I> {
    let guard = suppress::suppress(SuppressedSet::from_entities(entities));
    let inner = f();
    SuppressedIter::new(inner, guard)
}

/// Log the full distinct-stack history recorded so far for each entity,
/// without mutating any state
pub fn track_till_now(entities: &[EntityId]) {
    default_engine().report(entities);
}
