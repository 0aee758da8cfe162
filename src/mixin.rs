//! Persistence and query-manager interception adapters
//!
//! Thin wrappers that capture a call stack for the record's runtime type
//! before delegating. Return values and errors of the wrapped operation
//! pass through untouched; the wrappers observe, never alter.

use crate::capture::{default_engine, CaptureEngine};
use crate::entity::{EntityId, Tracked};

/// A record type offering persistence operations to be wrapped
pub trait Record: Tracked {
    /// Error type of the persistence operations
    type Error;

    /// Persist the record
    fn persist(&mut self) -> Result<(), Self::Error>;

    /// Remove the record
    fn remove(&mut self) -> Result<(), Self::Error>;
}

/// A query manager offering working-set materialization to be wrapped
pub trait QueryManager {
    /// Record type this manager materializes
    type Record: Tracked;
    /// Error type of materialization
    type Error;

    /// Materialize the manager's current working set
    fn working_set(&self) -> Result<Vec<Self::Record>, Self::Error>;
}

/// Tracks persist/remove call stacks of the wrapped record
#[derive(Debug)]
pub struct CallStackMixin<'e, R: Record> {
    engine: &'e CaptureEngine,
    inner: R,
}

impl<R: Record> CallStackMixin<'static, R> {
    /// Wrap `inner` on the process-scoped default engine
    pub fn new(inner: R) -> Self {
        Self::with_engine(default_engine(), inner)
    }
}

impl<'e, R: Record> CallStackMixin<'e, R> {
    /// Wrap `inner` on a specific engine
    pub fn with_engine(engine: &'e CaptureEngine, inner: R) -> Self {
        CallStackMixin { engine, inner }
    }

    /// The wrapped record
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// The wrapped record, mutably
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Capture for the record's type, then persist
    pub fn persist(&mut self) -> Result<(), R::Error> {
        self.engine.capture(EntityId::of_type::<R>());
        self.inner.persist()
    }

    /// Capture for the record's type, then remove
    pub fn remove(&mut self) -> Result<(), R::Error> {
        self.engine.capture(EntityId::of_type::<R>());
        self.inner.remove()
    }
}

/// Tracks working-set access through the wrapped manager.
///
/// The captured entity is the managed record's type, not the manager's,
/// so suppressing a record type also covers manager-driven access to it.
#[derive(Debug)]
pub struct CallStackManager<'e, M: QueryManager> {
    engine: &'e CaptureEngine,
    inner: M,
}

impl<M: QueryManager> CallStackManager<'static, M> {
    /// Wrap `inner` on the process-scoped default engine
    pub fn new(inner: M) -> Self {
        Self::with_engine(default_engine(), inner)
    }
}

impl<'e, M: QueryManager> CallStackManager<'e, M> {
    /// Wrap `inner` on a specific engine
    pub fn with_engine(engine: &'e CaptureEngine, inner: M) -> Self {
        CallStackManager { engine, inner }
    }

    /// The wrapped manager
    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Unwrap
    pub fn into_inner(self) -> M {
        self.inner
    }

    /// Capture for the managed record's type, then materialize
    pub fn working_set(&self) -> Result<Vec<M::Record>, M::Error> {
        self.engine.capture(EntityId::of_type::<M::Record>());
        self.inner.working_set()
    }
}
