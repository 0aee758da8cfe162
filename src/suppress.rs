//! Stack-scoped suppression of capture
//!
//! A suppression scope disables capture for a set of entities (or for
//! everything) over a dynamic extent. Scopes nest; the effective suppressed
//! set is the union of every live frame, computed at query time so that
//! popping one frame restores exactly the state the remaining frames
//! describe. The stack is confined to its thread: one thread's scopes are
//! never observed by another.
//!
//! Scope discipline is RAII. [`suppress`] pushes a frame and returns a
//! guard whose drop removes it, so returns, panics, and abandoned
//! iterators all release exactly once. Each frame carries a token and the
//! guard removes the frame *it* pushed, so overlapping scopes (two lazy
//! sequences released out of creation order) each end exactly their own
//! extent without disturbing the frames still open. [`SuppressedIter`]
//! extends a scope over lazy production: the frame stays live across
//! every resumption of the underlying iterator and is released on
//! exhaustion or teardown, not when the wrapping call returns the handle.

use crate::entity::EntityId;
use std::cell::RefCell;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::warn;

/// Pop called on an empty suppression stack; adapter misuse, propagates
#[derive(Debug, Error, PartialEq, Eq)]
#[error("suppression stack popped without a matching push")]
pub struct UnbalancedStackError;

/// One pushed frame: a finite entity set or everything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressedSet {
    /// Suppress the listed entities only
    Entities(Vec<EntityId>),
    /// Suppress every entity (the non-parameterized mode)
    Universal,
}

impl SuppressedSet {
    /// Build a frame from a list of entities; an empty list means
    /// suppress everything
    pub fn from_entities(entities: Vec<EntityId>) -> Self {
        if entities.is_empty() {
            SuppressedSet::Universal
        } else {
            SuppressedSet::Entities(entities)
        }
    }

    /// Membership, with subtype matching for type entities
    pub fn contains(&self, entity: &EntityId) -> bool {
        match self {
            SuppressedSet::Universal => true,
            SuppressedSet::Entities(list) => list.iter().any(|s| matches(s, entity)),
        }
    }
}

fn matches(suppressed: &EntityId, candidate: &EntityId) -> bool {
    match (suppressed, candidate) {
        (EntityId::Type(s), EntityId::Type(c)) => c.is_subtype_of(s.type_id()),
        _ => suppressed == candidate,
    }
}

/// Names the frame a single push created; removal is keyed, not positional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken(u64);

/// Nestable stack of suppression frames.
///
/// Frames stay independent; the effective set is unioned lazily at query
/// time, so removing one frame restores exactly the remaining frames'
/// coverage.
#[derive(Debug, Default)]
pub struct SuppressionStack {
    frames: Vec<(FrameToken, SuppressedSet)>,
    next_token: u64,
}

impl SuppressionStack {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame, returning the token that names it
    pub fn push(&mut self, set: SuppressedSet) -> FrameToken {
        let token = FrameToken(self.next_token);
        self.next_token += 1;
        self.frames.push((token, set));
        token
    }

    /// Pop the most recently pushed frame
    pub fn pop(&mut self) -> Result<SuppressedSet, UnbalancedStackError> {
        self.frames
            .pop()
            .map(|(_, set)| set)
            .ok_or(UnbalancedStackError)
    }

    /// Remove the frame `token` names, wherever it sits. Overlapping
    /// scopes may end out of creation order without disturbing the
    /// frames still open.
    pub fn remove(&mut self, token: FrameToken) -> Result<SuppressedSet, UnbalancedStackError> {
        let index = self
            .frames
            .iter()
            .position(|(t, _)| *t == token)
            .ok_or(UnbalancedStackError)?;
        Ok(self.frames.remove(index).1)
    }

    /// Number of live frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// True when no frame is live
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when any live frame suppresses `entity`
    pub fn is_suppressed(&self, entity: &EntityId) -> bool {
        self.frames.iter().any(|(_, set)| set.contains(entity))
    }

    /// The set currently in effect: the union of every live frame, with
    /// any universal frame subsuming the rest
    pub fn effective_suppressed_set(&self) -> SuppressedSet {
        let mut union = Vec::new();
        for (_, set) in &self.frames {
            match set {
                SuppressedSet::Universal => return SuppressedSet::Universal,
                SuppressedSet::Entities(list) => {
                    for entity in list {
                        if !union.contains(entity) {
                            union.push(entity.clone());
                        }
                    }
                }
            }
        }
        SuppressedSet::Entities(union)
    }
}

thread_local! {
    static SUPPRESSION: RefCell<SuppressionStack> = RefCell::new(SuppressionStack::new());
}

/// Push a frame onto the current thread's stack; the returned guard
/// removes that frame on drop.
pub fn suppress(set: SuppressedSet) -> SuppressionGuard {
    let token = SUPPRESSION.with(|s| s.borrow_mut().push(set));
    SuppressionGuard {
        token,
        released: false,
        _not_send: PhantomData,
    }
}

/// True when the current thread suppresses `entity`
pub fn thread_is_suppressed(entity: &EntityId) -> bool {
    SUPPRESSION.with(|s| s.borrow().is_suppressed(entity))
}

/// Live frame count on the current thread's stack
pub fn thread_depth() -> usize {
    SUPPRESSION.with(|s| s.borrow().depth())
}

/// RAII token for one frame on the current thread's stack.
///
/// Removes exactly the frame its `suppress` call pushed, so guards may be
/// released in any order. Not `Send`: the removal must happen on the
/// thread that pushed.
#[derive(Debug)]
pub struct SuppressionGuard {
    token: FrameToken,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl SuppressionGuard {
    /// End the scope now instead of at drop
    pub fn release(mut self) {
        self.remove_now();
    }

    fn remove_now(&mut self) {
        if !self.released {
            self.released = true;
            let removed = SUPPRESSION.with(|s| s.borrow_mut().remove(self.token));
            if removed.is_err() {
                // someone manually popped the frame out from under its guard
                warn!("suppression frame removed before its guard released");
            }
        }
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.remove_now();
    }
}

/// Iterator wrapper that keeps a suppression frame live across lazy
/// production.
///
/// The frame is released when the inner iterator reports exhaustion, or at
/// drop if the sequence is abandoned early (including by a panic during
/// iteration).
#[derive(Debug)]
pub struct SuppressedIter<I> {
    inner: I,
    guard: Option<SuppressionGuard>,
}

impl<I> SuppressedIter<I> {
    /// Wrap `inner`, holding `guard` until exhaustion or drop
    pub fn new(inner: I, guard: SuppressionGuard) -> Self {
        SuppressedIter {
            inner,
            guard: Some(guard),
        }
    }
}

impl<I: Iterator> Iterator for SuppressedIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let item = self.inner.next();
        if item.is_none() {
            // exhaustion ends the scope; drop covers abandonment
            if let Some(guard) = self.guard.take() {
                guard.release();
            }
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
