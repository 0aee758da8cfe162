//! Stack signature store
//!
//! Process-wide record of the distinct filtered stacks observed per tracked
//! entity, in first-seen order. Entries never shrink; growth is bounded by
//! the number of distinct call sites in the source, not by call volume.

use crate::entity::EntityId;
use crate::frame::FilteredStack;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Insertion-ordered distinct stacks per entity
#[derive(Debug, Default)]
pub struct SignatureStore {
    book: Mutex<HashMap<EntityId, Vec<FilteredStack>>>,
}

impl SignatureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another thread panicked mid-capture; the
    // book itself is always structurally valid, so keep serving it.
    fn book(&self) -> MutexGuard<'_, HashMap<EntityId, Vec<FilteredStack>>> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff `stack` has already been recorded for `entity`
    pub fn has_seen(&self, entity: &EntityId, stack: &FilteredStack) -> bool {
        self.book()
            .get(entity)
            .is_some_and(|stacks| stacks.contains(stack))
    }

    /// Append `stack` if it is novel for `entity`.
    ///
    /// Returns the 1-based distinct-stack count on first sight, `None` when
    /// the stack was already recorded. The novelty check and the append are
    /// one critical section, so concurrent captures of the same stack
    /// produce exactly one entry and no skipped sequence numbers.
    pub fn record_if_novel(&self, entity: &EntityId, stack: FilteredStack) -> Option<usize> {
        let mut book = self.book();
        let stacks = book.entry(entity.clone()).or_default();
        if stacks.contains(&stack) {
            return None;
        }
        stacks.push(stack);
        Some(stacks.len())
    }

    /// Every distinct stack recorded for `entity`, in first-seen order
    pub fn distinct_stacks_for(&self, entity: &EntityId) -> Vec<FilteredStack> {
        self.book().get(entity).cloned().unwrap_or_default()
    }

    /// Number of distinct stacks recorded for `entity`
    pub fn distinct_count(&self, entity: &EntityId) -> usize {
        self.book().get(entity).map_or(0, Vec::len)
    }
}
