//! Huella - call-stack tracking for instrumented operations
//!
//! This library records, deduplicates, and logs the call stacks that lead
//! to tracked operations: record persistence, query-manager working-set
//! access, and arbitrary instrumented callables. Noise frames are removed
//! with configurable ignore-patterns, each distinct filtered stack is
//! recorded once per entity, and stack-scoped suppression excludes known
//! call sites, including across lazily produced sequences.

pub mod capture;
pub mod entity;
pub mod filter;
pub mod frame;
pub mod mixin;
pub mod store;
pub mod suppress;
pub mod trackit;
