//! Pariksha: an embeddable behavior-driven test execution engine.
//!
//! The [`engine`] builds a scope tree of groups and cases, executing
//! registration callbacks immediately and synchronously with per-level
//! before/after hooks and focus/exclusion/tag/name filtering. The
//! [`runner`] orchestrates whole files over a suite registry, sequentially
//! or on a worker pool, with module-cache [`isolation`] between files.

pub use crate::engine::results::Failure;
pub use crate::engine::Engine;
pub use crate::errors::ParikshaError;

pub mod cli;
pub mod engine;
pub mod errors;
pub mod isolation;
pub mod runner;
