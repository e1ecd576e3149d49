//! The shared module cache.
//!
//! Stands in for the host runtime's loaded-module table: `require` returns
//! the cached value for an identifier or runs its registered loader and
//! caches the result. Test files observe module-level state through this
//! cache, which is exactly why the isolation manager purges it between
//! files.
//!
//! A process-wide default instance exists for host-framework embedding
//! ([`ModuleCache::global`]); the orchestrator owns per-run instances, and
//! parallel workers each construct their own (shared-nothing).

use crate::errors::ParikshaError;
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An opaque module value as seen by test code.
pub type ModuleValue = Arc<dyn Any + Send + Sync>;

/// Produces a module entry on demand. Runs again after a purge, which is
/// how a purged module comes back fresh.
pub type ModuleLoader = Arc<dyn Fn() -> Result<ModuleEntry, String> + Send + Sync>;

/// A cached module plus its estimated resident footprint in bytes.
///
/// The footprint is an estimate supplied by the loader; shared substructure
/// cannot be attributed to a single module, so it is never treated as
/// precise accounting.
#[derive(Clone)]
pub struct ModuleEntry {
    pub value: ModuleValue,
    pub footprint: usize,
}

impl ModuleEntry {
    pub fn new(value: ModuleValue, footprint: usize) -> Self {
        Self { value, footprint }
    }
}

/// Identifier -> entry map plus registered loaders.
#[derive(Default)]
pub struct ModuleCache {
    entries: HashMap<String, ModuleEntry>,
    loaders: HashMap<String, ModuleLoader>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default cache.
    pub fn global() -> &'static Mutex<ModuleCache> {
        static GLOBAL: Lazy<Mutex<ModuleCache>> = Lazy::new(|| Mutex::new(ModuleCache::new()));
        &GLOBAL
    }

    /// Registers (or replaces) the loader for an identifier.
    pub fn register_loader(&mut self, name: impl Into<String>, loader: ModuleLoader) {
        self.loaders.insert(name.into(), loader);
    }

    /// Returns the cached value, loading and caching it on a miss.
    pub fn require(&mut self, name: &str) -> Result<ModuleValue, ParikshaError> {
        if let Some(entry) = self.entries.get(name) {
            return Ok(entry.value.clone());
        }
        let loader = self
            .loaders
            .get(name)
            .cloned()
            .ok_or_else(|| ParikshaError::ModuleLoad {
                name: name.to_string(),
                message: "no loader registered".to_string(),
            })?;
        let entry = loader().map_err(|message| ParikshaError::ModuleLoad {
            name: name.to_string(),
            message,
        })?;
        let value = entry.value.clone();
        self.entries.insert(name.to_string(), entry);
        Ok(value)
    }

    /// Caches an already-constructed module directly.
    pub fn insert(&mut self, name: impl Into<String>, entry: ModuleEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<ModuleEntry> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached identifiers in unspecified order.
    pub fn cached_modules(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Sum of footprint estimates for all cached entries.
    pub fn total_footprint(&self) -> usize {
        self.entries.values().map(|e| e.footprint).sum()
    }

    /// One collection pass after a purge: releases map capacity held for
    /// entries that no longer exist.
    pub fn compact(&mut self) {
        self.entries.shrink_to_fit();
    }
}
