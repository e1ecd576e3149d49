//! Module isolation between file executions.
//!
//! Each test file should observe fresh copies of non-framework modules;
//! otherwise module-level state leaks across files and test outcomes become
//! order-dependent. The [`IsolationManager`] keeps a monotonic protected
//! set (runtime built-ins, the framework itself, and everything already
//! cached when the manager was constructed) and purges every other cache
//! entry on demand.
//!
//! Contract: purge operations are not reentrant-safe against concurrent
//! holders of cache references. Call them between files, never while a file
//! is executing.

pub mod cache;

use crate::errors::ParikshaError;
use cache::ModuleCache;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Identifier prefixes that are always protected, seeded at construction.
/// A prefix protects the identifier itself and any `prefix.` descendant.
const BUILTIN_PREFIXES: &[&str] = &["pariksha", "std", "core", "alloc"];

/// Knobs for a purge pass.
#[derive(Debug, Clone, Copy)]
pub struct ResetOptions {
    /// Run a collection pass after removal.
    pub compact: bool,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self { compact: true }
    }
}

/// One row of the memory diagnostic, largest first.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleFootprint {
    pub module: String,
    pub bytes: usize,
}

/// Snapshot/protect/purge manager for a shared module cache.
pub struct IsolationManager {
    protected: BTreeSet<String>,
    /// Gate for the host-framework integration path only; direct calls to
    /// the purge operations ignore it.
    enabled: bool,
}

impl IsolationManager {
    /// Builds a manager whose protected set is seeded with the built-in
    /// prefixes plus every identifier cached right now. Pre-loaded
    /// infrastructure thereby survives later resets.
    pub fn new(cache: &ModuleCache) -> Self {
        let mut protected: BTreeSet<String> = BTreeSet::new();
        for name in cache.cached_modules() {
            protected.insert(name);
        }
        debug!(seeded = protected.len(), "isolation manager initialized");
        Self {
            protected,
            enabled: false,
        }
    }

    /// Enables or disables the host-framework integration path.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Marks an identifier as protected. Monotonic and idempotent; returns
    /// true when the identifier is newly protected.
    pub fn protect(&mut self, name: impl Into<String>) -> bool {
        self.protected.insert(name.into())
    }

    /// Alias kept for host frameworks that use the long name.
    pub fn add_protected_module(&mut self, name: impl Into<String>) -> bool {
        self.protect(name)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        if self.protected.contains(name) {
            return true;
        }
        BUILTIN_PREFIXES.iter().any(|prefix| {
            name == *prefix
                || (name.starts_with(prefix) && name.as_bytes().get(prefix.len()) == Some(&b'.'))
        })
    }

    pub fn protected_modules(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(String::as_str)
    }

    /// Removes every cached identifier not in the protected set, then runs
    /// one collection pass. Returns the number removed. Idempotent: a clean
    /// cache returns 0, never an error.
    pub fn reset_all(&self, cache: &mut ModuleCache, opts: &ResetOptions) -> usize {
        let victims: Vec<String> = cache
            .cached_modules()
            .into_iter()
            .filter(|name| !self.is_protected(name))
            .collect();
        let removed = victims.len();
        for name in victims {
            cache.remove(&name);
        }
        if opts.compact {
            cache.compact();
        }
        debug!(removed, remaining = cache.len(), "module cache purged");
        removed
    }

    /// Same as [`reset_all`](Self::reset_all), scoped to identifiers
    /// matching `pattern`. An invalid pattern is a validation failure, not
    /// a silent empty match.
    pub fn reset_pattern(
        &self,
        cache: &mut ModuleCache,
        pattern: &str,
        opts: &ResetOptions,
    ) -> Result<usize, ParikshaError> {
        let matcher =
            Regex::new(pattern).map_err(|e| ParikshaError::invalid_pattern(pattern, &e))?;
        let victims: Vec<String> = cache
            .cached_modules()
            .into_iter()
            .filter(|name| matcher.is_match(name) && !self.is_protected(name))
            .collect();
        let removed = victims.len();
        for name in victims {
            cache.remove(&name);
        }
        if opts.compact {
            cache.compact();
        }
        debug!(removed, pattern, "module cache purged by pattern");
        Ok(removed)
    }

    /// Diagnostic only: per-module footprint deltas, largest first.
    ///
    /// Each non-protected module is evicted, the cache runs a collection
    /// pass, the footprint delta is measured, and the entry is restored.
    /// The numbers are inherently approximate: substructure shared between
    /// modules cannot be cleanly attributed to either one.
    pub fn analyze_memory_usage(&self, cache: &mut ModuleCache) -> Vec<ModuleFootprint> {
        let mut rows = Vec::new();
        for name in cache.cached_modules() {
            if self.is_protected(&name) {
                continue;
            }
            let before = cache.total_footprint();
            let Some(entry) = cache.remove(&name) else {
                continue;
            };
            cache.compact();
            let bytes = before.saturating_sub(cache.total_footprint());
            cache.insert(name.clone(), entry);
            rows.push(ModuleFootprint {
                module: name,
                bytes,
            });
        }
        rows.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.module.cmp(&b.module)));
        rows
    }

    /// Host-framework integration point. Runs after the host's own reset
    /// logic and purges only when explicitly enabled, so wiring the manager
    /// in changes nothing until the host opts in.
    pub fn on_host_reset(&self, cache: &mut ModuleCache) -> usize {
        if !self.enabled {
            return 0;
        }
        self.reset_all(cache, &ResetOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::cache::ModuleEntry;
    use std::sync::Arc;

    fn entry(footprint: usize) -> ModuleEntry {
        ModuleEntry::new(Arc::new(()), footprint)
    }

    fn cache_with(names: &[(&str, usize)]) -> ModuleCache {
        let mut cache = ModuleCache::new();
        for (name, footprint) in names {
            cache.insert(*name, entry(*footprint));
        }
        cache
    }

    #[test]
    fn construction_seeds_preloaded_modules() {
        let cache = cache_with(&[("infra.logger", 10)]);
        let manager = IsolationManager::new(&cache);
        assert!(manager.is_protected("infra.logger"));
        assert!(manager.is_protected("pariksha.engine"));
        assert!(!manager.is_protected("user.widget"));
    }

    #[test]
    fn prefix_protection_requires_a_segment_boundary() {
        let manager = IsolationManager::new(&ModuleCache::new());
        assert!(manager.is_protected("std"));
        assert!(manager.is_protected("std.io"));
        assert!(!manager.is_protected("stdx"));
    }

    #[test]
    fn protect_is_monotonic_and_idempotent() {
        let mut manager = IsolationManager::new(&ModuleCache::new());
        assert!(manager.protect("user.db"));
        assert!(!manager.protect("user.db"));
        assert!(!manager.add_protected_module("user.db"));
        assert!(manager.is_protected("user.db"));
    }

    #[test]
    fn reset_all_spares_protected_entries() {
        let mut cache = cache_with(&[("infra.logger", 1), ("user.a", 1), ("user.b", 1)]);
        let manager = IsolationManager::new(&cache_with(&[("infra.logger", 1)]));

        let removed = manager.reset_all(&mut cache, &ResetOptions::default());
        assert_eq!(removed, 2);
        assert!(cache.contains("infra.logger"));
        assert!(!cache.contains("user.a"));

        // Second pass with nothing newly loaded is a no-op.
        assert_eq!(manager.reset_all(&mut cache, &ResetOptions::default()), 0);
    }

    #[test]
    fn reset_pattern_scopes_the_purge() {
        let mut cache = cache_with(&[("user.a", 1), ("user.b", 1), ("other.c", 1)]);
        let manager = IsolationManager::new(&ModuleCache::new());

        let removed = manager
            .reset_pattern(&mut cache, "^user\\.", &ResetOptions::default())
            .unwrap();
        assert_eq!(removed, 2);
        assert!(cache.contains("other.c"));
    }

    #[test]
    fn invalid_pattern_is_a_validation_error() {
        let mut cache = ModuleCache::new();
        let manager = IsolationManager::new(&cache_with(&[]));
        assert!(matches!(
            manager.reset_pattern(&mut cache, "(", &ResetOptions::default()),
            Err(ParikshaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn memory_analysis_sorts_descending_and_restores() {
        let mut cache = cache_with(&[("user.small", 10), ("user.big", 1000), ("user.mid", 100)]);
        let manager = IsolationManager::new(&ModuleCache::new());

        let rows = manager.analyze_memory_usage(&mut cache);
        let names: Vec<&str> = rows.iter().map(|r| r.module.as_str()).collect();
        assert_eq!(names, vec!["user.big", "user.mid", "user.small"]);
        assert_eq!(rows[0].bytes, 1000);
        // Every entry restored after measurement.
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn host_reset_is_gated_on_enable() {
        let mut cache = cache_with(&[("user.a", 1)]);
        let mut manager = IsolationManager::new(&ModuleCache::new());

        assert_eq!(manager.on_host_reset(&mut cache), 0);
        assert!(cache.contains("user.a"));

        manager.set_enabled(true);
        assert_eq!(manager.on_host_reset(&mut cache), 1);
        assert!(!cache.contains("user.a"));
    }
}
