//! The suite registry: the "loadable test file" abstraction.
//!
//! A test file is a path string bound to a suite function. Loading a file
//! means looking its path up here and invoking the function against a fresh
//! engine and module cache; a path with no entry is a load failure at the
//! file-runner boundary. Embedders register suites at startup, keyed by the
//! on-disk path of the file that defines them.

use crate::engine::Engine;
use crate::errors::ParikshaError;
use crate::isolation::cache::ModuleCache;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// A registered test file body.
pub type SuiteFn = Arc<dyn Fn(&mut Engine, &mut ModuleCache) + Send + Sync>;

/// Path -> suite map, shareable across worker threads.
#[derive(Default)]
pub struct SuiteRegistry {
    suites: RwLock<BTreeMap<String, SuiteFn>>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the CLI entrypoint.
    pub fn global() -> Arc<SuiteRegistry> {
        static GLOBAL: Lazy<Arc<SuiteRegistry>> = Lazy::new(|| Arc::new(SuiteRegistry::new()));
        Arc::clone(&GLOBAL)
    }

    /// Binds a suite function to a path. Re-registering a path replaces the
    /// previous suite.
    pub fn register(
        &self,
        path: impl Into<String>,
        suite: impl Fn(&mut Engine, &mut ModuleCache) + Send + Sync + 'static,
    ) -> Result<(), ParikshaError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ParikshaError::usage("suite path must not be empty"));
        }
        let mut suites = self
            .suites
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if suites.insert(path.clone(), Arc::new(suite)).is_some() {
            warn!(path = %path, "suite re-registered; previous definition replaced");
        }
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Option<SuiteFn> {
        self.suites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Registered paths in sorted order (deterministic execution order).
    pub fn paths(&self) -> Vec<String> {
        self.suites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.suites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_round_trip() {
        let registry = SuiteRegistry::new();
        registry
            .register("tests/unit/a_spec", |_, _| {})
            .unwrap();
        assert!(registry.lookup("tests/unit/a_spec").is_some());
        assert!(registry.lookup("tests/unit/missing").is_none());
    }

    #[test]
    fn empty_path_is_a_usage_error() {
        let registry = SuiteRegistry::new();
        assert!(registry.register("", |_, _| {}).is_err());
    }

    #[test]
    fn paths_are_sorted() {
        let registry = SuiteRegistry::new();
        registry.register("b_spec", |_, _| {}).unwrap();
        registry.register("a_spec", |_, _| {}).unwrap();
        assert_eq!(registry.paths(), vec!["a_spec", "b_spec"]);
    }
}
