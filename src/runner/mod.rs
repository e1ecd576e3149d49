//! File runner and suite orchestrator.
//!
//! `run_file` executes one registered suite as an isolated unit: reset the
//! engine, purge non-protected modules, invoke the suite body, read the
//! counters back. `run_tests` iterates or parallel-dispatches many files
//! and converges both strategies onto one aggregate shape. Fault policy:
//! fail fast on structurally bad input before anything executes; fail soft
//! on content — a file that cannot load becomes a one-error report and
//! never stops later files.

pub mod discovery;
pub mod parallel;
pub mod registry;

use crate::engine::context::{self, ContextKind, TestContext};
use crate::engine::Engine;
use crate::errors::ParikshaError;
use crate::isolation::cache::ModuleCache;
use crate::isolation::{IsolationManager, ResetOptions};
use parallel::{ThreadPool, WorkerEngine, WorkerOptions};
use regex::Regex;
use registry::SuiteRegistry;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Options for a multi-file run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub parallel: bool,
    pub workers: usize,
    /// Per-file deadline in parallel mode.
    pub timeout: Duration,
    /// Purge non-protected modules before each file.
    pub isolate_modules: bool,
    pub tag_filter: Vec<String>,
    pub name_filter: Option<String>,
    /// Carried for host frameworks that collect coverage around the run;
    /// the core only logs it.
    pub coverage: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: 4,
            timeout: Duration::from_secs(60),
            isolate_modules: true,
            tag_filter: Vec::new(),
            name_filter: None,
            coverage: false,
        }
    }
}

/// Aggregated outcome of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub success: bool,
    pub passes: usize,
    pub errors: usize,
    pub skipped: usize,
    pub file: String,
}

impl FileReport {
    /// The one-error shape for a file that never executed.
    pub fn load_failure(file: impl Into<String>) -> Self {
        Self {
            success: false,
            passes: 0,
            errors: 1,
            skipped: 0,
            file: file.into(),
        }
    }
}

/// One aggregate shape produced by both execution strategies.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub success: bool,
    pub passes: usize,
    pub errors: usize,
    pub skipped: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub files_tested: usize,
    pub files_passed: usize,
    pub files_failed: usize,
}

/// Loads and executes one registered suite against the given engine/cache.
///
/// Never panics and never returns an error: every failure mode inside the
/// file collapses into the report. Module purge happens before the load so
/// the file observes fresh copies of non-protected modules.
pub(crate) fn execute_file(
    engine: &mut Engine,
    cache: &mut ModuleCache,
    isolation: &IsolationManager,
    registry: &SuiteRegistry,
    options: &RunOptions,
    path: &str,
) -> FileReport {
    info!(file = path, "running test file");
    context::notify(Some(&TestContext {
        kind: ContextKind::File,
        name: path.to_string(),
        path: path.to_string(),
    }));

    engine.reset();
    engine.set_tag_filter(options.tag_filter.iter().cloned());
    if let Some(pattern) = &options.name_filter {
        // Pre-validated by run_tests; a failure here means run_file was
        // called directly with a bad pattern, which is still a load error
        // for this file rather than a crash.
        if let Err(e) = engine.set_name_filter(pattern) {
            warn!(file = path, error = %e, "name filter rejected");
            context::notify(None);
            return FileReport::load_failure(path);
        }
    }

    if options.isolate_modules {
        let purged = isolation.reset_all(cache, &ResetOptions::default());
        debug!(file = path, purged, "module cache reset before file");
    }

    let Some(suite) = registry.lookup(path) else {
        warn!(file = path, "no suite registered for path");
        context::notify(None);
        return FileReport::load_failure(path);
    };

    let load_outcome = catch_unwind(AssertUnwindSafe(|| suite(engine, cache)));

    let counters = engine.counters();
    let mut errors = counters.failures;
    if let Err(payload) = load_outcome {
        let failure = crate::engine::results::Failure::from_panic(payload);
        warn!(file = path, error = %failure, "top-level suite execution failed");
        errors += 1;
    }

    context::notify(None);
    FileReport {
        success: errors == 0,
        passes: counters.passes,
        errors,
        skipped: counters.skipped_total(),
        file: path.to_string(),
    }
}

/// Owns one engine/cache pair and orchestrates whole runs over a registry.
pub struct SuiteRunner {
    registry: Arc<SuiteRegistry>,
    options: RunOptions,
    engine: Engine,
    cache: ModuleCache,
    isolation: IsolationManager,
}

impl SuiteRunner {
    pub fn new(registry: Arc<SuiteRegistry>, options: RunOptions) -> Self {
        let cache = ModuleCache::new();
        let isolation = IsolationManager::new(&cache);
        Self {
            registry,
            options,
            engine: Engine::new(),
            cache,
            isolation,
        }
    }

    pub fn isolation_mut(&mut self) -> &mut IsolationManager {
        &mut self.isolation
    }

    pub fn module_cache_mut(&mut self) -> &mut ModuleCache {
        &mut self.cache
    }

    /// The engine after the most recent file, for result read-back.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Executes a single file and reads aggregated counters back.
    pub fn run_file(&mut self, path: &str) -> Result<FileReport, ParikshaError> {
        if path.is_empty() {
            return Err(ParikshaError::usage("file path must not be empty"));
        }
        Ok(execute_file(
            &mut self.engine,
            &mut self.cache,
            &self.isolation,
            &self.registry,
            &self.options,
            path,
        ))
    }

    /// Discovers suites under `dir` and runs them. Zero files found is a
    /// hard error.
    pub fn run_discovered(
        &mut self,
        dir: &str,
        pattern: Option<&str>,
    ) -> Result<SuiteReport, ParikshaError> {
        let report = discovery::discover(&self.registry, dir, pattern)?;
        info!(
            dir,
            matched = report.matched,
            total = report.total,
            "discovery complete"
        );
        if report.files.is_empty() {
            return Err(ParikshaError::NoFilesFound {
                dir: dir.to_string(),
                pattern: pattern.unwrap_or(".*").to_string(),
            });
        }
        self.run_tests(&report.files)
    }

    /// Runs many files, sequentially or via the worker pool, converging on
    /// one aggregate result shape.
    pub fn run_tests(&mut self, files: &[String]) -> Result<SuiteReport, ParikshaError> {
        // Fail fast on bad input before any execution begins.
        if files.is_empty() {
            return Err(ParikshaError::usage("file list must not be empty"));
        }
        if files.iter().any(String::is_empty) {
            return Err(ParikshaError::usage("file list contains an empty path"));
        }
        if let Some(pattern) = &self.options.name_filter {
            Regex::new(pattern).map_err(|e| ParikshaError::invalid_pattern(pattern, &e))?;
        }
        if self.options.coverage {
            debug!("coverage requested; collection is delegated to the host framework");
        }

        let started = Instant::now();
        let report = if self.options.parallel {
            self.run_parallel(files, started)
        } else {
            self.run_sequential(files, started)
        };
        info!(
            files = report.files_tested,
            passes = report.passes,
            errors = report.errors,
            skipped = report.skipped,
            "suite run finished"
        );
        Ok(report)
    }

    fn run_sequential(&mut self, files: &[String], started: Instant) -> SuiteReport {
        let mut reports = Vec::with_capacity(files.len());
        for path in files {
            // Fault isolation across files: a failing file never stops
            // later files.
            reports.push(execute_file(
                &mut self.engine,
                &mut self.cache,
                &self.isolation,
                &self.registry,
                &self.options,
                path,
            ));
        }
        aggregate(&reports, started.elapsed())
    }

    fn run_parallel(&mut self, files: &[String], started: Instant) -> SuiteReport {
        let mut pool = ThreadPool::new();
        pool.configure(WorkerOptions {
            workers: self.options.workers,
            timeout: self.options.timeout,
        });
        let outcome = pool.run_tests(&self.registry, files, &self.options);
        // The report clock below spans pool configuration as well; the
        // pool's own clock covers dispatch only.
        debug!(dispatch = ?outcome.elapsed, "worker pool dispatch finished");
        for message in &outcome.errors {
            warn!(error = %message, "worker pool reported an error");
        }

        // The five-field worker contract supplies the counts; the extended
        // per-file reports make file attribution exact.
        let files_passed = outcome.files.iter().filter(|f| f.success).count();
        let files_failed = outcome.files.iter().filter(|f| !f.success).count();
        SuiteReport {
            success: outcome.failed == 0,
            passes: outcome.passed,
            errors: outcome.failed,
            skipped: outcome.skipped,
            total: outcome.passed + outcome.failed + outcome.skipped,
            elapsed: started.elapsed(),
            files_tested: files.len(),
            files_passed,
            files_failed,
        }
    }
}

/// Commutative aggregation: order across files never changes the sums.
fn aggregate(reports: &[FileReport], elapsed: Duration) -> SuiteReport {
    let passes: usize = reports.iter().map(|r| r.passes).sum();
    let errors: usize = reports.iter().map(|r| r.errors).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    SuiteReport {
        success: errors == 0,
        passes,
        errors,
        skipped,
        total: passes + errors + skipped,
        elapsed,
        files_tested: reports.len(),
        files_passed: reports.iter().filter(|r| r.success).count(),
        files_failed: reports.iter().filter(|r| !r.success).count(),
    }
}
