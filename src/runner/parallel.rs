//! Parallel worker pool for multi-file runs.
//!
//! Shared-nothing: every worker thread builds its own engine, module cache,
//! and isolation manager, and hands back immutable result data over a
//! channel when it finishes. A per-file timeout bounds each worker; a
//! worker past its deadline is recorded as a failed file and its thread is
//! abandoned — hook and body code carries no cancellation checkpoint, so a
//! hung case is only detectable at this boundary.

use crate::engine::Engine;
use crate::isolation::cache::ModuleCache;
use crate::isolation::IsolationManager;
use crate::runner::registry::SuiteRegistry;
use crate::runner::{execute_file, FileReport, RunOptions};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Pool configuration, set through [`WorkerEngine::configure`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub workers: usize,
    /// Per-file deadline measured from worker spawn.
    pub timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Aggregated outcome of one parallel dispatch.
///
/// The first five fields are the worker protocol consumed by the
/// orchestrator. `files` extends the protocol with per-file outcomes so
/// file pass/fail attribution is exact instead of approximated.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub elapsed: Duration,
    pub files: Vec<FileReport>,
}

/// The parallel worker engine contract.
pub trait WorkerEngine {
    fn configure(&mut self, opts: WorkerOptions);

    fn run_tests(
        &self,
        registry: &Arc<SuiteRegistry>,
        files: &[String],
        run: &RunOptions,
    ) -> WorkerOutcome;
}

/// Default worker engine: one OS thread per in-flight file, at most
/// `workers` in flight at a time.
#[derive(Default)]
pub struct ThreadPool {
    options: WorkerOptions,
}

impl ThreadPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerEngine for ThreadPool {
    fn configure(&mut self, opts: WorkerOptions) {
        self.options = opts;
    }

    fn run_tests(
        &self,
        registry: &Arc<SuiteRegistry>,
        files: &[String],
        run: &RunOptions,
    ) -> WorkerOutcome {
        let started = Instant::now();
        let workers = self.options.workers.max(1);
        let timeout = self.options.timeout;

        let mut reports: Vec<FileReport> = Vec::with_capacity(files.len());
        let mut errors: Vec<String> = Vec::new();

        for batch in files.chunks(workers) {
            let mut in_flight = Vec::with_capacity(batch.len());

            for file in batch {
                let (tx, rx) = crossbeam_channel::bounded::<FileReport>(1);
                let registry = Arc::clone(registry);
                let run = run.clone();
                let path = file.clone();
                let spawned = thread::Builder::new()
                    .name(format!("pariksha-worker:{path}"))
                    .spawn(move || {
                        let mut engine = Engine::new();
                        let mut cache = ModuleCache::new();
                        let isolation = IsolationManager::new(&cache);
                        let report = execute_file(
                            &mut engine,
                            &mut cache,
                            &isolation,
                            &registry,
                            &run,
                            &path,
                        );
                        // Receiver may already have timed out and left.
                        let _ = tx.send(report);
                    });

                match spawned {
                    Ok(_handle) => in_flight.push((file.clone(), Instant::now(), rx)),
                    Err(e) => {
                        warn!(file = %file, error = %e, "failed to spawn worker thread");
                        errors.push(format!("worker for '{file}' failed to start: {e}"));
                        reports.push(FileReport::load_failure(file));
                    }
                }
            }

            for (file, spawn_time, rx) in in_flight {
                match rx.recv_deadline(spawn_time + timeout) {
                    Ok(report) => reports.push(report),
                    Err(_) => {
                        warn!(file = %file, ?timeout, "worker exceeded its deadline; abandoning");
                        errors.push(format!("worker for '{file}' timed out after {timeout:?}"));
                        reports.push(FileReport::load_failure(&file));
                    }
                }
            }
        }

        let passed = reports.iter().map(|r| r.passes).sum();
        let failed = reports.iter().map(|r| r.errors).sum();
        let skipped = reports.iter().map(|r| r.skipped).sum();
        debug!(
            files = reports.len(),
            passed, failed, skipped, "parallel dispatch complete"
        );

        WorkerOutcome {
            passed,
            failed,
            skipped,
            errors,
            elapsed: started.elapsed(),
            files: reports,
        }
    }
}
