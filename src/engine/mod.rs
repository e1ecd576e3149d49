//! The test definition engine.
//!
//! Builds the scope tree by executing registration callbacks *immediately
//! and synchronously*: a group body runs in real time against the current
//! scope, so nested case/group/hook registrations interleave with tree
//! construction. This is a behavioral contract, not an accident — skip and
//! focus decisions are made at evaluation time, in declaration order, and
//! are never retroactive.
//!
//! All mutable run state lives in one [`RunState`] so that [`Engine::reset`]
//! is a single well-defined replacement. Partial resets that leave stale
//! hooks or a stale focus flag behind are exactly the defect class this
//! layout exists to prevent.

pub mod context;
pub mod results;
pub mod scope;
pub mod skip;

use crate::errors::ParikshaError;
use context::{ContextKind, TestContext};
use regex::Regex;
use results::{Failure, ResultLog, TestRecord, TestStatus};
use scope::{CaseOptions, GroupOptions, HookTables, ScopeTree};
use skip::{AncestorState, RuntimeFilters, SkipDecision};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// The complete set of counters/flags/hooks/results governing one
/// execution pass. Replaced wholesale on reset, never patched field by
/// field.
#[derive(Default)]
pub struct RunState {
    tree: ScopeTree,
    hooks: HookTables,
    filters: RuntimeFilters,
    log: ResultLog,
}

/// Single-threaded test definition engine for one file at a time.
///
/// Within one file, scope construction, hooks, and bodies share one logical
/// thread of control, so nothing here needs locking.
#[derive(Default)]
pub struct Engine {
    state: RunState,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every RunState field as one atomic replacement.
    pub fn reset(&mut self) {
        self.state = RunState::default();
    }

    // ------------------------------------------------------------------
    // Run-time filters
    // ------------------------------------------------------------------

    /// Restricts the run to cases whose resolved tags intersect `tags`.
    /// An empty iterator clears the filter.
    pub fn set_tag_filter<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.filters.tag_filter = tags.into_iter().map(Into::into).collect();
    }

    /// Restricts the run to cases whose name matches `pattern`.
    pub fn set_name_filter(&mut self, pattern: &str) -> Result<(), ParikshaError> {
        let compiled =
            Regex::new(pattern).map_err(|e| ParikshaError::invalid_pattern(pattern, &e))?;
        self.state.filters.name_filter = Some(compiled);
        Ok(())
    }

    /// True once any evaluated scope or case was focused.
    pub fn focus_mode(&self) -> bool {
        self.state.filters.focus_mode
    }

    // ------------------------------------------------------------------
    // Registration: groups, cases, hooks
    // ------------------------------------------------------------------

    /// Opens a named group and executes `body` against it immediately.
    ///
    /// A panic inside `body` is a definition-level failure: it is caught,
    /// logged, and counted, and sibling groups still run. The scope and the
    /// hooks registered inside the group are torn down on exit either way.
    pub fn group(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Engine),
    ) -> Result<(), ParikshaError> {
        self.group_with(name, GroupOptions::default(), body)
    }

    pub fn group_with(
        &mut self,
        name: &str,
        opts: GroupOptions,
        body: impl FnOnce(&mut Engine),
    ) -> Result<(), ParikshaError> {
        if name.is_empty() {
            return Err(ParikshaError::usage("group name must not be empty"));
        }

        if opts.focused {
            self.state.filters.focus_mode = true;
        }
        self.state.tree.push(name, &opts);
        let level = self.state.tree.level();
        self.state.hooks.ensure_level(level);
        let mark = self.state.hooks.mark(level);

        let outcome = catch_unwind(AssertUnwindSafe(|| body(self)));
        if let Err(payload) = outcome {
            let failure = Failure::from_panic(payload);
            warn!(group = name, error = %failure, "group body raised during definition");
            self.state.log.count_definition_failure();
        }

        self.state.hooks.truncate(level, mark);
        self.state.tree.pop();
        Ok(())
    }

    /// Registers and immediately evaluates a test case.
    pub fn case(
        &mut self,
        name: &str,
        body: impl FnMut() -> Result<(), Failure>,
    ) -> Result<(), ParikshaError> {
        self.case_with(name, CaseOptions::default(), body)
    }

    pub fn case_with(
        &mut self,
        name: &str,
        opts: CaseOptions,
        body: impl FnMut() -> Result<(), Failure>,
    ) -> Result<(), ParikshaError> {
        if name.is_empty() {
            return Err(ParikshaError::usage("case name must not be empty"));
        }

        // A focused case flips focus mode before its own eligibility check,
        // so it always survives the check it just caused.
        if opts.focused {
            self.state.filters.focus_mode = true;
        }

        let ancestors = self.ancestor_state();
        let mut path = self.state.tree.path();
        path.push(name.to_string());

        match skip::decide(&ancestors, &opts, &self.state.filters, name) {
            SkipDecision::Skip(reason) => {
                debug!(case = name, reason = reason.describe(), "case skipped");
                let mut record = TestRecord::new(TestStatus::Skip, name, path);
                record.expect_error = opts.expect_error;
                record.skip_reason = Some(reason.describe().to_string());
                self.state.log.append(record);
                Ok(())
            }
            SkipDecision::Run => {
                self.evaluate_case(name, path, &opts, body);
                Ok(())
            }
        }
    }

    /// Records a pending case: declared, not yet given a body.
    pub fn pending(&mut self, name: &str) -> Result<(), ParikshaError> {
        if name.is_empty() {
            return Err(ParikshaError::usage("case name must not be empty"));
        }
        let mut path = self.state.tree.path();
        path.push(name.to_string());
        self.state
            .log
            .append(TestRecord::new(TestStatus::Pending, name, path));
        Ok(())
    }

    /// Registers a setup hook at the current nesting level. It runs before
    /// every case at or below this level until the enclosing group exits.
    pub fn before_each(&mut self, hook: impl FnMut() -> Result<(), Failure> + 'static) {
        let level = self.state.tree.level();
        self.state.hooks.add_before(level, Box::new(hook));
    }

    /// Registers a teardown hook at the current nesting level.
    pub fn after_each(&mut self, hook: impl FnMut() -> Result<(), Failure> + 'static) {
        let level = self.state.tree.level();
        self.state.hooks.add_after(level, Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Read-back
    // ------------------------------------------------------------------

    pub fn counters(&self) -> results::Counters {
        self.state.log.counters()
    }

    /// Ordered result list, first-evaluated-first-recorded.
    pub fn records(&self) -> &[TestRecord] {
        self.state.log.records()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ancestor_state(&self) -> AncestorState {
        match self.state.tree.current() {
            Some(scope) => AncestorState {
                focused: scope.focused,
                excluded: scope.excluded,
                tags: scope.tags.clone(),
            },
            None => AncestorState::default(),
        }
    }

    /// Runs hooks + body + hooks inside one failure-isolation boundary and
    /// appends exactly one TestRecord.
    ///
    /// Before-hooks run ancestor -> descendant; the first hook error skips
    /// the body. After-hooks run descendant -> ancestor and always run.
    /// After-hook errors share the boundary with body errors and are not
    /// distinguished in the record.
    fn evaluate_case(
        &mut self,
        name: &str,
        path: Vec<String>,
        opts: &CaseOptions,
        mut body: impl FnMut() -> Result<(), Failure>,
    ) {
        context::notify(Some(&TestContext {
            kind: ContextKind::Case,
            name: name.to_string(),
            path: path.join(" > "),
        }));

        let RunState { tree, hooks, log, .. } = &mut self.state;
        let level = tree.level();

        let started = Instant::now();
        let mut captured: Option<Failure> = None;

        if let Err(e) = hooks.run_befores(level) {
            captured = Some(e);
        } else {
            match catch_unwind(AssertUnwindSafe(&mut body)) {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => captured = Some(failure),
                Err(payload) => captured = Some(Failure::from_panic(payload)),
            }
        }

        if let Err(e) = hooks.run_afters(level) {
            captured.get_or_insert(e);
        }

        let elapsed = started.elapsed();
        if captured.is_none() {
            if let Some(limit) = opts.timeout {
                if elapsed > limit {
                    captured = Some(Failure::timeout(limit, elapsed));
                }
            }
        }

        let status = match (&captured, opts.expect_error) {
            (None, _) => TestStatus::Pass,
            (Some(_), true) => TestStatus::Pass,
            (Some(_), false) => TestStatus::Fail,
        };
        if status == TestStatus::Fail {
            debug!(case = name, error = %captured.as_ref().map(|f| f.message.as_str()).unwrap_or(""), "case failed");
        }

        let mut record = TestRecord::new(status, name, path);
        record.elapsed = Some(elapsed);
        record.error = captured;
        record.expect_error = opts.expect_error;
        log.append(record);

        context::notify(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_usage_errors() {
        let mut engine = Engine::new();
        assert!(engine.group("", |_| {}).is_err());
        assert!(engine.case("", || Ok(())).is_err());
        assert!(engine.pending("").is_err());
    }

    #[test]
    fn reset_replaces_all_state() {
        let mut engine = Engine::new();
        engine.set_tag_filter(["slow"]);
        engine
            .group_with(
                "g",
                GroupOptions {
                    focused: true,
                    ..Default::default()
                },
                |e| {
                    e.before_each(|| Ok(()));
                },
            )
            .unwrap();
        assert!(engine.focus_mode());

        engine.reset();
        assert!(!engine.focus_mode());
        assert_eq!(engine.counters(), results::Counters::default());
        assert!(engine.records().is_empty());

        // Idempotent: resetting clean state is a no-op.
        engine.reset();
        assert!(engine.records().is_empty());
    }

    #[test]
    fn invalid_name_filter_surfaces_synchronously() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.set_name_filter("("),
            Err(ParikshaError::InvalidPattern { .. })
        ));
    }
}
