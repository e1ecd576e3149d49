//! Scope tree and level-indexed hook registry.
//!
//! Scopes form a tree discovered in execution order. Each scope carries its
//! *effective* focus/exclusion/tag state, computed at entry from its own
//! options plus its parent's effective state, so the skip decision never has
//! to walk ancestors. Hooks belong to the nesting level they were registered
//! at; leaving a group truncates that level's hook lists back to their entry
//! length, which is what keeps sibling groups from seeing each other's hooks.

use crate::engine::results::Failure;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Setup/teardown function bound to a nesting level.
pub type HookFn = Box<dyn FnMut() -> Result<(), Failure>>;

/// Options accepted at group registration.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    pub focused: bool,
    pub excluded: bool,
    pub tags: Vec<String>,
}

/// Options accepted at case registration.
#[derive(Debug, Clone, Default)]
pub struct CaseOptions {
    pub focused: bool,
    pub excluded: bool,
    /// When true, a raising body is the expected outcome.
    pub expect_error: bool,
    pub tags: Vec<String>,
    pub timeout: Option<std::time::Duration>,
}

/// A named test group with inherited tag/focus/exclusion state.
#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub parent: Option<usize>,
    /// True when this scope or any ancestor is focused.
    pub focused: bool,
    /// True when this scope or any ancestor is excluded.
    pub excluded: bool,
    /// Own tags unioned with every ancestor's tags.
    pub tags: BTreeSet<String>,
}

/// Arena of scopes for one execution pass plus the active nesting stack.
///
/// The arena keeps every scope entered during the run (children in
/// execution order); the stack holds indices of the currently open groups.
/// Never persisted past one run: `Engine::reset` replaces the whole tree.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    stack: Vec<usize>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth; zero at file top level.
    pub fn level(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> Option<&Scope> {
        self.stack.last().map(|&idx| &self.scopes[idx])
    }

    /// Enters a group, inheriting effective state from the current scope.
    /// Returns the arena index so the caller can pop back to it on exit.
    pub fn push(&mut self, name: &str, opts: &GroupOptions) -> usize {
        let parent = self.stack.last().copied();
        let (mut focused, mut excluded, mut tags) = match parent {
            Some(idx) => {
                let p = &self.scopes[idx];
                (p.focused, p.excluded, p.tags.clone())
            }
            None => (false, false, BTreeSet::new()),
        };
        focused |= opts.focused;
        excluded |= opts.excluded;
        tags.extend(opts.tags.iter().cloned());

        let idx = self.scopes.len();
        self.scopes.push(Scope {
            name: name.to_string(),
            parent,
            focused,
            excluded,
            tags,
        });
        self.stack.push(idx);
        idx
    }

    /// Leaves the innermost group, restoring the parent scope context.
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Ancestor group names, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.stack
            .iter()
            .map(|&idx| self.scopes[idx].name.clone())
            .collect()
    }
}

/// Before/after hook lists indexed by nesting level.
#[derive(Default)]
pub struct HookTables {
    befores: Vec<Vec<HookFn>>,
    afters: Vec<Vec<HookFn>>,
}

impl HookTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure slots exist for the given level (group entry).
    pub fn ensure_level(&mut self, level: usize) {
        while self.befores.len() <= level {
            self.befores.push(Vec::new());
        }
        while self.afters.len() <= level {
            self.afters.push(Vec::new());
        }
    }

    pub fn add_before(&mut self, level: usize, hook: HookFn) {
        self.ensure_level(level);
        self.befores[level].push(hook);
    }

    pub fn add_after(&mut self, level: usize, hook: HookFn) {
        self.ensure_level(level);
        self.afters[level].push(hook);
    }

    /// Snapshot of per-level lengths taken at group entry.
    pub fn mark(&self, level: usize) -> (usize, usize) {
        (
            self.befores.get(level).map_or(0, Vec::len),
            self.afters.get(level).map_or(0, Vec::len),
        )
    }

    /// Restores a level to its entry-time lengths (group exit).
    pub fn truncate(&mut self, level: usize, mark: (usize, usize)) {
        if let Some(slot) = self.befores.get_mut(level) {
            slot.truncate(mark.0);
        }
        if let Some(slot) = self.afters.get_mut(level) {
            slot.truncate(mark.1);
        }
    }

    /// Runs before-hooks ancestor -> descendant for levels `0..=level`.
    /// Stops at the first hook error; a panicking hook counts as an error.
    pub fn run_befores(&mut self, level: usize) -> Result<(), Failure> {
        for slot in self.befores.iter_mut().take(level + 1) {
            for hook in slot.iter_mut() {
                run_hook(hook)?;
            }
        }
        Ok(())
    }

    /// Runs after-hooks descendant -> ancestor for levels `0..=level`.
    /// All hooks run; the first error is reported.
    pub fn run_afters(&mut self, level: usize) -> Result<(), Failure> {
        let mut first_err = None;
        for slot in self.afters.iter_mut().take(level + 1).rev() {
            for hook in slot.iter_mut() {
                if let Err(e) = run_hook(hook) {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Invokes one hook with panics captured at the hook boundary, so an
/// unwinding hook never escapes the case it runs for.
fn run_hook(hook: &mut HookFn) -> Result<(), Failure> {
    match catch_unwind(AssertUnwindSafe(|| hook())) {
        Ok(outcome) => outcome,
        Err(payload) => Err(Failure::from_panic(payload)),
    }
}
