//! Skip-eligibility as a pure function.
//!
//! The decision is plain data-driven branching over the ancestor state, the
//! case's own options, and the run-time filters. Keeping it out of the tree
//! walk makes every rule independently testable: the engine only supplies
//! inputs and records the verdict.

use crate::engine::scope::CaseOptions;
use regex::Regex;
use std::collections::BTreeSet;

/// Effective state inherited from the enclosing scope chain.
#[derive(Debug, Clone, Default)]
pub struct AncestorState {
    pub focused: bool,
    pub excluded: bool,
    pub tags: BTreeSet<String>,
}

/// Filters active for the whole run, applied at evaluation time.
#[derive(Debug, Default)]
pub struct RuntimeFilters {
    /// Flips true the moment any evaluated scope or case is focused.
    pub focus_mode: bool,
    /// Non-empty means: run only cases whose resolved tags intersect it.
    pub tag_filter: BTreeSet<String>,
    pub name_filter: Option<Regex>,
}

/// Verdict for one case at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Run,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Excluded,
    NotFocused,
    TagMismatch,
    NameMismatch,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Excluded => "excluded by its own or an ancestor's options",
            Self::NotFocused => "focus mode active and neither case nor ancestor focused",
            Self::TagMismatch => "no resolved tag intersects the active tag filter",
            Self::NameMismatch => "name does not match the active name filter",
        }
    }
}

/// Resolved tag set for a case: own tags unioned with ancestor tags.
pub fn resolve_tags(ancestors: &AncestorState, opts: &CaseOptions) -> BTreeSet<String> {
    let mut tags = ancestors.tags.clone();
    tags.extend(opts.tags.iter().cloned());
    tags
}

/// Decides whether a case runs, in rule order: exclusion, focus, tags, name.
pub fn decide(
    ancestors: &AncestorState,
    opts: &CaseOptions,
    filters: &RuntimeFilters,
    name: &str,
) -> SkipDecision {
    if ancestors.excluded || opts.excluded {
        return SkipDecision::Skip(SkipReason::Excluded);
    }

    if filters.focus_mode && !ancestors.focused && !opts.focused {
        return SkipDecision::Skip(SkipReason::NotFocused);
    }

    if !filters.tag_filter.is_empty() {
        let resolved = resolve_tags(ancestors, opts);
        if resolved.is_disjoint(&filters.tag_filter) {
            return SkipDecision::Skip(SkipReason::TagMismatch);
        }
    }

    if let Some(pattern) = &filters.name_filter {
        if !pattern.is_match(name) {
            return SkipDecision::Skip(SkipReason::NameMismatch);
        }
    }

    SkipDecision::Run
}
