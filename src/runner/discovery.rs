//! Test file discovery over the suite registry.
//!
//! Selects registered suite paths by directory prefix and an optional
//! name pattern. Returns what matched and how many candidates existed;
//! turning "zero matched" into a hard error is the orchestrator's call,
//! not discovery's.

use crate::errors::ParikshaError;
use crate::runner::registry::SuiteRegistry;
use regex::Regex;

/// Outcome of one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Matching paths in sorted order.
    pub files: Vec<String>,
    pub matched: usize,
    /// Candidates under the directory before pattern filtering.
    pub total: usize,
}

/// True when `path` lives under `dir` ("" and "." mean everywhere).
fn under_dir(path: &str, dir: &str) -> bool {
    if dir.is_empty() || dir == "." {
        return true;
    }
    let dir = dir.trim_end_matches('/');
    path == dir || (path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/'))
}

/// Finds registered suites under `dir` whose path matches `pattern`.
/// An invalid pattern is a validation failure, never an empty match.
pub fn discover(
    registry: &SuiteRegistry,
    dir: &str,
    pattern: Option<&str>,
) -> Result<DiscoveryReport, ParikshaError> {
    let matcher = match pattern {
        Some(p) => {
            Some(Regex::new(p).map_err(|e| ParikshaError::invalid_pattern(p, &e))?)
        }
        None => None,
    };

    let candidates: Vec<String> = registry
        .paths()
        .into_iter()
        .filter(|path| under_dir(path, dir))
        .collect();
    let total = candidates.len();

    let files: Vec<String> = candidates
        .into_iter()
        .filter(|path| matcher.as_ref().map_or(true, |m| m.is_match(path)))
        .collect();
    let matched = files.len();

    Ok(DiscoveryReport {
        files,
        matched,
        total,
    })
}
