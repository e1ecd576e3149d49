//! Pariksha error handling.
//!
//! One crate-wide error type for usage and validation failures on public
//! entrypoints. Failures that happen *inside* a test case or hook are not
//! errors in this sense; they are converted to data ([`crate::engine::results::Failure`])
//! at the boundary where they occur and never propagate past it.

use miette::Diagnostic;
use thiserror::Error;

/// The single error type surfaced by public entrypoints.
///
/// Every variant is a caller mistake or an environmental hard stop; none of
/// them represent a failing test. Propagation policy: these always surface,
/// everything else is recovered close to origin and recorded as a result.
#[derive(Debug, Error, Diagnostic)]
pub enum ParikshaError {
    /// A public API was called with arguments it cannot act on.
    #[error("usage error: {message}")]
    #[diagnostic(code(pariksha::usage))]
    Usage { message: String },

    /// A pattern argument failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(pariksha::invalid_pattern),
        help("patterns are Rust regex syntax, e.g. '_spec$' or '^unit/'")
    )]
    InvalidPattern { pattern: String, reason: String },

    /// Discovery matched nothing; running zero files is a hard error.
    #[error("no test files matched '{pattern}' under '{dir}'")]
    #[diagnostic(
        code(pariksha::no_files),
        help("suites must be registered with the suite registry before discovery")
    )]
    NoFilesFound { dir: String, pattern: String },

    /// A module loader was missing or failed while populating the cache.
    #[error("module '{name}' failed to load: {message}")]
    #[diagnostic(code(pariksha::module_load))]
    ModuleLoad { name: String, message: String },
}

impl ParikshaError {
    /// Shorthand used throughout the crate for argument validation.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, err: &regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: err.to_string(),
        }
    }
}

/// Prints a ParikshaError with full miette diagnostics.
///
/// Use this for user-facing error display in CLI contexts.
pub fn print_error(error: ParikshaError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
