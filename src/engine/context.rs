//! Temp-resource context hook.
//!
//! Host frameworks that scope temporary resources (scratch directories,
//! fixtures) to the currently running test can install a hook here. The
//! engine calls it at file and case boundaries, fire-and-forget: hook
//! panics and return values never influence execution.

use once_cell::sync::Lazy;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;

/// What kind of boundary the context describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    File,
    Case,
}

/// Identity of the unit about to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub kind: ContextKind,
    pub name: String,
    pub path: String,
}

type ContextHook = Box<dyn Fn(Option<&TestContext>) + Send + Sync>;

static HOOK: Lazy<RwLock<Option<ContextHook>>> = Lazy::new(|| RwLock::new(None));

/// Installs (or clears) the process-wide context hook.
pub fn set_context_hook(hook: Option<ContextHook>) {
    if let Ok(mut slot) = HOOK.write() {
        *slot = hook;
    }
}

/// Notifies the installed hook, if any. `None` marks leaving a boundary.
pub(crate) fn notify(context: Option<&TestContext>) {
    if let Ok(slot) = HOOK.read() {
        if let Some(hook) = slot.as_ref() {
            // The hook is outside our control; a panic in it must not
            // escape into the run.
            let _ = catch_unwind(AssertUnwindSafe(|| hook(context)));
        }
    }
}
