//! The host-environment contract.
//!
//! The host is the editor (or other process) embedding the engine. It
//! owns code reloading, the loaded-module list, and a global console
//! that mirrors captured output for host-side visibility.

use crate::capture::ConsoleMessage;
use crate::compiler::ModuleHandle;

/// What the engine needs from its embedding host.
pub trait HostEnvironment {
    /// True while the host is tearing down and rebuilding the
    /// compilation environment. Evaluation must be skipped.
    fn is_reloading(&self) -> bool;

    /// Modules currently loaded into the host process, to be referenced
    /// into the compiler service at session init.
    fn loaded_modules(&self) -> Vec<ModuleHandle>;

    /// Called before an evaluation starts. The host must not begin a
    /// reload between this call and `end_evaluation`. Advisory: the
    /// host's reload machinery cooperates rather than being blocked by
    /// a kernel lock.
    fn begin_evaluation(&self);

    /// Called when the evaluation finishes, on every exit path.
    fn end_evaluation(&self);

    /// Mirror a captured console message to the host's own console.
    fn mirror_console(&self, _message: &ConsoleMessage) {}
}

/// Brackets one evaluation with the host's begin/end hooks.
///
/// Non-reentrant by construction: the session creates at most one guard
/// at a time, and releases on drop so an early return or panic still
/// signals `end_evaluation`.
pub struct ReloadGuard<'a, H: HostEnvironment + ?Sized> {
    host: &'a H,
}

impl<'a, H: HostEnvironment + ?Sized> ReloadGuard<'a, H> {
    pub fn enter(host: &'a H) -> Self {
        host.begin_evaluation();
        Self { host }
    }
}

impl<H: HostEnvironment + ?Sized> Drop for ReloadGuard<'_, H> {
    fn drop(&mut self) {
        self.host.end_evaluation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHost;

    #[test]
    fn guard_brackets_evaluation() {
        let host = TestHost::ready();
        {
            let _guard = ReloadGuard::enter(&host);
            assert_eq!(host.active_evaluations(), 1);
        }
        assert_eq!(host.active_evaluations(), 0);
        assert_eq!(host.total_evaluations(), 1);
    }

    #[test]
    fn guard_releases_on_panic() {
        let host = TestHost::ready();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ReloadGuard::enter(&host);
            panic!("user code misbehaved");
        }));
        assert!(result.is_err());
        assert_eq!(host.active_evaluations(), 0);
    }
}
