//! Stack safety for deep recursion.
//!
//! Node execution recurses once per tree level, and calls recurse through
//! the driver, so deeply nested trees can exhaust the native stack. On
//! native targets `stacker` grows the stack on demand; WASM manages its own.

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
