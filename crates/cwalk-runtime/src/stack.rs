//! Native stack growth for deeply nested evaluation
//!
//! Every node visit recurses on the Rust stack, so a program recursing up to
//! `max_call_depth` would overflow a default thread stack long before the
//! interpreter reports `StackOverflow`.

/// Run `f`, first moving to a fresh stack segment if less than the red zone
/// remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const STACK_PER_SEGMENT: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
