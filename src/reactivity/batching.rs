// ============================================================================
// spark-compose - Batching
// Group multiple updates into a single reaction cycle
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduling::{flush_effects, flush_sync};

// =============================================================================
// BATCH
// =============================================================================

/// Batch multiple signal updates into a single reaction cycle.
///
/// Effects scheduled inside the batch run once, after the outermost batch
/// exits. Event handlers dispatched by the runtime always run inside one,
/// so a handler that writes several signals re-renders once.
///
/// # Example
///
/// ```
/// use spark_compose::{batch, effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _e = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get() + b.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 && !std::thread::panicking() {
                flush_effects();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Read signals without creating dependencies.
///
/// # Example
///
/// ```
/// use spark_compose::{effect, signal, untrack};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _e = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         a.get();
///         untrack(|| b.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// b.set(20);
/// assert_eq!(runs.get(), 1);
/// a.set(10);
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.set_untracking(true));

    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.prev));
        }
    }

    let _guard = UntrackGuard { prev };
    f()
}

/// Alias for [`untrack`], reads as "look without subscribing".
pub fn peek<T>(f: impl FnOnce() -> T) -> T {
    untrack(f)
}

// =============================================================================
// TICK
// =============================================================================

/// Run every pending effect now.
pub fn tick() {
    flush_sync();
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AnySource;
    use crate::core::context::is_batching;
    use crate::primitives::effect::effect;
    use crate::primitives::signal::signal;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn nested_batches_flush_once_at_the_outermost_exit() {
        let a = signal(0);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let (a, runs) = (a.clone(), runs.clone());
            move || {
                a.get();
                runs.set(runs.get() + 1);
            }
        });

        batch(|| {
            a.set(1);
            batch(|| a.set(2));
            assert!(is_batching());
            assert_eq!(runs.get(), 1);
            a.set(3);
        });

        assert!(!is_batching());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn batch_returns_value() {
        assert_eq!(batch(|| 42), 42);
    }

    #[test]
    fn untrack_restores_on_panic() {
        let result = std::panic::catch_unwind(|| {
            untrack(|| panic!("boom"));
        });
        assert!(result.is_err());
        assert!(!with_context(|ctx| ctx.is_untracking()));
    }

    #[test]
    fn peek_does_not_subscribe() {
        let a = signal(1);
        let seen = Rc::new(Cell::new(0));
        let _e = effect({
            let (a, seen) = (a.clone(), seen.clone());
            move || seen.set(peek(|| a.get()))
        });

        a.set(5);
        assert_eq!(seen.get(), 1);
        assert_eq!(a.inner().reaction_count(), 0);
    }

    #[test]
    fn tick_outside_batch_is_harmless() {
        tick();
        assert!(!is_batching());
    }
}
