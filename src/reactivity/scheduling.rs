// ============================================================================
// spark-compose - Effect Scheduling
// Pending effect queue and synchronous flushing
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::AnyReaction;
use crate::reactivity::tracking::deps_changed;

/// Passes over the queue before an update loop is considered runaway.
const MAX_ITERATIONS: u32 = 1000;

/// Queue an effect and flush unless a batch or flush is already in progress.
pub fn schedule_effect(effect: Rc<dyn AnyReaction>) {
    let should_flush = with_context(|ctx| {
        ctx.add_pending_effect(Rc::downgrade(&effect));
        !ctx.is_batching() && !ctx.is_flushing()
    });

    if should_flush {
        flush_effects();
    }
}

/// Drain the pending queue, re-running effects whose dependencies moved.
pub fn flush_effects() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));
    if was_flushing {
        return;
    }

    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(false));
        }
    }

    let _guard = FlushGuard;
    let mut iterations = 0;

    loop {
        let pending = with_context(|ctx| ctx.take_pending_effects());
        if pending.is_empty() {
            break;
        }

        iterations += 1;
        if iterations > MAX_ITERATIONS {
            panic!(
                "Maximum update depth exceeded. This can happen when an effect \
                 continuously triggers itself."
            );
        }

        // Render effects go last so they observe settled state
        let (render, plain): (Vec<_>, Vec<_>) = pending
            .iter()
            .filter_map(|w| w.upgrade())
            .partition(|e| e.flags() & RENDER_EFFECT != 0);

        for effect in plain.into_iter().chain(render) {
            let flags = effect.flags();
            if flags & DESTROYED != 0 || flags & (DIRTY | MAYBE_DIRTY) == 0 {
                continue;
            }

            if flags & EFFECT_RAN == 0 || deps_changed(&*effect) {
                effect.run();
            } else {
                effect.set_status(CLEAN);
            }
        }
    }
}

/// Flush synchronously. Without a microtask queue this is just a drain.
pub fn flush_sync() {
    if with_context(|ctx| !ctx.is_batching()) {
        flush_effects();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::effect::effect;
    use crate::primitives::signal::signal;
    use std::cell::Cell;

    #[test]
    #[should_panic(expected = "Maximum update depth exceeded")]
    fn runaway_effect_panics() {
        let n = signal(0);
        let _e = effect({
            let n = n.clone();
            move || {
                let v = n.get();
                n.set(v + 1);
            }
        });
    }

    #[test]
    fn effect_writing_other_signal_settles() {
        let a = signal(1);
        let b = signal(0);
        let seen = Rc::new(Cell::new(0));

        let _mirror = effect({
            let (a, b) = (a.clone(), b.clone());
            move || {
                b.set(a.get() * 10);
            }
        });
        let _reader = effect({
            let (b, seen) = (b.clone(), seen.clone());
            move || seen.set(b.get())
        });

        assert_eq!(seen.get(), 10);
        a.set(2);
        assert_eq!(seen.get(), 20);
    }
}
