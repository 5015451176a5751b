// ============================================================================
// spark-compose - Effects
// Side effects that re-run when their dependencies change
// ============================================================================
//
// An effect is a reaction only (never a source). It runs once on creation,
// records what it read, and is queued again whenever one of those sources
// moves. Effects created while a scope is active belong to that scope and
// are destroyed with it.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource, Dependency};
use crate::primitives::scope::register_effect_with_scope;
use crate::reactivity::batching::{batch, untrack};
use crate::reactivity::tracking::{remove_reactions, run_tracked};

// =============================================================================
// TYPES
// =============================================================================

/// Cleanup returned by an effect run, called before the next run and on disposal.
pub type CleanupFn = Box<dyn FnOnce()>;

/// Effect body.
pub type EffectFn = Box<dyn FnMut() -> Option<CleanupFn>>;

// =============================================================================
// EFFECT INNER
// =============================================================================

pub struct EffectInner {
    /// Flags bitmask (EFFECT | status)
    flags: Cell<u32>,

    /// The effect function. Taken out while it runs.
    func: RefCell<Option<EffectFn>>,

    deps: RefCell<Vec<Dependency>>,

    /// Cleanup from the last run
    teardown: RefCell<Option<CleanupFn>>,

    self_weak: Weak<EffectInner>,
}

impl EffectInner {
    pub fn new(effect_type: u32, func: EffectFn) -> Rc<Self> {
        Rc::new_cyclic(|self_weak| Self {
            flags: Cell::new(effect_type | DIRTY),
            func: RefCell::new(Some(func)),
            deps: RefCell::new(Vec::new()),
            teardown: RefCell::new(None),
            self_weak: self_weak.clone(),
        })
    }

    fn execute_teardown(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            untrack(teardown);
        }
    }
}

impl AnyReaction for EffectInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn deps(&self) -> Vec<Dependency> {
        self.deps.borrow().clone()
    }

    fn replace_deps(&self, deps: Vec<Dependency>) -> Vec<Dependency> {
        self.deps.replace(deps)
    }

    fn run(&self) {
        if let Some(this) = self.self_weak.upgrade() {
            update_effect(&this);
        }
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// EFFECT WRAPPER
// =============================================================================

/// Handle to a live effect.
///
/// Dropping the last handle of an effect that no scope owns disposes it.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    pub fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn dispose(&self) {
        destroy_effect(&self.inner);
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

// =============================================================================
// DESTROY / UPDATE
// =============================================================================

/// Detach an effect from the graph and run its cleanup.
pub fn destroy_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    let reaction: Rc<dyn AnyReaction> = effect.clone();
    remove_reactions(&reaction);
    effect.set_flags((effect.flags() & !(DIRTY | MAYBE_DIRTY | CLEAN)) | DESTROYED);
    effect.execute_teardown();
    *effect.func.borrow_mut() = None;
}

/// Run an effect body and re-track its dependencies.
pub fn update_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    // Clean before running so writes made by the body re-mark it
    effect.set_status(CLEAN);
    effect.set_flags(effect.flags() | EFFECT_RAN);
    effect.execute_teardown();

    let Some(mut func) = effect.func.borrow_mut().take() else {
        return;
    };

    let reaction: Rc<dyn AnyReaction> = effect.clone();
    let teardown = run_tracked(&reaction, || func());

    if effect.is_destroyed() {
        remove_reactions(&reaction);
        if let Some(teardown) = teardown {
            untrack(teardown);
        }
        return;
    }

    *effect.func.borrow_mut() = Some(func);
    *effect.teardown.borrow_mut() = teardown;
}

fn create_effect(effect_type: u32, func: EffectFn) -> Effect {
    let inner = EffectInner::new(effect_type, func);
    register_effect_with_scope(&inner);
    batch(|| update_effect(&inner));
    Effect { inner }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect that runs now and again whenever what it read changes.
///
/// # Example
///
/// ```
/// use spark_compose::{effect, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let handle = effect({
///     let (count, log) = (count.clone(), log.clone());
///     move || log.borrow_mut().push(count.get())
/// });
///
/// count.set(1);
/// handle.dispose();
/// count.set(2);
/// assert_eq!(*log.borrow(), vec![0, 1]);
/// ```
pub fn effect<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    effect_with_cleanup(move || {
        f();
        None
    })
}

/// Create an effect whose body may return a cleanup.
pub fn effect_with_cleanup<F>(f: F) -> Effect
where
    F: FnMut() -> Option<CleanupFn> + 'static,
{
    create_effect(EFFECT, Box::new(f))
}

/// Create an effect that runs after plain effects in each flush pass.
///
/// Used for snapshotting the view, so a render observes state that other
/// effects have already settled.
pub fn render_effect<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    create_effect(
        EFFECT | RENDER_EFFECT,
        Box::new(move || {
            f();
            None
        }),
    )
}

/// Whether code is running inside an effect or derived.
pub fn effect_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;

    #[test]
    fn effect_runs_immediately_and_on_change() {
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let (count, runs) = (count.clone(), runs.clone());
            move || {
                count.get();
                runs.set(runs.get() + 1);
            }
        });

        assert_eq!(runs.get(), 1);
        count.set(1);
        assert_eq!(runs.get(), 2);
        count.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let count = signal(0);
        let cleanups = Rc::new(Cell::new(0));
        let e = effect_with_cleanup({
            let (count, cleanups) = (count.clone(), cleanups.clone());
            move || {
                count.get();
                let cleanups = cleanups.clone();
                Some(Box::new(move || cleanups.set(cleanups.get() + 1)) as CleanupFn)
            }
        });

        assert_eq!(cleanups.get(), 0);
        count.set(1);
        assert_eq!(cleanups.get(), 1);
        e.dispose();
        assert_eq!(cleanups.get(), 2);
        assert!(e.is_destroyed());
    }

    #[test]
    fn dropping_unowned_handle_disposes() {
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));
        {
            let _e = effect({
                let (count, runs) = (count.clone(), runs.clone());
                move || {
                    count.get();
                    runs.set(runs.get() + 1);
                }
            });
        }
        count.set(5);
        assert_eq!(runs.get(), 1);
        assert_eq!(count.inner().reaction_count(), 0);
    }

    #[test]
    fn render_effects_run_after_plain_effects() {
        let source = signal(0);
        let mirror = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        // Subscribed to `source` before the plain effect, so it is queued first
        let _render = render_effect({
            let (source, mirror, seen) = (source.clone(), mirror.clone(), seen.clone());
            move || {
                source.get();
                seen.borrow_mut().push(mirror.get());
            }
        });
        let _plain = effect({
            let (source, mirror) = (source.clone(), mirror.clone());
            move || {
                mirror.set(source.get());
            }
        });

        seen.borrow_mut().clear();
        batch(|| source.set(3));
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn tracking_flag_inside_effect() {
        assert!(!effect_tracking());
        let inside = Rc::new(Cell::new(false));
        let _e = effect({
            let inside = inside.clone();
            move || inside.set(effect_tracking())
        });
        assert!(inside.get());
    }
}
