// ============================================================================
// spark-compose - Owner Scopes
//
// Group effects for disposal and carry context values down the tree.
// ============================================================================
//
// A scope owns the effects, cleanups and child scopes created while it is
// active. It is also the provider tree: a value provided on a scope is
// visible to code running in that scope and in every descendant, and the
// innermost provider wins. Lookups walk weak parent pointers, so a
// descendant never keeps its ancestors alive.
// ============================================================================

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::primitives::effect::{EffectInner, destroy_effect};

// =============================================================================
// THREAD-LOCAL SCOPE STATE
// =============================================================================

thread_local! {
    /// Currently active scope (if any)
    static ACTIVE_SCOPE: RefCell<Option<Rc<EffectScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

/// Set the active scope, returning the previous one
fn set_active_scope(scope: Option<Rc<EffectScopeInner>>) -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Restores the previously active scope, even on panic.
struct ActiveScopeGuard {
    prev: Option<Option<Rc<EffectScopeInner>>>,
}

impl Drop for ActiveScopeGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            set_active_scope(prev);
        }
    }
}

// =============================================================================
// CONTEXT KEYS
// =============================================================================

/// Identity of a provided value: its type plus a name.
///
/// Two capabilities with the same value type but different names never see
/// each other's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextKey {
    type_id: TypeId,
    name: &'static str,
}

impl ContextKey {
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// =============================================================================
// CLEANUP TYPE
// =============================================================================

/// Cleanup function type for scope disposal
pub type ScopeCleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// EFFECT SCOPE INNER
// =============================================================================

pub struct EffectScopeInner {
    /// Whether the scope is still active (not stopped)
    active: Cell<bool>,

    /// Effects created within this scope
    effects: RefCell<Vec<Rc<EffectInner>>>,

    /// Cleanup functions to run on stop
    cleanups: RefCell<Vec<ScopeCleanupFn>>,

    parent: Option<Weak<EffectScopeInner>>,

    /// Child scopes
    scopes: RefCell<Vec<Rc<EffectScopeInner>>>,

    /// Values provided on this scope
    contexts: RefCell<HashMap<ContextKey, Rc<dyn Any>>>,

    self_weak: Weak<EffectScopeInner>,
}

impl EffectScopeInner {
    fn new(parent: Option<Rc<EffectScopeInner>>) -> Rc<Self> {
        let scope = Rc::new_cyclic(|self_weak| Self {
            active: Cell::new(true),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: parent.as_ref().map(Rc::downgrade),
            scopes: RefCell::new(Vec::new()),
            contexts: RefCell::new(HashMap::new()),
            self_weak: self_weak.clone(),
        });

        if let Some(parent) = parent {
            parent.scopes.borrow_mut().push(scope.clone());
        }

        scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Run `f` with this scope active, regardless of whether it was stopped.
    pub fn within<R>(&self, f: impl FnOnce() -> R) -> R {
        let guard = ActiveScopeGuard {
            prev: Some(set_active_scope(self.self_weak.upgrade())),
        };
        let result = f();
        drop(guard);
        result
    }

    /// Run `f` with this scope active. Returns None once stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.active.get() {
            return None;
        }
        Some(self.within(f))
    }

    /// Stop the scope: destroy its effects, run its cleanups, stop its children.
    pub fn stop(&self) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);

        // Children first, so inner providers go before the values they read
        let child_scopes: Vec<_> = self.scopes.borrow_mut().drain(..).collect();
        for child in child_scopes.into_iter().rev() {
            child.stop();
        }

        let effects: Vec<_> = self.effects.borrow_mut().drain(..).collect();
        for effect in effects {
            destroy_effect(&effect);
        }

        // Cleanups run in reverse order; a panicking cleanup does not stop the rest
        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup));
        }

        self.contexts.borrow_mut().clear();

        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            let ptr = self as *const Self;
            parent.scopes.borrow_mut().retain(|s| !std::ptr::eq(Rc::as_ptr(s), ptr));
        }
    }

    pub fn add_effect(&self, effect: Rc<EffectInner>) {
        self.effects.borrow_mut().push(effect);
    }

    pub fn add_cleanup(&self, cleanup: ScopeCleanupFn) {
        self.cleanups.borrow_mut().push(cleanup);
    }

    fn provide(&self, key: ContextKey, value: Rc<dyn Any>) {
        self.contexts.borrow_mut().insert(key, value);
    }

    /// Nearest value for `key`, starting at this scope and walking up.
    fn lookup(&self, key: &ContextKey) -> Option<Rc<dyn Any>> {
        if let Some(value) = self.contexts.borrow().get(key) {
            return Some(value.clone());
        }
        let mut current = self.parent.as_ref().and_then(Weak::upgrade);
        while let Some(scope) = current {
            if let Some(value) = scope.contexts.borrow().get(key) {
                return Some(value.clone());
            }
            current = scope.parent.as_ref().and_then(Weak::upgrade);
        }
        None
    }
}

impl Drop for EffectScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// EFFECT SCOPE (Public wrapper)
// =============================================================================

/// An owner scope: groups effects for disposal and carries context values.
///
/// # Example
///
/// ```
/// use spark_compose::{effect_scope, effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let runs = Rc::new(Cell::new(0));
/// let scope = effect_scope(true);
///
/// scope.run(|| {
///     let (count, runs) = (count.clone(), runs.clone());
///     effect(move || {
///         count.get();
///         runs.set(runs.get() + 1);
///     });
/// });
///
/// scope.stop();
/// count.set(1);
/// assert_eq!(runs.get(), 1);
/// ```
#[derive(Clone)]
pub struct EffectScope {
    inner: Rc<EffectScopeInner>,
}

impl EffectScope {
    fn from_inner(inner: Rc<EffectScopeInner>) -> Self {
        Self { inner }
    }

    pub fn active(&self) -> bool {
        self.inner.is_active()
    }

    /// Run `f` with this scope active. Returns None if the scope was stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        self.inner.run(f)
    }

    /// Run `f` with this scope active, even if it was stopped.
    pub fn within<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.within(f)
    }

    /// Create a scope owned by this one.
    pub fn child(&self) -> EffectScope {
        EffectScope::from_inner(EffectScopeInner::new(Some(self.inner.clone())))
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Number of live child scopes.
    pub fn child_count(&self) -> usize {
        self.inner.scopes.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.active())
            .field("children", &self.child_count())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a scope. Unless `detached`, it is owned by the active scope.
pub fn effect_scope(detached: bool) -> EffectScope {
    let parent = if detached { None } else { get_active_scope() };
    EffectScope::from_inner(EffectScopeInner::new(parent))
}

/// The active scope, if any.
pub fn get_current_scope() -> Option<EffectScope> {
    get_active_scope().map(EffectScope::from_inner)
}

/// Register a cleanup on the active scope. Without one, nothing is registered.
pub fn on_scope_dispose<F: FnOnce() + 'static>(f: F) {
    match get_active_scope() {
        Some(scope) => scope.add_cleanup(Box::new(f)),
        None => tracing::debug!("on_scope_dispose called outside of a scope; ignored"),
    }
}

/// Register an effect with the active scope.
pub fn register_effect_with_scope(effect: &Rc<EffectInner>) {
    if let Some(scope) = get_active_scope() {
        scope.add_effect(effect.clone());
    }
}

/// Provide `value` under `key` on the active scope.
///
/// Returns false (and provides nothing) when no scope is active.
pub fn provide_context<T: 'static>(key: ContextKey, value: T) -> bool {
    match get_active_scope() {
        Some(scope) => {
            scope.provide(key, Rc::new(value));
            true
        }
        None => false,
    }
}

/// Nearest value provided under `key`, visible from the active scope.
pub fn use_context<T: Clone + 'static>(key: ContextKey) -> Option<T> {
    let scope = get_active_scope()?;
    let value = scope.lookup(&key)?;
    value.downcast_ref::<T>().cloned()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::effect::effect;
    use crate::primitives::signal::signal;

    const NAME: &str = "Theme";

    #[test]
    fn stop_disposes_effects_and_runs_cleanups_in_reverse() {
        let scope = effect_scope(true);
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));
        let order = Rc::new(RefCell::new(Vec::new()));

        scope.run(|| {
            let (count, runs) = (count.clone(), runs.clone());
            effect(move || {
                count.get();
                runs.set(runs.get() + 1);
            });
            for i in 0..3 {
                let order = order.clone();
                on_scope_dispose(move || order.borrow_mut().push(i));
            }
        });

        scope.stop();
        count.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
        assert!(scope.run(|| ()).is_none());
    }

    #[test]
    fn child_scopes_stop_with_parent() {
        let parent = effect_scope(true);
        let child = parent.child();
        assert_eq!(parent.child_count(), 1);

        parent.stop();
        assert!(!child.active());
    }

    #[test]
    fn stopped_child_leaves_parent_list() {
        let parent = effect_scope(true);
        let child = parent.child();
        child.stop();
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn context_is_visible_in_descendants_and_innermost_wins() {
        let key = ContextKey::of::<String>(NAME);
        let root = effect_scope(true);

        root.run(|| {
            assert!(provide_context(key, String::from("outer")));
            let inner = effect_scope(false);
            inner.run(|| {
                assert_eq!(use_context::<String>(key).as_deref(), Some("outer"));
                provide_context(key, String::from("inner"));
                assert_eq!(use_context::<String>(key).as_deref(), Some("inner"));
            });
            assert_eq!(use_context::<String>(key).as_deref(), Some("outer"));
        });
    }

    #[test]
    fn names_and_types_keep_contexts_apart() {
        let root = effect_scope(true);
        root.run(|| {
            provide_context(ContextKey::of::<u32>("A"), 1u32);
            assert_eq!(use_context::<u32>(ContextKey::of::<u32>("B")), None);
            assert_eq!(use_context::<i64>(ContextKey::of::<i64>("A")), None);
            assert_eq!(use_context::<u32>(ContextKey::of::<u32>("A")), Some(1));
        });
    }

    #[test]
    fn no_scope_means_no_context() {
        let key = ContextKey::of::<u8>("Nothing");
        assert!(!provide_context(key, 1u8));
        assert_eq!(use_context::<u8>(key), None);
        assert!(get_current_scope().is_none());
    }

    #[test]
    fn within_restores_previous_scope_on_panic() {
        let scope = effect_scope(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scope.within(|| panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(get_current_scope().is_none());
    }
}
