// ============================================================================
// spark-compose - Derived Signals
// Lazy computed values that cache and update when dependencies change
// ============================================================================
//
// A Derived is BOTH a Source (can be read, has subscribers) AND a Reaction
// (has deps, can be marked stale, recomputes). A stale derived only
// recomputes when one of its dependencies moved to a new version, and only
// bumps its own version when the recomputed value differs under its
// equality function.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::types::{AnyReaction, AnySource, Dependency, EqualsFn, Subscribers, default_equals};
use crate::reactivity::equality::ShallowEq;
use crate::reactivity::tracking::{deps_changed, run_tracked, track_read};

// =============================================================================
// DERIVED INNER
// =============================================================================

/// The internal data for a derived signal.
pub struct DerivedInner<T> {
    /// Flags bitmask (DERIVED | status)
    flags: Cell<u32>,

    /// The computation function
    func: Box<dyn Fn() -> T>,

    /// Cached value (None = never computed)
    value: RefCell<Option<T>>,

    equals: EqualsFn<T>,

    /// Bumped whenever the cached value changes
    version: Cell<u64>,

    subscribers: Subscribers,

    deps: RefCell<Vec<Dependency>>,

    self_weak: Weak<DerivedInner<T>>,
}

impl<T: 'static> DerivedInner<T> {
    pub fn new<F>(func: F) -> Rc<Self>
    where
        F: Fn() -> T + 'static,
        T: PartialEq,
    {
        Self::new_with_equals(func, default_equals)
    }

    pub fn new_with_equals<F>(func: F, equals: EqualsFn<T>) -> Rc<Self>
    where
        F: Fn() -> T + 'static,
    {
        Rc::new_cyclic(|self_weak| Self {
            flags: Cell::new(DERIVED | SOURCE | DIRTY),
            func: Box::new(func),
            value: RefCell::new(None),
            equals,
            version: Cell::new(0),
            subscribers: Subscribers::default(),
            deps: RefCell::new(Vec::new()),
            self_weak: self_weak.clone(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Recompute if stale and a dependency actually moved.
    pub fn update_if_stale(&self) {
        let flags = self.flags.get();
        if flags & (DIRTY | MAYBE_DIRTY) == 0 {
            return;
        }
        if flags & REACTION_IS_UPDATING != 0 {
            panic!("Cycle detected: a derived read itself while computing.");
        }

        if !self.is_initialized() || deps_changed(self) {
            self.compute();
        } else {
            AnyReaction::set_status(self, CLEAN);
        }
    }

    /// Run the computation and store the result if it differs.
    /// Returns true if the value changed.
    pub fn compute(&self) -> bool {
        let Some(this) = self.self_weak.upgrade() else {
            return false;
        };
        let reaction: Rc<dyn AnyReaction> = this;
        let next = run_tracked(&reaction, || (self.func)());
        AnyReaction::set_status(self, CLEAN);

        let changed = match self.value.borrow().as_ref() {
            Some(prev) => !(self.equals)(prev, &next),
            None => true,
        };
        if changed {
            *self.value.borrow_mut() = Some(next);
            self.version.set(self.version.get() + 1);
        }
        changed
    }

    /// Access the cached value, bringing it up to date first.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.update_if_stale();
        let value = self.value.borrow();
        f(value.as_ref().expect("derived computed before read"))
    }
}

impl<T: 'static> AnySource for DerivedInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    fn refresh(&self) {
        self.update_if_stale();
    }

    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        self.self_weak
            .upgrade()
            .map(|rc| rc as Rc<dyn AnyReaction>)
    }
}

impl<T: 'static> AnyReaction for DerivedInner<T> {
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
        self.update_if_stale();
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        self.self_weak.upgrade().map(|rc| rc as Rc<dyn AnySource>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// DERIVED<T> WRAPPER
// =============================================================================

/// A lazily computed value that caches and updates.
///
/// # Example
/// ```
/// use spark_compose::{derived, signal};
///
/// let count = signal(1);
/// let doubled = derived({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 2);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Derived<T> {
    pub(crate) fn from_inner(inner: Rc<DerivedInner<T>>) -> Self {
        Self { inner }
    }

    /// Current value, subscribing the active reaction.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Access the current value with a closure, subscribing the active reaction.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.update_if_stale();
        track_read(self.as_any_source());
        self.inner.with_value(f)
    }

    /// Current value without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.with_value(T::clone)
    }

    pub fn inner(&self) -> &Rc<DerivedInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }

    pub fn as_any_reaction(&self) -> Rc<dyn AnyReaction> {
        self.inner.clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner
            .with_value(|value| f.debug_struct("Derived").field("value", value).finish())
    }
}

impl<T> ShallowEq for Derived<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a derived signal.
pub fn derived<T, F>(func: F) -> Derived<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    Derived::from_inner(DerivedInner::new(func))
}

/// Create a derived signal with a custom equality function.
pub fn derived_with_equals<T, F>(func: F, equals: EqualsFn<T>) -> Derived<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Derived::from_inner(DerivedInner::new_with_equals(func, equals))
}

// =============================================================================
// TESTS
// =============================================================================
