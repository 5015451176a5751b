// ============================================================================
// spark-compose - Type Definitions
// Type-erased traits and base types for the reactive graph
// ============================================================================
//
// Graph operations (mark stale, compare versions, track reads) never need the
// value type. Only reading and writing values does, so the graph is stored as
// `Rc<dyn AnySource>` / `Weak<dyn AnyReaction>` and the typed handles
// (`Signal<T>`, `Derived<T>`) sit on top.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;

// =============================================================================
// DEPENDENCY EDGE
// =============================================================================

/// A dependency edge: the source that was read and its version at read time.
#[derive(Clone)]
pub struct Dependency {
    pub source: Rc<dyn AnySource>,
    pub version: u64,
}

impl Dependency {
    /// Whether this edge points at `source` (pointer identity).
    pub fn is(&self, source: &Rc<dyn AnySource>) -> bool {
        same_node(&self.source, source)
    }
}

/// Pointer identity for type-erased graph nodes.
pub fn same_node<A: ?Sized, B: ?Sized>(a: &Rc<A>, b: &Rc<B>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

// =============================================================================
// SUBSCRIBERS
// =============================================================================

/// Weak list of reactions reading a source.
#[derive(Default)]
pub struct Subscribers {
    list: RefCell<Vec<Weak<dyn AnyReaction>>>,
}

impl Subscribers {
    pub fn add(&self, reaction: Weak<dyn AnyReaction>) {
        let ptr = reaction.as_ptr() as *const ();
        let mut list = self.list.borrow_mut();
        if !list.iter().any(|w| w.as_ptr() as *const () == ptr) {
            list.push(reaction);
        }
    }

    pub fn remove(&self, reaction: &Rc<dyn AnyReaction>) {
        let ptr = Rc::as_ptr(reaction) as *const ();
        self.list
            .borrow_mut()
            .retain(|w| w.strong_count() > 0 && w.as_ptr() as *const () != ptr);
    }

    /// Live reactions, collected so the borrow is released before callers mutate.
    pub fn snapshot(&self) -> Vec<Rc<dyn AnyReaction>> {
        let mut list = self.list.borrow_mut();
        list.retain(|w| w.strong_count() > 0);
        list.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.list.borrow().iter().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================

/// Type-erased source interface.
///
/// Implemented by `SourceInner<T>` (signals) and `DerivedInner<T>` (deriveds).
pub trait AnySource: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Monotonic version, bumped whenever the value changes.
    fn version(&self) -> u64;

    fn subscribers(&self) -> &Subscribers;

    /// Bring the value up to date. No-op for plain signals.
    fn refresh(&self) {}

    /// If this source is also a reaction (a derived), return it as one.
    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        None
    }

    fn reaction_count(&self) -> usize {
        self.subscribers().len()
    }

    fn is_derived(&self) -> bool {
        self.flags() & DERIVED != 0
    }
}

/// Type-erased reaction interface (effects and deriveds).
pub trait AnyReaction: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Current dependency edges (cloned out of the cell).
    fn deps(&self) -> Vec<Dependency>;

    /// Replace the dependency edges, returning the old ones.
    fn replace_deps(&self, deps: Vec<Dependency>) -> Vec<Dependency>;

    /// Re-execute: recompute a derived or run an effect.
    fn run(&self);

    /// If this reaction is also a source (a derived), return it as one.
    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>>;

    fn as_any(&self) -> &dyn Any;

    fn dep_count(&self) -> usize {
        self.deps().len()
    }

    fn is_derived(&self) -> bool {
        self.flags() & DERIVED != 0
    }

    fn is_effect(&self) -> bool {
        self.flags() & EFFECT != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn is_stale(&self) -> bool {
        self.flags() & (DIRTY | MAYBE_DIRTY) != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }

    fn set_status(&self, status: u32) {
        self.set_flags((self.flags() & STATUS_MASK) | status);
    }
}

// =============================================================================
// SOURCE INNER (the data behind Signal<T>)
// =============================================================================

/// Equality function type for comparing signal values
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// The internal data for a signal source.
pub struct SourceInner<T> {
    flags: Cell<u32>,
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: Subscribers,
    equals: EqualsFn<T>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            flags: Cell::new(SOURCE | CLEAN),
            value: RefCell::new(value),
            version: Cell::new(0),
            subscribers: Subscribers::default(),
            equals,
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value, returning true if it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = !(self.equals)(&self.value.borrow(), &value);
        if changed {
            *self.value.borrow_mut() = value;
            self.version.set(self.version.get() + 1);
        }
        changed
    }

    /// Mutate in place. Always counts as a change.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.version.set(self.version.get() + 1);
    }
}

impl<T: 'static> AnySource for SourceInner<T> {
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
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_inner_set_bumps_version_only_on_change() {
        let source = SourceInner::new(1);
        assert_eq!(source.version(), 0);

        assert!(!source.set(1));
        assert_eq!(source.version(), 0);

        assert!(source.set(2));
        assert_eq!(source.version(), 1);
        assert_eq!(source.get(), 2);
    }

    #[test]
    fn source_inner_update_always_bumps() {
        let source = SourceInner::new(vec![1]);
        source.update(|v| v.push(2));
        assert_eq!(source.version(), 1);
        assert_eq!(source.with(|v| v.len()), 2);
    }

    #[test]
    fn custom_equality_is_used() {
        let source = SourceInner::new_with_equals(1, |_, _| false);
        assert!(source.set(1));
    }

    #[test]
    fn heterogeneous_sources_share_a_trait_object() {
        let sources: Vec<Rc<dyn AnySource>> = vec![
            Rc::new(SourceInner::new(42i32)),
            Rc::new(SourceInner::new(String::from("hello"))),
        ];
        for source in &sources {
            assert!(source.flags() & SOURCE != 0);
            assert_eq!(source.reaction_count(), 0);
        }
        assert!(same_node(&sources[0], &sources[0]));
        assert!(!same_node(&sources[0], &sources[1]));
    }
}
