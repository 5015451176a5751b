// ============================================================================
// spark-compose - Reactive Props
// Normalize component props to a consistent reactive interface
// ============================================================================

use std::rc::Rc;

use crate::primitives::derived::{Derived, derived};
use crate::primitives::signal::Signal;

// =============================================================================
// PROP VALUE - A value that can be static, getter, signal, or derived
// =============================================================================

/// A prop that can be a plain value or something reactive.
///
/// Components read props through [`PropValue::get`], which subscribes the
/// active reaction when the prop is reactive, so the caller decides whether
/// a prop is fixed or live.
///
/// # Example
///
/// ```
/// use spark_compose::{PropValue, reactive_prop, signal};
///
/// let fixed = PropValue::value("hello".to_string());
/// assert_eq!(fixed.get(), "hello");
///
/// let name = signal("reactive".to_string());
/// let live = PropValue::from_signal(&name);
/// let normalized = reactive_prop(live);
/// name.set("changed".to_string());
/// assert_eq!(normalized.get(), "changed");
/// ```
pub enum PropValue<T: 'static> {
    /// A static (non-reactive) value
    Static(T),

    /// A getter function that computes the value
    Getter(Rc<dyn Fn() -> T>),

    /// A signal reference
    Signal(Signal<T>),

    /// A derived reference
    Derived(Derived<T>),
}

impl<T: Clone + 'static> Clone for PropValue<T> {
    fn clone(&self) -> Self {
        match self {
            PropValue::Static(v) => PropValue::Static(v.clone()),
            PropValue::Getter(f) => PropValue::Getter(f.clone()),
            PropValue::Signal(s) => PropValue::Signal(s.clone()),
            PropValue::Derived(d) => PropValue::Derived(d.clone()),
        }
    }
}

impl<T: Clone + 'static> PropValue<T> {
    pub fn value(val: T) -> Self {
        PropValue::Static(val)
    }

    pub fn getter<F: Fn() -> T + 'static>(f: F) -> Self {
        PropValue::Getter(Rc::new(f))
    }

    pub fn from_signal(signal: &Signal<T>) -> Self {
        PropValue::Signal(signal.clone())
    }

    pub fn from_derived(derived: &Derived<T>) -> Self {
        PropValue::Derived(derived.clone())
    }

    /// Current value, subscribing the active reaction if the prop is reactive.
    pub fn get(&self) -> T {
        match self {
            PropValue::Static(v) => v.clone(),
            PropValue::Getter(f) => f(),
            PropValue::Signal(s) => s.get(),
            PropValue::Derived(d) => d.get(),
        }
    }

    /// Current value without creating a dependency.
    pub fn peek(&self) -> T {
        match self {
            PropValue::Static(v) => v.clone(),
            PropValue::Getter(f) => crate::reactivity::batching::untrack(|| f()),
            PropValue::Signal(s) => s.peek(),
            PropValue::Derived(d) => d.peek(),
        }
    }

    /// Whether the prop can change after construction.
    pub fn is_reactive(&self) -> bool {
        !matches!(self, PropValue::Static(_))
    }
}

impl<T: 'static> From<Signal<T>> for PropValue<T> {
    fn from(signal: Signal<T>) -> Self {
        PropValue::Signal(signal)
    }
}

impl<T: 'static> From<Derived<T>> for PropValue<T> {
    fn from(derived: Derived<T>) -> Self {
        PropValue::Derived(derived)
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for PropValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropValue::Static(v) => f.debug_tuple("Static").field(v).finish(),
            other => f.debug_tuple("Reactive").field(&other.peek()).finish(),
        }
    }
}

// =============================================================================
// REACTIVE PROP - Convert PropValue to Derived
// =============================================================================

/// Convert a PropValue to a Derived for uniform reactive access.
pub fn reactive_prop<T: Clone + PartialEq + 'static>(prop: PropValue<T>) -> Derived<T> {
    match prop {
        PropValue::Derived(d) => d,
        other => derived(move || other.get()),
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
    fn static_prop_is_not_reactive() {
        let p = PropValue::value(3);
        assert!(!p.is_reactive());
        assert_eq!(p.get(), 3);
        assert_eq!(p.peek(), 3);
    }

    #[test]
    fn getter_prop_tracks_inside_effects() {
        let n = signal(1);
        let p = PropValue::getter({
            let n = n.clone();
            move || n.get() * 10
        });
        let seen = Rc::new(Cell::new(0));
        let _e = effect({
            let (p, seen) = (p.clone(), seen.clone());
            move || seen.set(p.get())
        });

        assert_eq!(seen.get(), 10);
        n.set(2);
        assert_eq!(seen.get(), 20);
    }

    #[test]
    fn peek_does_not_track() {
        let n = signal(1);
        let p: PropValue<i32> = n.clone().into();
        let seen = Rc::new(Cell::new(0));
        let _e = effect({
            let (p, seen) = (p.clone(), seen.clone());
            move || seen.set(p.peek())
        });

        n.set(2);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn reactive_prop_reuses_derived() {
        let d = derived(|| 5);
        let normalized = reactive_prop(PropValue::from_derived(&d));
        assert!(normalized.ptr_eq(&d));
    }

    #[test]
    fn debug_reports_kind() {
        assert_eq!(format!("{:?}", PropValue::value(1)), "Static(1)");
        assert_eq!(format!("{:?}", PropValue::from_signal(&signal(2))), "Reactive(2)");
    }
}
