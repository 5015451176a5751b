// ============================================================================
// spark-compose - Signal Primitive
// The core writable reactive signal
// ============================================================================

use std::rc::Rc;

use crate::core::types::{AnySource, EqualsFn, SourceInner};
use crate::reactivity::equality::ShallowEq;
use crate::reactivity::tracking::{notify_write, track_read};

// =============================================================================
// SIGNAL<T> - The public signal handle
// =============================================================================

/// A reactive cell holding a value of type T.
///
/// Reading inside an effect or derived subscribes it; writing a different
/// value wakes every subscriber.
///
/// # Example
///
/// ```
/// use spark_compose::signal;
///
/// let count = signal(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Get the current value (cloning), subscribing the active reaction.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.as_any_source());
        self.inner.get()
    }

    /// Read the current value without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Access the current value with a closure (avoids cloning).
    ///
    /// # Example
    ///
    /// ```
    /// use spark_compose::signal;
    ///
    /// let items = signal(vec![1, 2, 3]);
    /// let sum = items.with(|v| v.iter().sum::<i32>());
    /// assert_eq!(sum, 6);
    /// ```
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.as_any_source());
        self.inner.with(f)
    }

    /// Set the value. Returns true if it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            notify_write(self.as_any_source());
        }
        changed
    }

    /// Mutate the value in place. Always notifies.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_compose::signal;
    ///
    /// let count = signal(0);
    /// count.update(|n| *n += 1);
    /// assert_eq!(count.get(), 1);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
        notify_write(self.as_any_source());
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }

    /// Whether two handles point at the same signal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> ShallowEq for Signal<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner
            .with(|value| f.debug_struct("Signal").field("value", value).finish())
    }
}

// =============================================================================
// SIGNAL CREATION FUNCTIONS
// =============================================================================

/// Create a new reactive signal.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a signal with a custom equality function.
///
/// # Example
///
/// ```
/// use spark_compose::signal_with_equals;
/// use spark_compose::reactivity::equality::never_equals;
///
/// let ticks = signal_with_equals((), never_equals);
/// assert!(ticks.set(()));
/// ```
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_change() {
        let s = signal(1);
        assert!(!s.set(1));
        assert!(s.set(2));
        assert_eq!(s.get(), 2);
    }

    #[test]
    fn clones_share_state() {
        let a = signal(String::from("x"));
        let b = a.clone();
        b.set("y".into());
        assert_eq!(a.get(), "y");
        assert!(a.ptr_eq(&b));
        assert!(a.shallow_eq(&b));
        assert!(!a.shallow_eq(&signal(String::from("y"))));
    }

    #[test]
    fn debug_shows_value() {
        let s = signal(7);
        assert_eq!(format!("{s:?}"), "Signal { value: 7 }");
    }

    #[test]
    fn peek_outside_reaction_reads_value() {
        let s = signal(vec![1, 2]);
        assert_eq!(s.peek(), vec![1, 2]);
    }
}
