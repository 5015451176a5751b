// ============================================================================
// spark-compose - Controllable State
// One read/write handle over externally owned or internally owned state
// ============================================================================
//
// When the caller passes a value, the state is controlled: reads follow the
// caller's value and writes only propose a change through `on_change`. When
// the caller passes nothing, the state owns a signal seeded from the default
// and writes land there, notifying `on_change` when the value moved.
//
// The mode is fixed when the state is created. A prop that appears or
// disappears later is reported once (debug builds) and otherwise ignored.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::primitives::props::PropValue;
use crate::primitives::signal::Signal;
use crate::reactivity::equality::ShallowEq;

/// Change callback shared between a state and its setters.
pub type ChangeFn<T> = Rc<dyn Fn(&T)>;

// =============================================================================
// OPTIONS
// =============================================================================

/// Inputs to [`Controllable::new`].
pub struct ControllableOptions<T: 'static> {
    /// The caller's value. `None`, or a prop currently yielding `None`, means uncontrolled.
    pub prop: Option<PropValue<Option<T>>>,
    /// Seed for the internal value when uncontrolled.
    pub default_prop: T,
    pub on_change: Option<ChangeFn<T>>,
    /// Component name used in warnings.
    pub caller: &'static str,
}

impl<T: 'static> ControllableOptions<T> {
    pub fn new(default_prop: T) -> Self {
        Self {
            prop: None,
            default_prop,
            on_change: None,
            caller: "Controllable",
        }
    }

    pub fn with_prop(mut self, prop: PropValue<Option<T>>) -> Self {
        self.prop = Some(prop);
        self
    }

    pub fn with_on_change<F: Fn(&T) + 'static>(mut self, on_change: F) -> Self {
        self.on_change = Some(Rc::new(on_change));
        self
    }

    pub fn with_caller(mut self, caller: &'static str) -> Self {
        self.caller = caller;
        self
    }
}

/// Who owns the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Controlled,
    Uncontrolled,
}

// =============================================================================
// CONTROLLABLE
// =============================================================================

struct ControllableInner<T: 'static> {
    mode: Mode,
    caller: &'static str,
    prop: Option<PropValue<Option<T>>>,
    default_prop: T,
    /// Owned value when uncontrolled
    internal: Signal<T>,
    /// Last value the caller supplied when controlled
    last_external: RefCell<Option<T>>,
    on_change: Option<ChangeFn<T>>,
    warned: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> ControllableInner<T> {
    fn warn_mode_switch(&self, from: &str, to: &str) {
        if cfg!(debug_assertions) && !self.warned.replace(true) {
            tracing::warn!(
                caller = self.caller,
                "{} is changing from {from} to {to}. Components should not switch from \
                 controlled to uncontrolled (or vice versa). Decide between using a \
                 controlled or uncontrolled value for the lifetime of the component.",
                self.caller
            );
        }
    }

    fn resolve(&self, external: Option<Option<T>>) -> T {
        match self.mode {
            Mode::Controlled => match external.flatten() {
                Some(value) => {
                    *self.last_external.borrow_mut() = Some(value.clone());
                    value
                }
                None => {
                    self.warn_mode_switch("controlled", "uncontrolled");
                    self.last_external
                        .borrow()
                        .clone()
                        .unwrap_or_else(|| self.default_prop.clone())
                }
            },
            Mode::Uncontrolled => {
                if matches!(external, Some(Some(_))) {
                    self.warn_mode_switch("uncontrolled", "controlled");
                }
                self.internal.get()
            }
        }
    }

    fn notify(&self, value: &T) {
        if let Some(on_change) = &self.on_change {
            on_change(value);
        }
    }
}

/// Controlled-or-uncontrolled state.
///
/// # Example
///
/// ```
/// use spark_compose::{Controllable, ControllableOptions, PropValue, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// // Uncontrolled: writes land internally
/// let state = Controllable::new(ControllableOptions::new(1));
/// state.set(2);
/// assert_eq!(state.get(), 2);
///
/// // Controlled: writes only propose
/// let external = signal(Some(10));
/// let proposed = Rc::new(RefCell::new(Vec::new()));
/// let state = Controllable::new(
///     ControllableOptions::new(0)
///         .with_prop(PropValue::from_signal(&external))
///         .with_on_change({
///             let proposed = proposed.clone();
///             move |v: &i32| proposed.borrow_mut().push(*v)
///         }),
/// );
/// state.set(11);
/// assert_eq!(state.get(), 10);
/// assert_eq!(*proposed.borrow(), vec![11]);
/// ```
pub struct Controllable<T: 'static> {
    inner: Rc<ControllableInner<T>>,
}

impl<T: 'static> Clone for Controllable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Controllable<T> {
    pub fn new(options: ControllableOptions<T>) -> Self {
        let ControllableOptions {
            prop,
            default_prop,
            on_change,
            caller,
        } = options;

        let initial = prop.as_ref().and_then(PropValue::peek);
        let mode = if initial.is_some() {
            Mode::Controlled
        } else {
            Mode::Uncontrolled
        };

        Self {
            inner: Rc::new(ControllableInner {
                mode,
                caller,
                prop,
                internal: Signal::new(default_prop.clone()),
                default_prop,
                last_external: RefCell::new(initial),
                on_change,
                warned: Cell::new(false),
            }),
        }
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn is_controlled(&self) -> bool {
        self.inner.mode == Mode::Controlled
    }

    /// Current value, subscribing the active reaction.
    pub fn get(&self) -> T {
        let external = self.inner.prop.as_ref().map(|prop| match self.inner.mode {
            Mode::Controlled => prop.get(),
            // Only looked at for the mode-switch warning
            Mode::Uncontrolled => prop.peek(),
        });
        self.inner.resolve(external)
    }

    /// Current value without subscribing.
    pub fn peek(&self) -> T {
        crate::reactivity::batching::untrack(|| self.get())
    }

    /// Write a new value, or propose it when controlled.
    pub fn set(&self, next: T) {
        match self.inner.mode {
            Mode::Controlled => {
                if next != self.peek() {
                    tracing::trace!(caller = self.inner.caller, "proposing controlled change");
                    self.inner.notify(&next);
                }
            }
            Mode::Uncontrolled => {
                if self.inner.internal.set(next.clone()) {
                    tracing::trace!(caller = self.inner.caller, "uncontrolled value changed");
                    self.inner.notify(&next);
                }
            }
        }
    }

    /// Write a value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.peek());
        self.set(next);
    }

    /// A cloneable write handle with stable identity.
    pub fn setter(&self) -> Setter<T> {
        Setter {
            state: self.clone(),
        }
    }
}

impl<T: 'static> ShallowEq for Controllable<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug + Clone + PartialEq + 'static> fmt::Debug for Controllable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controllable")
            .field("mode", &self.inner.mode)
            .field("value", &self.peek())
            .finish()
    }
}

// =============================================================================
// SETTER
// =============================================================================

/// Write half of a [`Controllable`]. Equal to every other setter of the same state.
pub struct Setter<T: 'static> {
    state: Controllable<T>,
}

impl<T: 'static> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Setter<T> {
    pub fn set(&self, next: T) {
        self.state.set(next);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.state.update(f);
    }
}

impl<T: 'static> ShallowEq for Setter<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.state.shallow_eq(&other.state)
    }
}

impl<T: 'static> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
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
    use tracing_test::traced_test;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&T) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |v: &T| sink.borrow_mut().push(v.clone()))
    }

    #[test]
    fn uncontrolled_owns_its_value() {
        let (log, on_change) = recorder::<String>();
        let state = Controllable::new(
            ControllableOptions::new("a".to_string()).with_on_change(on_change),
        );
        assert_eq!(state.mode(), Mode::Uncontrolled);

        state.set("b".into());
        state.set("b".into());
        assert_eq!(state.get(), "b");
        assert_eq!(*log.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn controlled_only_proposes() {
        let external = signal(Some(1));
        let (log, on_change) = recorder::<i32>();
        let state = Controllable::new(
            ControllableOptions::new(0)
                .with_prop(PropValue::from_signal(&external))
                .with_on_change(on_change),
        );
        assert!(state.is_controlled());

        state.set(2);
        state.set(1);
        assert_eq!(state.get(), 1);
        assert_eq!(*log.borrow(), vec![2]);

        external.set(Some(2));
        assert_eq!(state.get(), 2);
    }

    #[test]
    fn functional_update_reads_current_value() {
        let state = Controllable::new(ControllableOptions::new(vec![1]));
        state.update(|prev| {
            let mut next = prev.clone();
            next.push(2);
            next
        });
        assert_eq!(state.get(), vec![1, 2]);
    }

    #[test]
    fn readers_follow_both_modes() {
        let external = signal(Some(1));
        let controlled =
            Controllable::new(ControllableOptions::new(0).with_prop(external.clone().into()));
        let uncontrolled = Controllable::new(ControllableOptions::new(5));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let _e = effect({
            let (c, u, seen) = (controlled.clone(), uncontrolled.clone(), seen.clone());
            move || seen.borrow_mut().push((c.get(), u.get()))
        });

        external.set(Some(3));
        uncontrolled.set(6);
        assert_eq!(*seen.borrow(), vec![(1, 5), (3, 5), (3, 6)]);
    }

    #[test]
    fn controlled_keeps_last_value_when_prop_disappears() {
        let external = signal(Some(4));
        let state =
            Controllable::new(ControllableOptions::new(0).with_prop(external.clone().into()));
        external.set(None);
        assert_eq!(state.get(), 4);
        assert!(state.is_controlled());
    }

    #[test]
    fn setters_share_identity() {
        let state = Controllable::new(ControllableOptions::new(0));
        let other = Controllable::new(ControllableOptions::new(0));
        assert!(state.setter().shallow_eq(&state.setter()));
        assert!(!state.setter().shallow_eq(&other.setter()));

        state.setter().update(|n| n + 1);
        assert_eq!(state.get(), 1);
    }

    #[test]
    #[traced_test]
    fn switching_to_controlled_warns_once_and_is_ignored() {
        let external = signal(None::<i32>);
        let state = Controllable::new(
            ControllableOptions::new(1)
                .with_prop(external.clone().into())
                .with_caller("Slider"),
        );
        assert_eq!(state.mode(), Mode::Uncontrolled);

        external.set(Some(9));
        assert_eq!(state.get(), 1);
        assert_eq!(state.get(), 1);
        assert!(logs_contain(
            "Slider is changing from uncontrolled to controlled"
        ));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("is changing from")).count() {
                1 => Ok(()),
                n => Err(format!("expected one warning, saw {n}")),
            }
        });
    }

    #[test]
    #[traced_test]
    fn switching_to_uncontrolled_warns() {
        let external = signal(Some(2));
        let state = Controllable::new(ControllableOptions::new(0).with_prop(external.clone().into()));
        external.set(None);
        state.get();
        assert!(logs_contain("is changing from controlled to uncontrolled"));
    }
}
