// ============================================================================
// spark-compose - Ergonomic Macros
// ============================================================================

/// Clone handles into a move closure.
///
/// Saves the `let x = x.clone();` lines before every closure that captures
/// a signal, a store, or any other `Rc`-backed handle.
///
/// # Usage
///
/// ```rust
/// use spark_compose::{cloned, derived, signal};
///
/// let a = signal(1);
/// let b = signal(2);
///
/// let sum = derived(cloned!(a, b => move || a.get() + b.get()));
/// a.set(5);
/// assert_eq!(sum.get(), 7);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a derived, cloning the listed handles into it.
///
/// # Usage
///
/// ```rust
/// use spark_compose::{derived, signal};
///
/// let first = signal(String::from("Ada"));
/// let last = signal(String::from("Lovelace"));
///
/// let full = derived!(first, last => format!("{} {}", first.get(), last.get()));
/// assert_eq!(full.get(), "Ada Lovelace");
/// ```
#[macro_export]
macro_rules! derived {
    ($($deps:ident),+ => $body:expr) => {
        $crate::derived($crate::cloned!($($deps),+ => move || $body))
    };
    ($body:expr) => {
        $crate::derived(move || $body)
    };
}

/// Create an effect, cloning the listed handles into it.
///
/// Evaluates to the [`Effect`](crate::Effect) handle; keep it alive for as
/// long as the effect should run.
///
/// # Usage
///
/// ```rust
/// use spark_compose::{effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let _watch = effect!(count, seen => seen.set(count.get()));
/// count.set(3);
/// assert_eq!(seen.get(), 3);
/// ```
#[macro_export]
macro_rules! effect {
    ($($deps:ident),+ => $body:expr) => {
        $crate::effect($crate::cloned!($($deps),+ => move || { $body; }))
    };
    ($body:expr) => {
        $crate::effect(move || { $body; })
    };
}
