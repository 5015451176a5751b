// ============================================================================
// spark-compose - Unique Ids
// Generated element ids for linking labels, controls and messages
// ============================================================================

use std::cell::{Cell, RefCell};

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
    static ID_PREFIX: RefCell<String> = RefCell::new(String::from("r"));
}

/// A fresh id of the form `:r0:`, unique on this thread.
///
/// # Example
///
/// ```
/// use spark_compose::use_id;
///
/// let a = use_id();
/// let b = use_id();
/// assert_ne!(a, b);
/// assert!(a.starts_with(":r") && a.ends_with(':'));
/// ```
pub fn use_id() -> String {
    let n = NEXT_ID.with(|next| next.replace(next.get() + 1));
    ID_PREFIX.with(|prefix| format!(":{}{}:", prefix.borrow(), n))
}

/// Change the prefix of ids generated on this thread from now on.
pub fn set_id_prefix(prefix: impl Into<String>) {
    let prefix = prefix.into();
    ID_PREFIX.with(|p| *p.borrow_mut() = prefix);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_thread() {
        let first = use_id();
        let second = use_id();
        assert_eq!(first, ":r0:");
        assert_eq!(second, ":r1:");
    }

    #[test]
    fn prefix_is_configurable() {
        set_id_prefix("form");
        assert!(use_id().starts_with(":form"));
    }
}
