// ============================================================================
// spark-compose - Equality Functions
// Value equality for signals and shallow equality for provided values
// ============================================================================

use std::rc::Rc;

use crate::core::types::EqualsFn;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
///
/// # Example
/// ```
/// use spark_compose::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Equality for f64 where NaN equals NaN and `-0.0` equals `0.0`.
///
/// # Example
/// ```
/// use spark_compose::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(safe_equals_f64(&-0.0, &0.0));
/// assert!(!safe_equals_f64(&f64::NAN, &1.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Element-wise equality for slices.
pub fn shallow_equals_slice<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Never equal: every write counts as a change.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

// =============================================================================
// SHALLOW EQUALITY
// =============================================================================

/// One-level comparison used for values published through a provider.
///
/// Plain data compares by value. Shared handles (`Rc`, signals, deriveds,
/// setters) compare by identity, so a provider that republishes the same
/// handle does not wake its consumers.
///
/// # Example
/// ```
/// use spark_compose::ShallowEq;
/// use std::rc::Rc;
///
/// let a = Rc::new(vec![1]);
/// let b = Rc::new(vec![1]);
/// assert!(a.shallow_eq(&a.clone()));
/// assert!(!a.shallow_eq(&b));
/// assert!(String::from("x").shallow_eq(&String::from("x")));
/// ```
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// `ShallowEq` as a signal equality function.
pub fn shallow_equals<T: ShallowEq>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

/// The shallow equality function for a type.
pub fn shallow_equals_fn<T: ShallowEq + 'static>() -> EqualsFn<T> {
    shallow_equals
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

shallow_eq_by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    String,
    &'static str,
);

impl ShallowEq for f64 {
    fn shallow_eq(&self, other: &Self) -> bool {
        safe_equals_f64(self, other)
    }
}

impl<T: ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

impl<T: PartialEq> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equals_slice(self, other)
    }
}

impl<A: ShallowEq, B: ShallowEq> ShallowEq for (A, B) {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.0.shallow_eq(&other.0) && self.1.shallow_eq(&other.1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_equals_f64_handles_nan() {
        assert!(safe_equals_f64(&1.0, &1.0));
        assert!(!safe_equals_f64(&1.0, &2.0));
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(!safe_equals_f64(&1.0, &f64::NAN));
        assert!(!safe_equals_f64(&f64::INFINITY, &f64::NEG_INFINITY));
    }

    #[test]
    fn never_equals_forces_change() {
        assert!(!never_equals(&1, &1));
    }

    #[test]
    fn rc_compares_by_identity() {
        let a: Rc<dyn Fn()> = Rc::new(|| {});
        let b: Rc<dyn Fn()> = Rc::new(|| {});
        assert!(a.shallow_eq(&a.clone()));
        assert!(!a.shallow_eq(&b));
    }

    #[test]
    fn vec_compares_one_level() {
        assert!(vec![1, 2].shallow_eq(&vec![1, 2]));
        assert!(!vec![1, 2].shallow_eq(&vec![2, 1]));
    }

    #[test]
    fn struct_fields_compare_independently() {
        struct Ctx {
            name: String,
            handler: Rc<dyn Fn()>,
        }

        impl ShallowEq for Ctx {
            fn shallow_eq(&self, other: &Self) -> bool {
                self.name.shallow_eq(&other.name) && self.handler.shallow_eq(&other.handler)
            }
        }

        let handler: Rc<dyn Fn()> = Rc::new(|| {});
        let a = Ctx {
            name: "a".into(),
            handler: handler.clone(),
        };
        let b = Ctx {
            name: "a".into(),
            handler,
        };
        let c = Ctx {
            name: "a".into(),
            handler: Rc::new(|| {}),
        };

        let eq: EqualsFn<Ctx> = shallow_equals_fn();
        assert!(eq(&a, &b));
        assert!(!eq(&a, &c));
    }

    #[test]
    fn option_and_tuple_compose() {
        assert!(Some(3u32).shallow_eq(&Some(3)));
        assert!(!Some(3u32).shallow_eq(&None));
        assert!(("a", 1i32).shallow_eq(&("a", 1)));
    }
}
