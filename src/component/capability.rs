// ============================================================================
// spark-compose - Capabilities
// Named, typed provider/consumer pairs carried down the owner tree
// ============================================================================
//
// A capability is declared once as a `static`. A provider component calls
// `provide` to publish a value for everything built beneath it; a consumer
// calls `use_value` (strict) or `lookup` (tagged) while it is being built.
//
// The published value is a derived compared with `ShallowEq`, so a provider
// that recomputes an equal value does not wake its consumers.
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};
use crate::primitives::derived::{Derived, derived_with_equals};
use crate::primitives::scope::{ContextKey, effect_scope, provide_context, use_context};
use crate::reactivity::equality::{ShallowEq, shallow_equals};

// =============================================================================
// CAPABILITY
// =============================================================================

/// A named context registration.
///
/// # Example
///
/// ```
/// use spark_compose::{Capability, effect_scope};
///
/// static THEME: Capability<String> = Capability::new("Theme");
///
/// let root = effect_scope(true);
/// root.run(|| {
///     assert!(THEME.use_value().is_err());
///
///     THEME.provide(|| "dark".to_string(), || {
///         let theme = THEME.use_value().unwrap();
///         assert_eq!(theme.get(), "dark");
///     });
/// });
/// ```
pub struct Capability<T> {
    name: &'static str,
    default: Option<fn() -> T>,
}

impl<T> Capability<T> {
    /// A capability with no default. Consumers outside a provider fail.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    /// A capability whose consumers fall back to `default()` outside a provider.
    pub const fn with_default(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the provider component, e.g. `CheckboxGroupProvider`.
    pub fn display_name(&self) -> String {
        format!("{}Provider", self.name)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl<T: Clone + ShallowEq + 'static> Capability<T> {
    fn key(&self) -> ContextKey {
        ContextKey::of::<Derived<T>>(self.name)
    }

    /// Publish `value` to everything `children` builds.
    ///
    /// `value` is re-evaluated whenever what it reads changes. The provider
    /// lives in a child of the active scope and goes away with it.
    pub fn provide<F, R>(&self, value: F, children: impl FnOnce() -> R) -> R
    where
        F: Fn() -> T + 'static,
    {
        let scope = effect_scope(false);
        tracing::debug!(capability = self.name, "provider scope created");

        let published = derived_with_equals(value, shallow_equals::<T>);
        scope.within(|| {
            provide_context(self.key(), published);
            children()
        })
    }

    /// Find the nearest provider, falling back to the default.
    pub fn lookup(&self) -> Lookup<T> {
        if let Some(published) = use_context::<Derived<T>>(self.key()) {
            return Lookup::InScope(published);
        }
        match self.default {
            Some(default) => Lookup::Default(default()),
            None => Lookup::Missing,
        }
    }

    /// The provided value, or a configuration error naming the provider.
    pub fn use_value(&self) -> Result<Provided<T>> {
        match self.lookup() {
            Lookup::InScope(published) => Ok(Provided::Scoped(published)),
            Lookup::Default(value) => Ok(Provided::Fallback(value)),
            Lookup::Missing => Err(Error::MissingProvider {
                capability: self.name,
            }),
        }
    }
}

impl<T> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

// =============================================================================
// LOOKUP RESULTS
// =============================================================================

/// Outcome of looking a capability up from the current position.
pub enum Lookup<T> {
    /// A provider above this point published a value.
    InScope(Derived<T>),
    /// No provider; the capability's default.
    Default(T),
    /// No provider and no default.
    Missing,
}

impl<T> Lookup<T> {
    pub fn is_in_scope(&self) -> bool {
        matches!(self, Lookup::InScope(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }
}

/// A capability value as a consumer sees it.
#[derive(Clone)]
pub enum Provided<T> {
    Scoped(Derived<T>),
    Fallback(T),
}

impl<T: Clone + 'static> Provided<T> {
    /// Current value. Subscribes the active reaction when provider-backed.
    pub fn get(&self) -> T {
        match self {
            Provided::Scoped(published) => published.get(),
            Provided::Fallback(value) => value.clone(),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Provided::Scoped(published) => published.with(f),
            Provided::Fallback(value) => f(value),
        }
    }

    pub fn peek(&self) -> T {
        match self {
            Provided::Scoped(published) => published.peek(),
            Provided::Fallback(value) => value.clone(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Provided::Scoped(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
