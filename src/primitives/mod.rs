// ============================================================================
// spark-compose - Primitives Module
// Core reactive primitives: signal, derived, effect, scope, props
// ============================================================================

pub mod derived;
pub mod effect;
pub mod props;
pub mod scope;
pub mod signal;

pub use derived::{Derived, DerivedInner, derived, derived_with_equals};
pub use effect::{
    CleanupFn, Effect, EffectFn, EffectInner, destroy_effect, effect, effect_tracking,
    effect_with_cleanup, render_effect, update_effect,
};
pub use props::{PropValue, reactive_prop};
pub use scope::{
    ContextKey, EffectScope, ScopeCleanupFn, effect_scope, get_current_scope, on_scope_dispose,
    provide_context, register_effect_with_scope, use_context,
};
pub use signal::{Signal, signal, signal_with_equals};
