// ============================================================================
// spark-compose - Reactive Component State for Rust
// ============================================================================
//
// Typed context capabilities, controllable state, checkbox groups, and
// form-field binding, on top of a fine-grained signals runtime.
//
// Layers, leaf first:
//   core / reactivity / primitives  signals, deriveds, effects, owner scopes
//   value / id / view / runtime     dynamic values, ids, views, mounting
//   component                       capabilities, controllable state, checkbox group
//   form                            form store, fields, field leaves
// ============================================================================

pub mod component;
pub mod core;
pub mod error;
pub mod form;
pub mod id;
pub mod primitives;
pub mod reactivity;
pub mod runtime;
pub mod value;
pub mod view;

mod macros;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::context::{ReactiveContext, is_batching, is_tracking, is_untracking, with_context};
pub use core::types::{AnyReaction, AnySource, EqualsFn, SourceInner, default_equals};

// Reactive primitives
pub use primitives::derived::{Derived, derived, derived_with_equals};
pub use primitives::effect::{
    CleanupFn, Effect, effect, effect_tracking, effect_with_cleanup, render_effect,
};
pub use primitives::props::{PropValue, reactive_prop};
pub use primitives::scope::{
    ContextKey, EffectScope, effect_scope, get_current_scope, on_scope_dispose, provide_context,
    use_context,
};
pub use primitives::signal::{Signal, signal, signal_with_equals};

pub use reactivity::batching::{batch, peek, tick, untrack};
pub use reactivity::equality::{ShallowEq, equals, shallow_equals};
pub use reactivity::scheduling::flush_sync;

// Values, views, mounting
pub use error::{Error, Result};
pub use id::{set_id_prefix, use_id};
pub use runtime::{MountHandle, mount};
pub use value::{CheckboxValue, Symbol, Value};
pub use view::{Attr, AttrValue, Element, Event, Handler, Node, View};

// Components
pub use component::capability::{Capability, Lookup, Provided};
pub use component::checkbox_group::{
    CheckboxGroupContext, CheckboxGroupItemProps, CheckboxGroupProps, checkbox_group,
    checkbox_group_item,
};
pub use component::controllable::{Controllable, ControllableOptions, Mode, Setter};

// Forms
pub use form::field::{
    FieldChildren, FieldContext, FormFieldProps, FormFieldState, FormProps, form, form_field,
    use_form_field,
};
pub use form::leaves::{
    FieldControlProps, field, field_content, field_control, field_description, field_error,
    field_error_with, field_group, field_label, field_legend, field_separator, field_set,
    field_title,
};
pub use form::store::{
    ControllerArgs, ErrorKind, FieldBinding, FieldError, FieldState, FormOptions,
    FormStateSnapshot, FormStore, Rules, SetValueOptions, ValidationMode,
};

// =============================================================================
// TESTS
// =============================================================================
