// ============================================================================
// spark-compose - Form Fields
// The form provider, field wrappers, and the field identity lookup
// ============================================================================
//
// `form` publishes a store. `form_field` registers one field with it and
// publishes that field's identity to the leaves built inside it, either as
// a bare id and name (render-callback style, the callback receives the
// controller arguments directly) or with a live controller snapshot
// (static style, the leaves wire themselves up from it).
// ============================================================================

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::component::capability::Capability;
use crate::error::Result;
use crate::form::store::{
    ControllerArgs, FieldBinding, FieldError, FieldState, FormStateSnapshot, FormStore, Rules,
};
use crate::id::use_id;
use crate::primitives::derived::{Derived, derived};
use crate::reactivity::equality::ShallowEq;
use crate::value::Value;
use crate::view::{AttrValue, Element, View};

// =============================================================================
// CAPABILITIES
// =============================================================================

pub static FORM: Capability<FormStore> = Capability::new("Form");

fn no_field() -> Option<FieldContext> {
    None
}

/// Field identity. Outside any field the lookup yields `None` rather than failing.
pub static FORM_FIELD: Capability<Option<FieldContext>> =
    Capability::with_default("FormField", no_field);

/// The identity a field publishes to its leaves.
#[derive(Clone, Debug)]
pub enum FieldContext {
    RenderProps {
        id: String,
        name: String,
    },
    Static {
        id: String,
        name: String,
        controller: Derived<ControllerArgs>,
    },
}

impl FieldContext {
    pub fn id(&self) -> &str {
        match self {
            FieldContext::RenderProps { id, .. } | FieldContext::Static { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldContext::RenderProps { name, .. } | FieldContext::Static { name, .. } => name,
        }
    }

    pub fn controller(&self) -> Option<&Derived<ControllerArgs>> {
        match self {
            FieldContext::RenderProps { .. } => None,
            FieldContext::Static { controller, .. } => Some(controller),
        }
    }
}

impl ShallowEq for FieldContext {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FieldContext::RenderProps { id, name },
                FieldContext::RenderProps {
                    id: other_id,
                    name: other_name,
                },
            ) => id == other_id && name == other_name,
            (
                FieldContext::Static {
                    id,
                    name,
                    controller,
                },
                FieldContext::Static {
                    id: other_id,
                    name: other_name,
                    controller: other_controller,
                },
            ) => id == other_id && name == other_name && controller.shallow_eq(other_controller),
            _ => false,
        }
    }
}

// =============================================================================
// FORM
// =============================================================================

pub type SubmitFn = Rc<dyn Fn(&BTreeMap<String, Value>)>;
pub type InvalidFn = Rc<dyn Fn(&BTreeMap<String, FieldError>)>;

/// Props for [`form`].
#[derive(Clone, Default)]
pub struct FormProps {
    pub on_submit: Option<SubmitFn>,
    pub on_invalid: Option<InvalidFn>,
    pub class: Option<String>,
    pub attrs: Vec<(String, AttrValue)>,
}

impl FormProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit<F: Fn(&BTreeMap<String, Value>) + 'static>(mut self, f: F) -> Self {
        self.on_submit = Some(Rc::new(f));
        self
    }

    pub fn on_invalid<F: Fn(&BTreeMap<String, FieldError>) + 'static>(mut self, f: F) -> Self {
        self.on_invalid = Some(Rc::new(f));
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

/// A `<form>` publishing `store` to everything `children` builds.
///
/// A `submit` event validates the store and calls `on_submit` or `on_invalid`.
pub fn form<F>(store: &FormStore, props: FormProps, children: F) -> Result<View>
where
    F: FnOnce() -> Result<View>,
{
    let FormProps {
        on_submit,
        on_invalid,
        class,
        attrs,
    } = props;

    let content = FORM.provide(
        {
            let store = store.clone();
            move || store.clone()
        },
        children,
    )?;

    let store = store.clone();
    let mut el = Element::new("form").on("submit", move |_| {
        store.handle_submit(
            |values| {
                if let Some(on_submit) = &on_submit {
                    on_submit(values);
                }
            },
            |errors| {
                if let Some(on_invalid) = &on_invalid {
                    on_invalid(errors);
                }
            },
        );
    });
    if let Some(class) = class {
        el = el.class(class);
    }
    for (name, value) in attrs {
        el = el.attr(name, value);
    }
    Ok(el.child(content).into())
}

// =============================================================================
// FORM FIELD
// =============================================================================

/// Props for [`form_field`].
#[derive(Clone, Debug)]
pub struct FormFieldProps {
    /// Field path in the store.
    pub name: String,
    pub rules: Rules,
    /// Explicit id. Generated with [`use_id`] when absent.
    pub id: Option<String>,
}

impl FormFieldProps {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Rules::default(),
            id: None,
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What a field renders.
pub enum FieldChildren {
    /// Called with the current controller arguments every time they change.
    Render(Rc<dyn Fn(ControllerArgs) -> View>),
    /// Built once; leaves read the field through [`use_form_field`].
    Static(Box<dyn FnOnce() -> Result<View>>),
}

impl FieldChildren {
    pub fn render<F: Fn(ControllerArgs) -> View + 'static>(f: F) -> Self {
        FieldChildren::Render(Rc::new(f))
    }

    pub fn build<F: FnOnce() -> Result<View> + 'static>(f: F) -> Self {
        FieldChildren::Static(Box::new(f))
    }
}

/// Register a field with the enclosing form and publish its identity.
///
/// Fails with `MissingProvider { capability: "Form" }` outside a [`form`].
pub fn form_field(props: FormFieldProps, children: FieldChildren) -> Result<View> {
    let store = FORM.use_value()?.peek();
    let FormFieldProps { name, rules, id } = props;

    store.register(&name, rules);
    let id = id.unwrap_or_else(use_id);

    match children {
        FieldChildren::Render(render) => {
            let context = FieldContext::RenderProps {
                id,
                name: name.clone(),
            };
            Ok(FORM_FIELD.provide(
                move || Some(context.clone()),
                || View::dynamic(move || render(store.controller(&name))),
            ))
        }
        FieldChildren::Static(build) => {
            let controller = derived({
                let name = name.clone();
                move || store.controller(&name)
            });
            let context = FieldContext::Static {
                id,
                name,
                controller,
            };
            FORM_FIELD.provide(move || Some(context.clone()), build)
        }
    }
}

// =============================================================================
// USE FORM FIELD
// =============================================================================

/// A leaf's view of the field it was built in. Every field is `None` outside one.
#[derive(Clone, Debug, Default)]
pub struct FormFieldState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub form_item_id: Option<String>,
    pub form_description_id: Option<String>,
    pub form_message_id: Option<String>,
    store: Option<FormStore>,
    controller: Option<Derived<ControllerArgs>>,
}

impl FormFieldState {
    pub fn is_in_field(&self) -> bool {
        self.name.is_some()
    }

    /// Whether the field publishes a controller (static children).
    pub fn is_static(&self) -> bool {
        self.controller.is_some()
    }

    pub fn store(&self) -> Option<&FormStore> {
        self.store.as_ref()
    }

    /// Current field state. Subscribes the active reaction.
    pub fn field_state(&self) -> FieldState {
        if let Some(controller) = &self.controller {
            return controller.with(|args| args.field_state.clone());
        }
        match (&self.store, &self.name) {
            (Some(store), Some(name)) => store.field_state(name),
            _ => FieldState::default(),
        }
    }

    pub fn invalid(&self) -> bool {
        self.field_state().invalid
    }

    /// The field's error, only while it is invalid.
    pub fn error(&self) -> Option<FieldError> {
        let state = self.field_state();
        if state.invalid { state.error } else { None }
    }

    /// The control binding. Only fields with static children publish one.
    pub fn field(&self) -> Option<FieldBinding> {
        self.controller
            .as_ref()
            .map(|controller| controller.with(|args| args.field.clone()))
    }

    pub fn form_state(&self) -> Option<FormStateSnapshot> {
        if let Some(controller) = &self.controller {
            return Some(controller.with(|args| args.form_state.clone()));
        }
        self.store.as_ref().map(FormStore::form_state)
    }
}

/// Identity and state of the enclosing field.
///
/// Outside a field this returns [`FormFieldState::default`] so leaves still
/// render, just unwired.
pub fn use_form_field() -> FormFieldState {
    let Some(context) = FORM_FIELD.use_value().ok().and_then(|field| field.peek()) else {
        return FormFieldState::default();
    };
    let store = FORM.use_value().ok().map(|form| form.peek());

    let id = context.id().to_string();
    FormFieldState {
        form_item_id: Some(format!("{id}-form-item")),
        form_description_id: Some(format!("{id}-form-item-description")),
        form_message_id: Some(format!("{id}-form-item-message")),
        name: Some(context.name().to_string()),
        id: Some(id),
        store,
        controller: context.controller().cloned(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::form::store::FormOptions;
    use crate::primitives::scope::effect_scope;
    use std::cell::RefCell;

    #[test]
    fn field_outside_form_names_the_form_provider() {
        let root = effect_scope(true);
        let result = root.within(|| {
            form_field(
                FormFieldProps::new("email"),
                FieldChildren::build(|| Ok(View::Empty)),
            )
        });
        match result {
            Err(Error::MissingProvider { capability }) => assert_eq!(capability, "Form"),
            _ => panic!("expected a missing Form provider"),
        }
    }

    #[test]
    fn use_form_field_outside_a_field_is_empty() {
        let state = use_form_field();
        assert!(!state.is_in_field());
        assert_eq!(state.form_item_id, None);
        assert!(!state.invalid());
        assert_eq!(state.field(), None);
    }

    #[test]
    fn ids_derive_from_the_field_id() {
        let store = FormStore::new(FormOptions::default());
        let seen = Rc::new(RefCell::new(None));
        let root = effect_scope(true);

        root.within(|| {
            let seen = seen.clone();
            form(&store, FormProps::new(), || {
                form_field(
                    FormFieldProps::new("email").with_id("f1"),
                    FieldChildren::build(move || {
                        *seen.borrow_mut() = Some(use_form_field());
                        Ok(View::Empty)
                    }),
                )
            })
        })
        .unwrap();

        let state = seen.borrow().clone().unwrap();
        assert_eq!(state.id.as_deref(), Some("f1"));
        assert_eq!(state.name.as_deref(), Some("email"));
        assert_eq!(state.form_item_id.as_deref(), Some("f1-form-item"));
        assert_eq!(
            state.form_description_id.as_deref(),
            Some("f1-form-item-description")
        );
        assert_eq!(state.form_message_id.as_deref(), Some("f1-form-item-message"));
        assert!(state.is_static());
        assert!(store.is_registered("email"));
    }

    #[test]
    fn generated_ids_are_used_without_an_explicit_one() {
        let store = FormStore::new(FormOptions::default());
        let seen = Rc::new(RefCell::new(None));
        let root = effect_scope(true);

        root.within(|| {
            let seen = seen.clone();
            form(&store, FormProps::new(), || {
                form_field(
                    FormFieldProps::new("email"),
                    FieldChildren::build(move || {
                        *seen.borrow_mut() = use_form_field().id;
                        Ok(View::Empty)
                    }),
                )
            })
        })
        .unwrap();

        let id = seen.borrow().clone().unwrap();
        assert!(id.starts_with(':') && id.ends_with(':'));
    }
}
