// ============================================================================
// spark-compose - Checkbox Group
// A shared selection set for sibling checkbox items
// ============================================================================
//
// The group owns (or is handed) the selection and publishes it with a
// setter through the `CheckboxGroup` capability. Each item works out its own
// checked state from that selection, and a toggle replaces the whole
// selection through the shared setter, so every item sees the same set.
// ============================================================================

use std::collections::HashSet;
use std::rc::Rc;

use crate::component::capability::Capability;
use crate::component::controllable::{ChangeFn, Controllable, ControllableOptions, Setter};
use crate::error::{Error, Result};
use crate::form::store::FormStore;
use crate::primitives::derived::derived;
use crate::primitives::props::PropValue;
use crate::reactivity::equality::ShallowEq;
use crate::value::{CheckboxValue, Value};
use crate::view::{AttrValue, Element, Event, View};

// =============================================================================
// CONTEXT
// =============================================================================

/// What a group publishes to its items.
#[derive(Clone, Debug)]
pub struct CheckboxGroupContext {
    pub selected: Vec<CheckboxValue>,
    pub set_selected: Setter<Vec<CheckboxValue>>,
    /// Set view of `selected`, built once per published selection
    members: Rc<HashSet<CheckboxValue>>,
}

impl CheckboxGroupContext {
    pub fn new(selected: Vec<CheckboxValue>, set_selected: Setter<Vec<CheckboxValue>>) -> Self {
        let members = Rc::new(selected.iter().cloned().collect());
        Self {
            selected,
            set_selected,
            members,
        }
    }

    pub fn is_selected(&self, value: &CheckboxValue) -> bool {
        self.members.contains(value)
    }
}

impl ShallowEq for CheckboxGroupContext {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.selected.shallow_eq(&other.selected)
            && self.set_selected.shallow_eq(&other.set_selected)
    }
}

pub static CHECKBOX_GROUP: Capability<CheckboxGroupContext> = Capability::new("CheckboxGroup");

// =============================================================================
// SELECTION HELPERS
// =============================================================================

/// Read a group `value` prop as a list of identifiers.
pub fn parse_selection(value: &Value) -> Result<Vec<CheckboxValue>> {
    let invalid = || Error::InvalidGroupValue {
        received: value.to_string(),
    };
    let items = value.as_list().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| CheckboxValue::from_value(item).ok_or_else(invalid))
        .collect()
}

/// The selection after checking or unchecking `value`.
///
/// Duplicates in `prev` collapse to their first occurrence. Checking a member
/// or unchecking a non-member leaves the selection as it was.
pub fn toggle_selection(
    prev: &[CheckboxValue],
    value: &CheckboxValue,
    checked: bool,
) -> Vec<CheckboxValue> {
    let mut members: HashSet<&CheckboxValue> = HashSet::with_capacity(prev.len() + 1);
    let mut next: Vec<CheckboxValue> = prev
        .iter()
        .filter(|v| members.insert(*v))
        .cloned()
        .collect();

    if checked {
        if !members.contains(value) {
            next.push(value.clone());
        }
    } else {
        next.retain(|v| v != value);
    }
    next
}

// =============================================================================
// GROUP
// =============================================================================

/// Props for [`checkbox_group`].
#[derive(Clone, Default)]
pub struct CheckboxGroupProps {
    /// Controlled selection. `Value::Null` counts as not supplied.
    pub value: Option<PropValue<Value>>,
    pub default_value: Vec<CheckboxValue>,
    pub on_change: Option<Rc<dyn Fn(&[CheckboxValue])>>,
    pub class: Option<String>,
    pub attrs: Vec<(String, AttrValue)>,
}

impl CheckboxGroupProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<PropValue<Value>>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default_value<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CheckboxValue>,
    {
        self.default_value = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_on_change<F: Fn(&[CheckboxValue]) + 'static>(mut self, on_change: F) -> Self {
        self.on_change = Some(Rc::new(on_change));
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

    /// Control the group from a form field holding a list value.
    pub fn bound_to(mut self, store: &FormStore, name: impl Into<String>) -> Self {
        let name: Rc<str> = name.into().into();
        self.value = Some(PropValue::getter({
            let (store, name) = (store.clone(), name.clone());
            move || match store.value(&name) {
                Value::Null => Value::List(Vec::new()),
                value => value,
            }
        }));
        let store = store.clone();
        self.on_change = Some(Rc::new(move |next: &[CheckboxValue]| {
            store.on_change(&name, Value::from(next.to_vec()));
        }));
        self
    }
}

/// A group of checkbox items sharing one selection.
///
/// Fails with [`Error::InvalidGroupValue`] before `children` is built when a
/// supplied `value` is not a list of identifiers.
pub fn checkbox_group<F>(props: CheckboxGroupProps, children: F) -> Result<View>
where
    F: FnOnce() -> Result<View>,
{
    let CheckboxGroupProps {
        value,
        default_value,
        on_change,
        class,
        attrs,
    } = props;

    if let Some(prop) = &value {
        let initial = prop.peek();
        if !initial.is_null() {
            parse_selection(&initial)?;
        }
    }

    let prop = value.map(|prop| {
        PropValue::getter(move || {
            let raw = prop.get();
            if raw.is_null() {
                return None;
            }
            match parse_selection(&raw) {
                Ok(selection) => Some(selection),
                Err(err) => {
                    tracing::error!(%err, "checkbox group received an invalid value");
                    Some(Vec::new())
                }
            }
        })
    });

    let on_change = on_change.map(|f| -> ChangeFn<Vec<CheckboxValue>> {
        Rc::new(move |next: &Vec<CheckboxValue>| f(next.as_slice()))
    });

    let state = Controllable::new(ControllableOptions {
        prop,
        default_prop: default_value,
        on_change,
        caller: "CheckboxGroup",
    });
    let setter = state.setter();

    let content = CHECKBOX_GROUP.provide(
        move || CheckboxGroupContext::new(state.get(), setter.clone()),
        children,
    )?;

    let mut group = Element::new("div")
        .attr("data-slot", "checkbox-group")
        .class("grid gap-3");
    if let Some(class) = class {
        group = group.class(class);
    }
    for (name, value) in attrs {
        group = group.attr(name, value);
    }
    Ok(group.child(content).into())
}

// =============================================================================
// ITEM
// =============================================================================

/// Props for [`checkbox_group_item`].
#[derive(Clone, Debug)]
pub struct CheckboxGroupItemProps {
    pub value: CheckboxValue,
    pub disabled: bool,
    pub class: Option<String>,
    pub attrs: Vec<(String, AttrValue)>,
}

impl CheckboxGroupItemProps {
    pub fn new(value: impl Into<CheckboxValue>) -> Self {
        Self {
            value: value.into(),
            disabled: false,
            class: None,
            attrs: Vec::new(),
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
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

/// One checkbox in a group. Fails outside a [`checkbox_group`].
pub fn checkbox_group_item(props: CheckboxGroupItemProps) -> Result<Element> {
    let group = CHECKBOX_GROUP.use_value()?;
    let CheckboxGroupItemProps {
        value,
        disabled,
        class,
        attrs,
    } = props;

    let checked = derived({
        let (group, value) = (group.clone(), value.clone());
        move || group.with(|ctx| ctx.is_selected(&value))
    });

    let mut item = Element::new("button")
        .attr("type", "button")
        .attr("role", "checkbox")
        .attr("data-slot", "checkbox-group-item")
        .attr("value", value.to_string())
        .attr_dyn("data-state", {
            let checked = checked.clone();
            move || Some(if checked.get() { "checked" } else { "unchecked" }.into())
        })
        .attr_dyn("aria-checked", {
            let checked = checked.clone();
            move || Some(AttrValue::Bool(checked.get()))
        });
    if let Some(class) = class {
        item = item.class(class);
    }

    if disabled {
        item = item.attr("disabled", true).attr("data-disabled", "");
    } else {
        let toggle: Rc<dyn Fn(bool)> = Rc::new(move |next_checked| {
            let ctx = group.peek();
            let next = toggle_selection(&ctx.selected, &value, next_checked);
            tracing::trace!(%value, checked = next_checked, "checkbox toggled");
            ctx.set_selected.set(next);
        });
        item = item
            .on("checked_change", {
                let toggle = toggle.clone();
                move |event| {
                    if let Event::Checked(next_checked) = event {
                        toggle(*next_checked);
                    }
                }
            })
            .on("click", move |_| toggle(!checked.peek()));
    }

    for (name, value) in attrs {
        item = item.attr(name, value);
    }
    Ok(item)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;
    use crate::runtime::mount;
    use tracing_test::traced_test;

    fn ids(values: &[&str]) -> Vec<CheckboxValue> {
        values.iter().map(|v| CheckboxValue::from(*v)).collect()
    }

    #[test]
    fn toggling_adds_and_removes() {
        let prev = ids(&["a"]);
        assert_eq!(toggle_selection(&prev, &"b".into(), true), ids(&["a", "b"]));
        assert_eq!(toggle_selection(&prev, &"a".into(), false), ids(&[]));
    }

    #[test]
    fn repeated_toggles_are_idempotent() {
        let prev = ids(&["a", "b"]);
        assert_eq!(toggle_selection(&prev, &"a".into(), true), prev);
        assert_eq!(toggle_selection(&prev, &"z".into(), false), prev);
    }

    #[test]
    fn duplicates_collapse() {
        let prev = ids(&["a", "b", "a"]);
        assert_eq!(toggle_selection(&prev, &"c".into(), true), ids(&["a", "b", "c"]));
    }

    #[test]
    fn numbers_use_same_value_zero() {
        let prev = vec![CheckboxValue::Number(f64::NAN), CheckboxValue::Number(0.0)];
        let next = toggle_selection(&prev, &CheckboxValue::Number(-0.0), false);
        assert_eq!(next.len(), 1);
        let next = toggle_selection(&next, &CheckboxValue::Number(f64::NAN), true);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn context_membership_uses_the_set_view() {
        let state = Controllable::new(ControllableOptions::new(Vec::new()));
        let ctx = CheckboxGroupContext::new(
            vec![
                CheckboxValue::from("a"),
                CheckboxValue::Number(f64::NAN),
                CheckboxValue::Number(0.0),
            ],
            state.setter(),
        );
        assert!(ctx.is_selected(&CheckboxValue::from("a")));
        assert!(ctx.is_selected(&CheckboxValue::Number(f64::NAN)));
        assert!(ctx.is_selected(&CheckboxValue::Number(-0.0)));
        assert!(!ctx.is_selected(&CheckboxValue::from("b")));
        assert_eq!(ctx.members.len(), 3);
    }

    #[test]
    fn selection_must_be_a_list_of_identifiers() {
        assert_eq!(
            parse_selection(&Value::from(vec!["a", "b"])).unwrap(),
            ids(&["a", "b"])
        );
        assert!(parse_selection(&Value::from(vec![1, 2])).is_ok());

        let err = parse_selection(&Value::from("not-an-array")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CheckboxGroup: `value` prop must be an array when provided.\nReceived: not-an-array"
        );
        assert!(parse_selection(&Value::List(vec![Value::Bool(true)])).is_err());
    }

    #[test]
    #[traced_test]
    fn value_turning_invalid_later_reads_as_empty() {
        let external = signal(Value::from(vec!["a"]));
        let handle = mount({
            let external = external.clone();
            move || {
                checkbox_group(
                    CheckboxGroupProps::new().with_value(PropValue::from_signal(&external)),
                    || {
                        Ok(checkbox_group_item(
                            CheckboxGroupItemProps::new("a").with_attr("id", "a"),
                        )?
                        .into())
                    },
                )
            }
        })
        .unwrap();

        let state = |handle: &crate::runtime::MountHandle| {
            handle.snapshot().by_id("a").and_then(|n| n.attr_str("data-state"))
        };
        assert_eq!(state(&handle).as_deref(), Some("checked"));

        external.set(Value::Bool(true));
        assert_eq!(state(&handle).as_deref(), Some("unchecked"));
        assert!(logs_contain("checkbox group received an invalid value"));
    }
}
