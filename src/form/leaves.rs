// ============================================================================
// spark-compose - Field Leaves
// Label, control, description, and error parts of a form field
// ============================================================================
//
// Each leaf looks up the enclosing field once, while it is built, and
// derives its ids from the field id. State-dependent attributes are dynamic,
// so a leaf re-renders in place when its field turns valid or invalid.
// Outside a field every leaf renders plainly, without ids or wiring.
// ============================================================================

use crate::form::field::use_form_field;
use crate::view::{AttrValue, Element, View};

// =============================================================================
// FIELD
// =============================================================================

/// Field container. Carries `data-invalid` while the field is invalid.
pub fn field(children: impl Into<View>) -> Element {
    let state = use_form_field();
    Element::new("div")
        .attr("role", "group")
        .attr("data-slot", "field")
        .attr("data-orientation", "vertical")
        .class("group/field flex w-full gap-3")
        .attr_dyn("data-invalid", move || Some(AttrValue::Bool(state.invalid())))
        .child(children)
}

/// Label pointing at the field's control.
pub fn field_label(children: impl Into<View>) -> Element {
    let state = use_form_field();
    let mut label = Element::new("label")
        .attr("data-slot", "field-label")
        .class("flex w-fit gap-2 leading-snug");
    if let Some(form_item_id) = &state.form_item_id {
        label = label.attr("for", form_item_id.as_str());
    }
    label.child(children)
}

// =============================================================================
// CONTROL
// =============================================================================

/// Which attribute and event [`field_control`] binds the field to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldControlProps {
    pub value_prop_name: String,
    pub on_change_prop_name: String,
}

impl Default for FieldControlProps {
    fn default() -> Self {
        Self {
            value_prop_name: "value".to_string(),
            on_change_prop_name: "change".to_string(),
        }
    }
}

impl FieldControlProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_prop_name(mut self, name: impl Into<String>) -> Self {
        self.value_prop_name = name.into();
        self
    }

    pub fn on_change_prop_name(mut self, name: impl Into<String>) -> Self {
        self.on_change_prop_name = name.into();
        self
    }
}

/// Wire `control` to the enclosing field.
///
/// Sets the control's `id` and `aria-invalid` (plain `false` outside a
/// field). When the field publishes a
/// controller, also binds its value under `value_prop_name`, its `name`, and
/// change and blur handlers. Attributes already on `control` win; its own
/// handlers run before the bound ones.
pub fn field_control(props: FieldControlProps, control: Element) -> Element {
    let state = use_form_field();
    let Some(form_item_id) = state.form_item_id.clone() else {
        return control.attr_default("aria-invalid", false);
    };

    let mut control = control
        .attr_default("id", form_item_id)
        .attr_default_dyn("aria-invalid", {
            let state = state.clone();
            move || Some(AttrValue::Bool(state.invalid()))
        });

    let (Some(store), Some(name)) = (state.store().cloned(), state.name.clone()) else {
        return control;
    };
    if !state.is_static() {
        return control;
    }

    control = control
        .attr_default_dyn(props.value_prop_name, {
            let state = state.clone();
            move || state.field().map(|binding| AttrValue::Value(binding.value))
        })
        .attr_default("name", name.as_str())
        .compose_handler(props.on_change_prop_name, {
            let (store, name) = (store.clone(), name.clone());
            move |event| store.on_change(&name, event.value())
        })
        .compose_handler("blur", move |_| store.on_blur(&name));
    control
}

// =============================================================================
// DESCRIPTION / ERROR
// =============================================================================

/// Help text, referenced by the field's description id.
pub fn field_description(children: impl Into<View>) -> Element {
    let state = use_form_field();
    let mut description = Element::new("p")
        .attr("data-slot", "field-description")
        .class("text-muted-foreground text-sm leading-normal font-normal");
    if let Some(id) = &state.form_description_id {
        description = description.attr("id", id.as_str());
    }
    description.child(children)
}

/// The field's error message. Renders nothing while the field is valid.
pub fn field_error() -> View {
    field_error_with(|el| el)
}

/// Like [`field_error`], with a hook to adjust the rendered element.
pub fn field_error_with<F>(decorate: F) -> View
where
    F: Fn(Element) -> Element + 'static,
{
    let state = use_form_field();
    View::dynamic(move || {
        let Some(error) = state.error() else {
            return View::Empty;
        };
        let mut alert = Element::new("div")
            .attr("role", "alert")
            .attr("data-slot", "field-error")
            .class("text-destructive text-sm font-normal");
        if let Some(id) = &state.form_message_id {
            alert = alert.attr("id", id.as_str());
        }
        decorate(alert.child(error.to_string())).into()
    })
}

// =============================================================================
// LAYOUT PASSTHROUGHS
// =============================================================================

pub fn field_set(children: impl Into<View>) -> Element {
    Element::new("fieldset")
        .attr("data-slot", "field-set")
        .class("flex flex-col gap-6")
        .child(children)
}

pub fn field_legend(children: impl Into<View>) -> Element {
    Element::new("legend")
        .attr("data-slot", "field-legend")
        .attr("data-variant", "legend")
        .class("mb-3 font-medium")
        .child(children)
}

pub fn field_group(children: impl Into<View>) -> Element {
    Element::new("div")
        .attr("data-slot", "field-group")
        .class("group/field-group flex w-full flex-col gap-7")
        .child(children)
}

/// A divider, optionally with a caption.
pub fn field_separator(caption: Option<View>) -> Element {
    let separator = Element::new("div")
        .attr("data-slot", "field-separator")
        .class("relative -my-2 h-5 text-sm")
        .child(Element::new("hr").attr("data-slot", "separator"));
    match caption {
        Some(caption) => separator.attr("data-content", true).child(
            Element::new("span")
                .attr("data-slot", "field-separator-content")
                .child(caption),
        ),
        None => separator.attr("data-content", false),
    }
}

pub fn field_content(children: impl Into<View>) -> Element {
    Element::new("div")
        .attr("data-slot", "field-content")
        .class("group/field-content flex flex-1 flex-col gap-1.5 leading-snug")
        .child(children)
}

pub fn field_title(children: impl Into<View>) -> Element {
    Element::new("div")
        .attr("data-slot", "field-label")
        .class("flex w-fit items-center gap-2 text-sm leading-snug font-medium")
        .child(children)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Node;

    fn render(view: impl Into<View>) -> Node {
        Node::root(view.into().snapshot())
    }

    #[test]
    fn leaves_outside_a_field_render_unwired() {
        let label = render(field_label("Email"));
        assert_eq!(label.select("label").and_then(|n| n.attr("for")), None);

        let control = render(field_control(FieldControlProps::new(), Element::new("input")));
        let input = control.select("input").unwrap();
        assert_eq!(input.attr("id"), None);
        assert_eq!(input.attr("aria-invalid"), Some(&AttrValue::Bool(false)));

        let explicit = render(field_control(
            FieldControlProps::new(),
            Element::new("input").attr("aria-invalid", true),
        ));
        assert_eq!(
            explicit.select("input").and_then(|n| n.attr("aria-invalid")),
            Some(&AttrValue::Bool(true))
        );

        let root = render(field(field_error()));
        let container = root.by_slot("field").unwrap();
        assert_eq!(container.attr("data-invalid"), Some(&AttrValue::Bool(false)));
        assert!(root.by_slot("field-error").is_none());
    }

    #[test]
    fn passthroughs_carry_their_slots() {
        let root = render(field_set(vec![
            View::from(field_legend("Profile")),
            View::from(field_group(field_content(field_title("Name")))),
            View::from(field_separator(Some("or".into()))),
        ]));
        for slot in ["field-set", "field-legend", "field-group", "field-content", "field-separator"] {
            assert!(root.by_slot(slot).is_some(), "missing {slot}");
        }
        assert_eq!(root.by_slot("field-label").map(Node::text_content).as_deref(), Some("Name"));
        assert_eq!(
            root.by_slot("field-separator").and_then(|n| n.attr("data-content")),
            Some(&AttrValue::Bool(true))
        );
    }
}
