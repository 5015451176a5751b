// ============================================================================
// spark-compose - Form Store
// Field registration, values, validation rules, and submit state
// ============================================================================
//
// Every registered field gets its own set of signals (value, dirty, touched,
// validating, error), so a region that reads one field's state only wakes
// when that field changes. Form-wide state reads every field it summarizes
// plus a version signal that moves when fields come and go.
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::primitives::signal::Signal;
use crate::reactivity::batching::batch;
use crate::reactivity::equality::ShallowEq;
use crate::value::Value;

// =============================================================================
// OPTIONS
// =============================================================================

/// When field validation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    OnSubmit,
    OnChange,
    OnBlur,
    /// On the first blur, then on every change.
    OnTouched,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Change,
    Blur,
}

/// Form configuration.
///
/// ```
/// use spark_compose::{FormOptions, ValidationMode};
///
/// let options: FormOptions = serde_json::from_str(
///     r#"{ "mode": "on_blur", "default_values": { "email": "a@b.c" } }"#,
/// )
/// .unwrap();
/// assert_eq!(options.mode, ValidationMode::OnBlur);
/// assert_eq!(options.revalidate_mode, ValidationMode::OnChange);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Validation before the first submit.
    pub mode: ValidationMode,
    /// Validation after the first submit.
    pub revalidate_mode: ValidationMode,
    pub default_values: BTreeMap<String, Value>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::OnSubmit,
            revalidate_mode: ValidationMode::OnChange,
            default_values: BTreeMap::new(),
        }
    }
}

impl FormOptions {
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_revalidate_mode(mut self, mode: ValidationMode) -> Self {
        self.revalidate_mode = mode;
        self
    }

    pub fn with_default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_values.insert(name.into(), value.into());
        self
    }

    fn should_validate(&self, submitted: bool, trigger: Trigger, touched: bool) -> bool {
        let mode = if submitted {
            self.revalidate_mode
        } else {
            self.mode
        };
        match mode {
            ValidationMode::OnSubmit => false,
            ValidationMode::OnChange => trigger == Trigger::Change,
            ValidationMode::OnBlur => trigger == Trigger::Blur,
            ValidationMode::OnTouched => trigger == Trigger::Blur || touched,
            ValidationMode::All => true,
        }
    }
}

// =============================================================================
// FIELD ERRORS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Validate,
    Custom,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Required => "required",
            ErrorKind::MinLength => "min_length",
            ErrorKind::MaxLength => "max_length",
            ErrorKind::Pattern => "pattern",
            ErrorKind::Validate => "validate",
            ErrorKind::Custom => "custom",
        })
    }
}

/// A validation failure recorded against a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl FieldError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => write!(f, "{}", self.kind),
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// Custom validator: returns a message when the value is rejected.
pub type Validator = Rc<dyn Fn(&Value) -> Option<String>>;

/// Validation rules for one field. Each rule carries its error message.
///
/// An empty value only fails `required`; the other rules skip it.
#[derive(Clone, Default)]
pub struct Rules {
    pub required: Option<String>,
    pub min_length: Option<(usize, String)>,
    pub max_length: Option<(usize, String)>,
    pub pattern: Option<(Regex, String)>,
    pub validate: Option<Validator>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(message.into());
        self
    }

    pub fn min_length(mut self, min: usize, message: impl Into<String>) -> Self {
        self.min_length = Some((min, message.into()));
        self
    }

    pub fn max_length(mut self, max: usize, message: impl Into<String>) -> Self {
        self.max_length = Some((max, message.into()));
        self
    }

    /// Require text values to match `pattern`.
    pub fn pattern(mut self, pattern: &str, message: impl Into<String>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.pattern = Some((regex, message.into()));
        Ok(self)
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + 'static,
    {
        self.validate = Some(Rc::new(validator));
        self
    }

    /// First rule `value` breaks, if any.
    pub fn check(&self, value: &Value) -> Option<FieldError> {
        if value.is_blank() {
            return self
                .required
                .as_ref()
                .map(|message| FieldError::new(ErrorKind::Required, message.as_str()));
        }

        if let Some(len) = value.length() {
            if let Some((min, message)) = &self.min_length {
                if len < *min {
                    return Some(FieldError::new(ErrorKind::MinLength, message.as_str()));
                }
            }
            if let Some((max, message)) = &self.max_length {
                if len > *max {
                    return Some(FieldError::new(ErrorKind::MaxLength, message.as_str()));
                }
            }
        }

        if let (Some((regex, message)), Some(text)) = (&self.pattern, value.as_str()) {
            if !regex.is_match(text) {
                return Some(FieldError::new(ErrorKind::Pattern, message.as_str()));
            }
        }

        let validator = self.validate.as_ref()?;
        validator(value).map(|message| FieldError::new(ErrorKind::Validate, message))
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.validate.is_none()
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(|(re, _)| re.as_str()))
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

// =============================================================================
// STATE SNAPSHOTS
// =============================================================================

/// Per-field state, as a field's leaves read it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldState {
    pub invalid: bool,
    pub is_dirty: bool,
    pub is_touched: bool,
    pub is_validating: bool,
    pub error: Option<FieldError>,
}

/// Form-wide state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormStateSnapshot {
    pub is_dirty: bool,
    pub is_submitted: bool,
    pub is_submit_successful: bool,
    pub is_submitting: bool,
    /// No field currently holds an error.
    pub is_valid: bool,
    pub submit_count: u32,
    pub errors: BTreeMap<String, FieldError>,
}

/// Options for [`FormStore::set_value`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_validate: bool,
    pub should_dirty: bool,
    pub should_touch: bool,
}

// =============================================================================
// FIELD BINDING
// =============================================================================

/// What a control needs to be wired to one field: its name, its value, and
/// the change and blur handlers.
#[derive(Clone)]
pub struct FieldBinding {
    pub name: String,
    pub value: Value,
    store: FormStore,
}

impl FieldBinding {
    pub fn on_change(&self, value: Value) {
        self.store.on_change(&self.name, value);
    }

    pub fn on_blur(&self) {
        self.store.on_blur(&self.name);
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }
}

impl PartialEq for FieldBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.store.shallow_eq(&other.store)
    }
}

impl fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// Everything a render-callback field receives.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerArgs {
    pub field: FieldBinding,
    pub field_state: FieldState,
    pub form_state: FormStateSnapshot,
}

// =============================================================================
// FORM STORE
// =============================================================================

struct FieldSlot {
    rules: RefCell<Rules>,
    value: Signal<Value>,
    dirty: Signal<bool>,
    touched: Signal<bool>,
    validating: Signal<bool>,
    error: Signal<Option<FieldError>>,
}

impl FieldSlot {
    fn new(value: Value, rules: Rules) -> Self {
        Self {
            rules: RefCell::new(rules),
            value: Signal::new(value),
            dirty: Signal::new(false),
            touched: Signal::new(false),
            validating: Signal::new(false),
            error: Signal::new(None),
        }
    }

    fn validate(&self) -> bool {
        self.validating.set(true);
        let error = self.rules.borrow().check(&self.value.peek());
        let valid = error.is_none();
        self.error.set(error);
        self.validating.set(false);
        valid
    }

    fn state(&self) -> FieldState {
        let error = self.error.get();
        FieldState {
            invalid: error.is_some(),
            is_dirty: self.dirty.get(),
            is_touched: self.touched.get(),
            is_validating: self.validating.get(),
            error,
        }
    }
}

struct FormStoreInner {
    options: FormOptions,
    fields: RefCell<BTreeMap<String, Rc<FieldSlot>>>,
    /// Moves when a field is registered or unregistered
    fields_version: Signal<u64>,
    submitted: Signal<bool>,
    submit_successful: Signal<bool>,
    submitting: Signal<bool>,
    submit_count: Signal<u32>,
}

/// Reactive form state shared by a form and its fields.
///
/// # Example
///
/// ```
/// use spark_compose::{FormOptions, FormStore, Rules, ValidationMode, Value};
///
/// let store = FormStore::new(FormOptions::default().with_mode(ValidationMode::OnChange));
/// store.register("email", Rules::new().required("Email is required"));
///
/// store.on_change("email", Value::from(""));
/// assert!(store.field_state("email").invalid);
///
/// store.on_change("email", Value::from("me@example.com"));
/// assert!(!store.field_state("email").invalid);
/// assert!(store.form_state().is_dirty);
/// ```
#[derive(Clone)]
pub struct FormStore {
    inner: Rc<FormStoreInner>,
}

impl FormStore {
    pub fn new(options: FormOptions) -> Self {
        Self {
            inner: Rc::new(FormStoreInner {
                options,
                fields: RefCell::new(BTreeMap::new()),
                fields_version: Signal::new(0),
                submitted: Signal::new(false),
                submit_successful: Signal::new(false),
                submitting: Signal::new(false),
                submit_count: Signal::new(0),
            }),
        }
    }

    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    fn slot(&self, name: &str) -> Option<Rc<FieldSlot>> {
        self.inner.fields.borrow().get(name).cloned()
    }

    fn ensure(&self, name: &str) -> Rc<FieldSlot> {
        match self.slot(name) {
            Some(slot) => slot,
            None => {
                self.register(name, Rules::default());
                self.slot(name).unwrap_or_else(|| {
                    Rc::new(FieldSlot::new(self.default_value(name), Rules::default()))
                })
            }
        }
    }

    fn track_fields(&self) {
        self.inner.fields_version.get();
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register `name`, or replace its rules if it is already registered.
    pub fn register(&self, name: &str, rules: Rules) {
        if let Some(slot) = self.slot(name) {
            *slot.rules.borrow_mut() = rules;
            return;
        }

        let slot = Rc::new(FieldSlot::new(self.default_value(name), rules));
        self.inner.fields.borrow_mut().insert(name.to_string(), slot);
        tracing::debug!(field = name, "field registered");
        self.inner.fields_version.update(|v| *v += 1);
    }

    pub fn unregister(&self, name: &str) {
        if self.inner.fields.borrow_mut().remove(name).is_some() {
            tracing::debug!(field = name, "field unregistered");
            self.inner.fields_version.update(|v| *v += 1);
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.fields.borrow().contains_key(name)
    }

    /// Registered field names, in order.
    pub fn field_names(&self) -> Vec<String> {
        self.track_fields();
        self.inner.fields.borrow().keys().cloned().collect()
    }

    pub fn default_value(&self, name: &str) -> Value {
        self.inner
            .options
            .default_values
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    /// Current value of `name`; its default if it is not registered.
    pub fn value(&self, name: &str) -> Value {
        match self.slot(name) {
            Some(slot) => slot.value.get(),
            None => {
                self.track_fields();
                self.default_value(name)
            }
        }
    }

    pub fn values(&self) -> BTreeMap<String, Value> {
        self.track_fields();
        let slots: Vec<_> = self
            .inner
            .fields
            .borrow()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();
        slots
            .into_iter()
            .map(|(name, slot)| (name, slot.value.get()))
            .collect()
    }

    /// Set a value programmatically. Registers the field if needed.
    pub fn set_value(&self, name: &str, value: Value, options: SetValueOptions) {
        let slot = self.ensure(name);
        batch(|| {
            if options.should_dirty {
                slot.dirty.set(value != self.default_value(name));
            }
            slot.value.set(value);
            if options.should_touch {
                slot.touched.set(true);
            }
            if options.should_validate {
                slot.validate();
            }
        });
    }

    /// A control reported a new value.
    pub fn on_change(&self, name: &str, value: Value) {
        let slot = self.ensure(name);
        batch(|| {
            slot.dirty.set(value != self.default_value(name));
            slot.value.set(value);
            let touched = slot.touched.peek();
            if self
                .inner
                .options
                .should_validate(self.inner.submitted.peek(), Trigger::Change, touched)
            {
                slot.validate();
            }
        });
    }

    /// A control lost focus.
    pub fn on_blur(&self, name: &str) {
        let slot = self.ensure(name);
        batch(|| {
            slot.touched.set(true);
            if self
                .inner
                .options
                .should_validate(self.inner.submitted.peek(), Trigger::Blur, true)
            {
                slot.validate();
            }
        });
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Validate one field. Unregistered fields are valid.
    pub fn trigger(&self, name: &str) -> bool {
        match self.slot(name) {
            Some(slot) => batch(|| slot.validate()),
            None => true,
        }
    }

    /// Validate every field. Returns true if all passed.
    pub fn trigger_all(&self) -> bool {
        let slots: Vec<_> = self.inner.fields.borrow().values().cloned().collect();
        batch(|| {
            slots
                .iter()
                .map(|slot| slot.validate())
                .fold(true, |all, valid| all && valid)
        })
    }

    pub fn set_error(&self, name: &str, error: FieldError) {
        self.ensure(name).error.set(Some(error));
    }

    pub fn clear_errors(&self, name: &str) {
        if let Some(slot) = self.slot(name) {
            slot.error.set(None);
        }
    }

    pub fn clear_all_errors(&self) {
        let slots: Vec<_> = self.inner.fields.borrow().values().cloned().collect();
        batch(|| {
            for slot in slots {
                slot.error.set(None);
            }
        });
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// State of `name`. An unregistered field reads as pristine and valid.
    pub fn field_state(&self, name: &str) -> FieldState {
        match self.slot(name) {
            Some(slot) => slot.state(),
            None => {
                self.track_fields();
                FieldState::default()
            }
        }
    }

    /// State of `name`, failing if it was never registered.
    pub fn field_state_checked(&self, name: &str) -> Result<FieldState> {
        self.slot(name)
            .map(|slot| slot.state())
            .ok_or_else(|| Error::UnregisteredField {
                name: name.to_string(),
            })
    }

    pub fn form_state(&self) -> FormStateSnapshot {
        self.track_fields();
        let slots: Vec<_> = self
            .inner
            .fields
            .borrow()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();

        let mut is_dirty = false;
        let mut errors = BTreeMap::new();
        for (name, slot) in slots {
            is_dirty |= slot.dirty.get();
            if let Some(error) = slot.error.get() {
                errors.insert(name, error);
            }
        }

        FormStateSnapshot {
            is_dirty,
            is_submitted: self.inner.submitted.get(),
            is_submit_successful: self.inner.submit_successful.get(),
            is_submitting: self.inner.submitting.get(),
            is_valid: errors.is_empty(),
            submit_count: self.inner.submit_count.get(),
            errors,
        }
    }

    // =========================================================================
    // SUBMIT / RESET
    // =========================================================================

    /// Validate everything, then call `on_valid` with the values or
    /// `on_invalid` with the errors. Returns whether the form was valid.
    pub fn handle_submit<V, I>(&self, on_valid: V, on_invalid: I) -> bool
    where
        V: FnOnce(&BTreeMap<String, Value>),
        I: FnOnce(&BTreeMap<String, FieldError>),
    {
        batch(|| {
            self.inner.submitting.set(true);
            let valid = self.trigger_all();
            self.inner.submitted.set(true);
            self.inner.submit_count.update(|n| *n += 1);

            if valid {
                on_valid(&crate::reactivity::batching::untrack(|| self.values()));
            } else {
                let errors = crate::reactivity::batching::untrack(|| self.form_state().errors);
                on_invalid(&errors);
            }

            self.inner.submit_successful.set(valid);
            self.inner.submitting.set(false);
            tracing::debug!(valid, "form submitted");
            valid
        })
    }

    /// Back to default values, with dirty, touched, errors, and submit state cleared.
    pub fn reset(&self) {
        let slots: Vec<_> = self
            .inner
            .fields
            .borrow()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();
        batch(|| {
            for (name, slot) in slots {
                slot.value.set(self.default_value(&name));
                slot.dirty.set(false);
                slot.touched.set(false);
                slot.validating.set(false);
                slot.error.set(None);
            }
            self.inner.submitted.set(false);
            self.inner.submit_successful.set(false);
            self.inner.submit_count.set(0);
        });
    }

    // =========================================================================
    // BINDINGS
    // =========================================================================

    /// Binding for a control wired to `name`.
    pub fn field(&self, name: &str) -> FieldBinding {
        FieldBinding {
            name: name.to_string(),
            value: self.value(name),
            store: self.clone(),
        }
    }

    /// Everything a render-callback field receives for `name`.
    pub fn controller(&self, name: &str) -> ControllerArgs {
        ControllerArgs {
            field: self.field(name),
            field_state: self.field_state(name),
            form_state: self.form_state(),
        }
    }
}

impl ShallowEq for FormStore {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("options", &self.inner.options)
            .field("fields", &self.inner.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
