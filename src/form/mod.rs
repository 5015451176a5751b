// ============================================================================
// spark-compose - Form Module
// Form store, field identity, and the leaves that read it
// ============================================================================

pub mod field;
pub mod leaves;
pub mod store;

pub use field::{
    FORM, FORM_FIELD, FieldChildren, FieldContext, FormFieldProps, FormFieldState, FormProps,
    InvalidFn, SubmitFn, form, form_field, use_form_field,
};
pub use leaves::{
    FieldControlProps, field, field_content, field_control, field_description, field_error,
    field_error_with, field_group, field_label, field_legend, field_separator, field_set,
    field_title,
};
pub use store::{
    ControllerArgs, ErrorKind, FieldBinding, FieldError, FieldState, FormOptions,
    FormStateSnapshot, FormStore, Rules, SetValueOptions, ValidationMode, Validator,
};
