// ============================================================================
// spark-compose - Component Module
// Capabilities, controllable state, and the checkbox group built on them
// ============================================================================

pub mod capability;
pub mod checkbox_group;
pub mod controllable;

pub use capability::{Capability, Lookup, Provided};
pub use checkbox_group::{
    CHECKBOX_GROUP, CheckboxGroupContext, CheckboxGroupItemProps, CheckboxGroupProps,
    checkbox_group, checkbox_group_item, parse_selection, toggle_selection,
};
pub use controllable::{ChangeFn, Controllable, ControllableOptions, Mode, Setter};
