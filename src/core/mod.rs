// ============================================================================
// spark-compose - Core Module
// Fundamental types, traits, and context for the reactive system
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{ReactiveContext, is_batching, is_tracking, is_untracking, with_context};
pub use types::{
    AnyReaction, AnySource, Dependency, EqualsFn, SourceInner, Subscribers, default_equals,
    same_node,
};
