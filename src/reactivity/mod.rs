// ============================================================================
// spark-compose - Reactivity Module
// Dependency tracking, stale propagation, batching, and equality
// ============================================================================

pub mod batching;
pub mod equality;
pub mod scheduling;
pub mod tracking;

pub use tracking::{
    deps_changed, install_dependencies, mark_reactions, notify_write, remove_reactions,
    run_tracked, track_read,
};

pub use scheduling::{flush_effects, flush_sync, schedule_effect};

pub use batching::{batch, peek, tick, untrack};

pub use equality::{ShallowEq, shallow_equals, shallow_equals_fn};
