// ============================================================================
// spark-compose - Reactive Context
// Thread-local state for tracking the current reaction and pending work
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource, Dependency, same_node};

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context holding all global state for reactivity.
pub struct ReactiveContext {
    // =========================================================================
    // REACTION TRACKING
    // =========================================================================
    /// Currently executing reaction (effect or derived)
    pub active_reaction: RefCell<Option<Weak<dyn AnyReaction>>>,

    /// Whether reads are currently untracked
    pub untracking: Cell<bool>,

    /// Dependencies collected during the current reaction execution
    pub new_deps: RefCell<Vec<Dependency>>,

    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Effects waiting to run
    pub pending_effects: RefCell<Vec<Weak<dyn AnyReaction>>>,

    /// Whether the pending queue is being drained
    pub is_flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            active_reaction: RefCell::new(None),
            untracking: Cell::new(false),
            new_deps: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_effects: RefCell::new(Vec::new()),
            is_flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // REACTION TRACKING
    // =========================================================================

    /// Set the active reaction, returning the previous one
    pub fn set_active_reaction(
        &self,
        reaction: Option<Weak<dyn AnyReaction>>,
    ) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.replace(reaction)
    }

    pub fn get_active_reaction(&self) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.borrow().clone()
    }

    pub fn has_active_reaction(&self) -> bool {
        self.active_reaction.borrow().is_some()
    }

    /// Set untracking mode, returning previous value
    pub fn set_untracking(&self, value: bool) -> bool {
        self.untracking.replace(value)
    }

    pub fn is_untracking(&self) -> bool {
        self.untracking.get()
    }

    /// Swap out the collected dependency list, returning the old one
    pub fn swap_new_deps(&self, deps: Vec<Dependency>) -> Vec<Dependency> {
        self.new_deps.replace(deps)
    }

    /// Record a read. The first read of a source in a run wins.
    pub fn add_new_dep(&self, source: Rc<dyn AnySource>, version: u64) {
        let mut deps = self.new_deps.borrow_mut();
        if !deps.iter().any(|d| same_node(&d.source, &source)) {
            deps.push(Dependency { source, version });
        }
    }

    /// Whether `source` was already read during the current reaction run.
    pub fn has_new_dep(&self, source: &Rc<dyn AnySource>) -> bool {
        self.new_deps.borrow().iter().any(|d| same_node(&d.source, source))
    }

    pub fn new_dep_count(&self) -> usize {
        self.new_deps.borrow().len()
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn get_batch_depth(&self) -> u32 {
        self.batch_depth.get()
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn add_pending_effect(&self, effect: Weak<dyn AnyReaction>) {
        self.pending_effects.borrow_mut().push(effect);
    }

    pub fn take_pending_effects(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.pending_effects.replace(Vec::new())
    }

    /// Set flushing mode, returning previous
    pub fn set_flushing(&self, value: bool) -> bool {
        self.is_flushing.replace(value)
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Check if currently tracking dependencies (inside a reaction, not untracking)
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction() && !ctx.is_untracking())
}

/// Check if currently untracking
pub fn is_untracking() -> bool {
    with_context(|ctx| ctx.is_untracking())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceInner;

    #[test]
    fn context_creation() {
        with_context(|ctx| {
            assert!(!ctx.has_active_reaction());
            assert!(!ctx.is_untracking());
            assert_eq!(ctx.get_batch_depth(), 0);
            assert!(!ctx.is_flushing());
        });
    }

    #[test]
    fn batch_depth() {
        with_context(|ctx| {
            assert_eq!(ctx.enter_batch(), 1);
            assert_eq!(ctx.enter_batch(), 2);
            assert!(ctx.is_batching());
            assert_eq!(ctx.exit_batch(), 1);
            assert_eq!(ctx.exit_batch(), 0);
            assert!(!ctx.is_batching());
            assert_eq!(ctx.exit_batch(), 0);
        });
    }

    #[test]
    fn new_deps_are_deduplicated() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        with_context(|ctx| {
            let prev = ctx.swap_new_deps(Vec::new());
            ctx.add_new_dep(source.clone(), 0);
            ctx.add_new_dep(source.clone(), 5);
            assert_eq!(ctx.new_dep_count(), 1);
            let deps = ctx.swap_new_deps(prev);
            assert_eq!(deps[0].version, 0);
        });
    }

    #[test]
    fn convenience_functions() {
        assert!(!is_tracking());
        assert!(!is_untracking());
        assert!(!is_batching());
    }
}
