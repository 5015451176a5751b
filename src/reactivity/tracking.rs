// ============================================================================
// spark-compose - Dependency Tracking
// Tracking reads, propagating writes, and verifying staleness by version
// ============================================================================
//
// Writes push a cheap stale mark down the graph (DIRTY for direct readers,
// MAYBE_DIRTY further down). Reads pull: a stale reaction compares the
// version it saw for each dependency against the current one and only
// re-executes when something actually moved. This is what lets a derived
// with a custom equality stop propagation.
//
// RefCell borrows are always released before mutating neighbours
// ("collect-then-mutate").
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource, Dependency};
use crate::reactivity::scheduling::schedule_effect;

// =============================================================================
// TRACK READ
// =============================================================================

/// Register `source` as a dependency of the active reaction, if any.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if !ctx.has_active_reaction() || ctx.is_untracking() {
            return;
        }
        let version = source.version();
        ctx.add_new_dep(source, version);
    });
}

// =============================================================================
// NOTIFY WRITE
// =============================================================================

/// Propagate a change of `source` through the graph.
pub fn notify_write(source: Rc<dyn AnySource>) {
    let writing_in_derived = with_context(|ctx| {
        ctx.get_active_reaction()
            .and_then(|w| w.upgrade())
            .is_some_and(|r| r.flags() & DERIVED != 0)
    });
    if writing_in_derived {
        panic!(
            "Cannot write to signals inside a derived. \
             Deriveds should be pure computations with no side effects."
        );
    }

    mark_reactions(source.clone(), DIRTY);

    // An effect writing a source it already read this run is not subscribed
    // to it yet, so re-queue it directly.
    let self_reader = with_context(|ctx| {
        ctx.get_active_reaction()
            .and_then(|w| w.upgrade())
            .filter(|r| r.is_effect() && r.is_clean() && ctx.has_new_dep(&source))
    });
    if let Some(effect) = self_reader {
        effect.set_status(DIRTY);
        schedule_effect(effect);
    }
}

/// Mark every reaction downstream of `source` as stale and schedule effects.
///
/// Iterative with an explicit stack so deep derived chains don't recurse.
pub fn mark_reactions(source: Rc<dyn AnySource>, status: u32) {
    let mut effects_to_schedule: Vec<Rc<dyn AnyReaction>> = Vec::new();
    let mut stack: Vec<(Rc<dyn AnySource>, u32)> = vec![(source, status)];

    while let Some((current, current_status)) = stack.pop() {
        for reaction in current.subscribers().snapshot() {
            let flags = reaction.flags();
            if flags & DESTROYED != 0 {
                continue;
            }

            let was_stale = flags & (DIRTY | MAYBE_DIRTY) != 0;
            // Never downgrade DIRTY to MAYBE_DIRTY
            if flags & DIRTY == 0 {
                reaction.set_status(current_status);
            }
            if was_stale {
                continue;
            }

            if flags & DERIVED != 0 {
                if let Some(derived) = reaction.as_derived_source() {
                    stack.push((derived, MAYBE_DIRTY));
                }
            } else if flags & EFFECT != 0 {
                effects_to_schedule.push(reaction);
            }
        }
    }

    for effect in effects_to_schedule {
        schedule_effect(effect);
    }
}

// =============================================================================
// STALENESS CHECK
// =============================================================================

/// Whether any dependency moved past the version the reaction last saw.
///
/// Derived dependencies are refreshed first, so a derived that recomputed to
/// an equal value does not count as a change.
pub fn deps_changed(reaction: &dyn AnyReaction) -> bool {
    reaction.deps().into_iter().any(|dep| {
        dep.source.refresh();
        dep.source.version() != dep.version
    })
}

// =============================================================================
// RUN TRACKED
// =============================================================================

/// Restores the outer tracking frame even if the reaction body panics.
struct ReactionFrame {
    prev_reaction: Option<std::rc::Weak<dyn AnyReaction>>,
    prev_deps: Option<Vec<Dependency>>,
    prev_untracking: bool,
}

impl Drop for ReactionFrame {
    fn drop(&mut self) {
        let prev_reaction = self.prev_reaction.take();
        let prev_deps = self.prev_deps.take().unwrap_or_default();
        let prev_untracking = self.prev_untracking;
        with_context(|ctx| {
            ctx.set_active_reaction(prev_reaction);
            ctx.swap_new_deps(prev_deps);
            ctx.set_untracking(prev_untracking);
        });
    }
}

/// Execute `f` as `reaction`, collecting its reads as the new dependency set.
pub fn run_tracked<R>(reaction: &Rc<dyn AnyReaction>, f: impl FnOnce() -> R) -> R {
    let frame = with_context(|ctx| ReactionFrame {
        prev_reaction: ctx.set_active_reaction(Some(Rc::downgrade(reaction))),
        prev_deps: Some(ctx.swap_new_deps(Vec::new())),
        prev_untracking: ctx.set_untracking(false),
    });

    reaction.set_flags(reaction.flags() | REACTION_IS_UPDATING);
    let result = f();
    reaction.set_flags(reaction.flags() & !REACTION_IS_UPDATING);

    let new_deps = with_context(|ctx| ctx.swap_new_deps(Vec::new()));
    drop(frame);

    install_dependencies(reaction, new_deps);
    result
}

/// Swap in a new dependency set, wiring and unwiring subscriber lists.
pub fn install_dependencies(reaction: &Rc<dyn AnyReaction>, deps: Vec<Dependency>) {
    let sources: Vec<Rc<dyn AnySource>> = deps.iter().map(|d| d.source.clone()).collect();
    let old = reaction.replace_deps(deps);

    for dep in &old {
        if !sources.iter().any(|s| dep.is(s)) {
            dep.source.subscribers().remove(reaction);
        }
    }
    for source in sources {
        source.subscribers().add(Rc::downgrade(reaction));
    }
}

/// Detach a reaction from everything it reads.
pub fn remove_reactions(reaction: &Rc<dyn AnyReaction>) {
    for dep in reaction.replace_deps(Vec::new()) {
        dep.source.subscribers().remove(reaction);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::derived::derived;
    use crate::primitives::effect::effect;
    use crate::primitives::signal::signal;
    use std::cell::Cell;

    #[test]
    fn effect_subscribes_to_what_it_reads() {
        let a = signal(1);
        let b = signal(2);
        let _e = effect({
            let a = a.clone();
            move || {
                a.get();
            }
        });

        assert_eq!(a.inner().reaction_count(), 1);
        assert_eq!(b.inner().reaction_count(), 0);
    }

    #[test]
    fn dependencies_are_pruned_on_rerun() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(2);
        let _e = effect({
            let (flag, a, b) = (flag.clone(), a.clone(), b.clone());
            move || {
                if flag.get() {
                    a.get();
                } else {
                    b.get();
                }
            }
        });

        assert_eq!(a.inner().reaction_count(), 1);
        flag.set(false);
        assert_eq!(a.inner().reaction_count(), 0);
        assert_eq!(b.inner().reaction_count(), 1);
    }

    #[test]
    fn equal_derived_stops_propagation() {
        let n = signal(1);
        let parity = derived({
            let n = n.clone();
            move || n.get() % 2
        });
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let (parity, runs) = (parity.clone(), runs.clone());
            move || {
                parity.get();
                runs.set(runs.get() + 1);
            }
        });

        assert_eq!(runs.get(), 1);
        n.set(3);
        assert_eq!(runs.get(), 1);
        n.set(4);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    #[should_panic(expected = "Cannot write to signals inside a derived")]
    fn writing_inside_derived_panics() {
        let a = signal(0);
        let d = derived({
            let a = a.clone();
            move || {
                a.set(1);
                0
            }
        });
        d.get();
    }
}
