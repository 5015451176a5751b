// ============================================================================
// spark-compose - Runtime
// Mount a component tree and keep a rendered snapshot up to date
// ============================================================================
//
// `mount` builds the tree once inside a root scope, then installs a render
// effect that snapshots it. Dynamic attributes read during the snapshot, and
// the build counters of dynamic regions, become dependencies of that effect.
// Regions rebuild in plain effects, so a write re-renders once per flush,
// after every affected region has settled.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::Result;
use crate::primitives::effect::render_effect;
use crate::primitives::scope::{EffectScope, effect_scope};
use crate::view::{Event, Node, View};

/// A mounted component tree.
///
/// Dropping the handle unmounts the tree.
pub struct MountHandle {
    scope: EffectScope,
    root: Rc<RefCell<Node>>,
    renders: Rc<Cell<u64>>,
}

impl MountHandle {
    /// The most recent render.
    pub fn snapshot(&self) -> Node {
        self.root.borrow().clone()
    }

    /// How many times the tree has rendered, the initial render included.
    pub fn render_count(&self) -> u64 {
        self.renders.get()
    }

    /// Fire `event_name` on the first node matching `selector`.
    ///
    /// Returns false if no node matches or the node has no such handler.
    pub fn dispatch(&self, selector: &str, event_name: &str, event: Event) -> bool {
        // Release the snapshot borrow before running the handler, which re-renders
        let node = self.root.borrow().select(selector).cloned();
        match node {
            Some(node) => node.fire(event_name, event),
            None => {
                tracing::debug!(selector, event_name, "dispatch matched no node");
                false
            }
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.scope.active()
    }

    pub fn unmount(self) {
        self.scope.stop();
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.scope.stop();
    }
}

/// Build a component tree and start rendering it.
///
/// # Example
///
/// ```
/// use spark_compose::{Element, Event, View, mount, signal};
///
/// let count = signal(0);
/// let handle = mount({
///     let count = count.clone();
///     move || {
///         Ok(Element::new("button")
///             .attr("id", "inc")
///             .on("click", {
///                 let count = count.clone();
///                 move |_| count.update(|n| *n += 1)
///             })
///             .child(View::dynamic(move || count.get().to_string().into()))
///             .into())
///     }
/// })
/// .unwrap();
///
/// assert!(handle.dispatch("#inc", "click", Event::Click));
/// assert_eq!(handle.snapshot().text_content(), "1");
/// ```
pub fn mount<F>(build: F) -> Result<MountHandle>
where
    F: FnOnce() -> Result<View>,
{
    let scope = effect_scope(true);
    let view = scope.within(build)?;

    let root = Rc::new(RefCell::new(Node::root(Vec::new())));
    let renders = Rc::new(Cell::new(0));

    scope.within(|| {
        let (root, renders) = (root.clone(), renders.clone());
        render_effect(move || {
            let node = Node::root(view.snapshot());
            *root.borrow_mut() = node;
            renders.set(renders.get() + 1);
            tracing::trace!(render = renders.get(), "rendered");
        });
    });

    Ok(MountHandle {
        scope,
        root,
        renders,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;
    use crate::reactivity::batching::batch;
    use crate::view::Element;

    #[test]
    fn rerenders_once_per_batch() {
        let a = signal(1);
        let b = signal(2);
        let handle = mount({
            let (a, b) = (a.clone(), b.clone());
            move || Ok(View::dynamic(move || format!("{}", a.get() + b.get()).into()))
        })
        .unwrap();

        assert_eq!(handle.render_count(), 1);
        batch(|| {
            a.set(10);
            b.set(20);
        });
        assert_eq!(handle.render_count(), 2);
        assert_eq!(handle.snapshot().text_content(), "30");
    }

    #[test]
    fn build_errors_propagate() {
        let result = mount(|| {
            Err(crate::error::Error::MissingProvider {
                capability: "Form",
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn unmount_stops_rendering() {
        let a = signal(0);
        let handle = mount({
            let a = a.clone();
            move || Ok(View::dynamic(move || a.get().to_string().into()))
        })
        .unwrap();

        let root = handle.root.clone();
        handle.unmount();
        a.set(5);
        assert_eq!(root.borrow().text_content(), "0");
    }

    #[test]
    fn dispatch_misses_are_false() {
        let handle = mount(|| Ok(Element::new("div").attr("id", "x").into())).unwrap();
        assert!(handle.is_mounted());
        assert!(!handle.dispatch("#missing", "click", Event::Click));
        assert!(!handle.dispatch("#x", "click", Event::Click));
    }
}
