// ============================================================================
// spark-compose - Views
// Element descriptions, dynamic regions, and rendered node snapshots
// ============================================================================
//
// Components build a `View` once. Anything that should follow state lives
// in a dynamic attribute or a `View::dynamic` region. Snapshotting a view
// resolves dynamic attributes against current state and reads each region's
// cached content, which is what the mount's render effect does every time
// something it read changes.
//
// A dynamic region is rebuilt by its own effect, and only when something
// its render read has changed. Each rebuild runs in a fresh child of the
// scope the region was created in (so providers above it stay visible) and
// stops the previous build's scope. Components built inside a region keep
// their state across unrelated redraws.
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::primitives::effect::{Effect, effect};
use crate::primitives::scope::{EffectScope, effect_scope, get_current_scope};
use crate::primitives::signal::Signal;
use crate::reactivity::batching::batch;
use crate::value::Value;

// =============================================================================
// EVENTS
// =============================================================================

/// Something that happened to a rendered node.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Click,
    /// A checkbox-like control asking to become checked or unchecked.
    Checked(bool),
    /// A control producing a new value.
    Input(Value),
    Blur,
    Submit,
}

impl Event {
    /// The value carried by the event, as a change handler would receive it.
    pub fn value(&self) -> Value {
        match self {
            Event::Input(value) => value.clone(),
            Event::Checked(checked) => Value::Bool(*checked),
            _ => Value::Null,
        }
    }
}

/// Event handler attached to an element.
pub type Handler = Rc<dyn Fn(&Event)>;

// =============================================================================
// ATTRIBUTES
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Value(Value),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Value(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Value(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Value(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        AttrValue::Value(v)
    }
}

/// An attribute: fixed, or recomputed on every snapshot.
#[derive(Clone)]
pub enum Attr {
    Static(AttrValue),
    Dynamic(Rc<dyn Fn() -> Option<AttrValue>>),
}

impl Attr {
    pub fn dynamic<F: Fn() -> Option<AttrValue> + 'static>(f: F) -> Self {
        Attr::Dynamic(Rc::new(f))
    }

    fn resolve(&self) -> Option<AttrValue> {
        match self {
            Attr::Static(v) => Some(v.clone()),
            Attr::Dynamic(f) => f(),
        }
    }
}

impl From<AttrValue> for Attr {
    fn from(value: AttrValue) -> Self {
        Attr::Static(value)
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// An element description, built with chained calls.
///
/// # Example
///
/// ```
/// use spark_compose::{Element, View};
///
/// let view: View = Element::new("label")
///     .attr("for", "email")
///     .class("text-sm")
///     .child("Email")
///     .into();
/// let nodes = view.snapshot();
/// assert_eq!(nodes[0].attr_str("for").as_deref(), Some("email"));
/// assert_eq!(nodes[0].text_content(), "Email");
/// ```
#[derive(Clone)]
pub struct Element {
    tag: &'static str,
    attrs: BTreeMap<String, Attr>,
    handlers: BTreeMap<String, Handler>,
    children: Vec<View>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: BTreeMap::new(),
            handlers: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Set an attribute, replacing any previous value.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), Attr::Static(value.into()));
        self
    }

    /// Set an attribute recomputed on every snapshot. `None` omits it.
    pub fn attr_dyn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Option<AttrValue> + 'static,
    {
        self.attrs.insert(name.into(), Attr::dynamic(f));
        self
    }

    /// Set an attribute only if the element does not already carry one.
    pub fn attr_default(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs
            .entry(name.into())
            .or_insert_with(|| Attr::Static(value.into()));
        self
    }

    /// Set a dynamic attribute only if the element does not already carry one.
    pub fn attr_default_dyn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Option<AttrValue> + 'static,
    {
        self.attrs
            .entry(name.into())
            .or_insert_with(|| Attr::dynamic(f));
        self
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Append classes to the `class` attribute.
    pub fn class(mut self, extra: impl AsRef<str>) -> Self {
        let extra = extra.as_ref().trim();
        if extra.is_empty() {
            return self;
        }
        let merged = match self.attrs.get("class") {
            Some(Attr::Static(existing)) => format!("{existing} {extra}"),
            _ => extra.to_string(),
        };
        self.attrs.insert("class".into(), Attr::Static(AttrValue::Text(merged)));
        self
    }

    /// Set an event handler, replacing any previous one.
    pub fn on<F: Fn(&Event) + 'static>(mut self, event: impl Into<String>, handler: F) -> Self {
        self.handlers.insert(event.into(), Rc::new(handler));
        self
    }

    /// Add a handler that runs after the element's own handler for `event`.
    pub fn compose_handler<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        let event = event.into();
        let composed: Handler = match self.handlers.remove(&event) {
            Some(own) => Rc::new(move |e: &Event| {
                own(e);
                handler(e);
            }),
            None => Rc::new(handler),
        };
        self.handlers.insert(event, composed);
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<View>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    fn render(&self) -> Node {
        let attrs = self
            .attrs
            .iter()
            .filter_map(|(name, attr)| attr.resolve().map(|v| (name.clone(), v)))
            .collect();
        let mut children = Vec::new();
        for child in &self.children {
            child.render_into(&mut children);
        }
        Node {
            tag: self.tag,
            text: None,
            attrs,
            handlers: self.handlers.clone(),
            children,
        }
    }
}

// =============================================================================
// VIEW
// =============================================================================

/// A described piece of UI.
#[derive(Clone, Default)]
pub enum View {
    #[default]
    Empty,
    Text(String),
    Element(Element),
    Fragment(Vec<View>),
    Dynamic(Dynamic),
}

impl View {
    pub fn text(s: impl Into<String>) -> Self {
        View::Text(s.into())
    }

    /// A region rebuilt whenever something `render` read changes.
    ///
    /// `render` runs now, and on every rebuild, inside a child of the scope
    /// active now, so context provided above this point is visible to it.
    pub fn dynamic<F: Fn() -> View + 'static>(render: F) -> Self {
        View::Dynamic(Dynamic::new(Box::new(render)))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, View::Empty)
    }

    /// Resolve the view against current state.
    pub fn snapshot(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut Vec<Node>) {
        match self {
            View::Empty => {}
            View::Text(s) => out.push(Node::text(s.clone())),
            View::Element(el) => out.push(el.render()),
            View::Fragment(items) => {
                for item in items {
                    item.render_into(out);
                }
            }
            View::Dynamic(dynamic) => dynamic.content().render_into(out),
        }
    }
}

impl From<Element> for View {
    fn from(el: Element) -> Self {
        View::Element(el)
    }
}

impl From<&str> for View {
    fn from(s: &str) -> Self {
        View::Text(s.to_string())
    }
}

impl From<String> for View {
    fn from(s: String) -> Self {
        View::Text(s)
    }
}

impl From<Vec<View>> for View {
    fn from(items: Vec<View>) -> Self {
        View::Fragment(items)
    }
}

impl From<Option<View>> for View {
    fn from(view: Option<View>) -> Self {
        view.unwrap_or_default()
    }
}

// =============================================================================
// DYNAMIC REGION
// =============================================================================

struct DynamicInner {
    owner: Option<EffectScope>,
    render: Box<dyn Fn() -> View>,
    /// Scope of the last build
    current: RefCell<Option<EffectScope>>,
    /// Content of the last build
    content: RefCell<View>,
    /// Moves after every build, so snapshots follow rebuilds
    version: Signal<u64>,
    rebuild: RefCell<Option<Effect>>,
}

impl DynamicInner {
    fn build(&self) {
        let scope = match &self.owner {
            Some(owner) => owner.child(),
            None => effect_scope(true),
        };
        if let Some(previous) = self.current.replace(Some(scope.clone())) {
            previous.stop();
        }
        let content = scope.within(|| (self.render)());
        // The previous content is dropped outside the borrow
        let _previous = self.content.replace(content);
        self.version.update(|v| *v += 1);
    }
}

impl Drop for DynamicInner {
    fn drop(&mut self) {
        if let Some(scope) = self.current.get_mut().take() {
            scope.stop();
        }
    }
}

#[derive(Clone)]
pub struct Dynamic(Rc<DynamicInner>);

impl Dynamic {
    fn new(render: Box<dyn Fn() -> View>) -> Self {
        let inner = Rc::new(DynamicInner {
            owner: get_current_scope(),
            render,
            current: RefCell::new(None),
            content: RefCell::new(View::Empty),
            version: Signal::new(0),
            rebuild: RefCell::new(None),
        });
        // Plain effects flush before render effects, so a rebuild lands
        // before the mount re-snapshots
        let weak = Rc::downgrade(&inner);
        let rebuild = effect(move || {
            if let Some(inner) = weak.upgrade() {
                inner.build();
            }
        });
        *inner.rebuild.borrow_mut() = Some(rebuild);
        Dynamic(inner)
    }

    /// Content of the last build. Subscribes the active reaction to rebuilds.
    fn content(&self) -> View {
        self.0.version.get();
        self.0.content.borrow().clone()
    }

    /// How many times the region has been built.
    pub fn builds(&self) -> u64 {
        self.0.version.peek()
    }
}

// =============================================================================
// NODE SNAPSHOT
// =============================================================================

/// A rendered node: resolved attributes, live handlers, rendered children.
#[derive(Clone)]
pub struct Node {
    tag: &'static str,
    text: Option<String>,
    attrs: BTreeMap<String, AttrValue>,
    handlers: BTreeMap<String, Handler>,
    children: Vec<Node>,
}

impl Node {
    const TEXT: &'static str = "#text";
    const ROOT: &'static str = "#root";

    fn text(s: String) -> Self {
        Self {
            tag: Self::TEXT,
            text: Some(s),
            attrs: BTreeMap::new(),
            handlers: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// A synthetic container for a list of top-level nodes.
    pub fn root(children: Vec<Node>) -> Self {
        Self {
            tag: Self::ROOT,
            text: None,
            attrs: BTreeMap::new(),
            handlers: BTreeMap::new(),
            children,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Attribute rendered as text.
    pub fn attr_str(&self, name: &str) -> Option<String> {
        self.attrs.get(name).map(ToString::to_string)
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub fn handler(&self, event: &str) -> Option<Handler> {
        self.handlers.get(event).cloned()
    }

    /// Run the handler for `event` inside a batch. Returns false if there is none.
    pub fn fire(&self, event_name: &str, event: Event) -> bool {
        match self.handler(event_name) {
            Some(handler) => {
                batch(|| handler(&event));
                true
            }
            None => false,
        }
    }

    /// First node (depth-first, self included) matching `pred`.
    pub fn find(&self, pred: impl Fn(&Node) -> bool) -> Option<&Node> {
        self.find_ref(&pred)
    }

    fn find_ref(&self, pred: &dyn Fn(&Node) -> bool) -> Option<&Node> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_ref(pred))
    }

    /// Every node (depth-first, self included) matching `pred`.
    pub fn find_all(&self, pred: impl Fn(&Node) -> bool) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_matching(&pred, &mut out);
        out
    }

    fn collect_matching<'a>(&'a self, pred: &dyn Fn(&Node) -> bool, out: &mut Vec<&'a Node>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_matching(pred, out);
        }
    }

    pub fn by_slot(&self, slot: &str) -> Option<&Node> {
        self.find(|n| n.attr("data-slot").and_then(AttrValue::as_str) == Some(slot))
    }

    pub fn all_by_slot(&self, slot: &str) -> Vec<&Node> {
        self.find_all(|n| n.attr("data-slot").and_then(AttrValue::as_str) == Some(slot))
    }

    pub fn by_id(&self, id: &str) -> Option<&Node> {
        self.find(|n| n.attr("id").and_then(AttrValue::as_str) == Some(id))
    }

    /// Find by a small selector: `#id`, `[name=value]`, `[name]`, or a tag name.
    pub fn select(&self, selector: &str) -> Option<&Node> {
        if let Some(id) = selector.strip_prefix('#') {
            return self.by_id(id);
        }
        if let Some(inner) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim_matches(|c| c == '"' || c == '\'');
                    self.find(|n| n.attr_str(name).as_deref() == Some(value))
                }
                None => self.find(|n| n.attr(inner).is_some()),
            };
        }
        self.find(|n| n.tag == selector)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            return write!(f, "{text:?}");
        }
        f.debug_struct("Node")
            .field("tag", &self.tag)
            .field("attrs", &self.attrs)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

/// Markup-like rendering, used in assertions and logs.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            return f.write_str(text);
        }
        if self.tag == Self::ROOT {
            for child in &self.children {
                write!(f, "{child}")?;
            }
            return Ok(());
        }
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(f, " {name}=\"{value}\"")?;
        }
        f.write_str(">")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.tag)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;
    use std::cell::Cell;

    #[test]
    fn explicit_attr_beats_default() {
        let el = Element::new("input")
            .attr("id", "mine")
            .attr_default("id", "generated")
            .attr_default("name", "email");
        let node = &View::from(el).snapshot()[0];
        assert_eq!(node.attr_str("id").as_deref(), Some("mine"));
        assert_eq!(node.attr_str("name").as_deref(), Some("email"));
    }

    #[test]
    fn class_merges() {
        let el = Element::new("div").class("grid gap-3").class("mt-2").class("  ");
        let node = &View::from(el).snapshot()[0];
        assert_eq!(node.attr_str("class").as_deref(), Some("grid gap-3 mt-2"));
    }

    #[test]
    fn composed_handlers_run_own_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let el = Element::new("button")
            .on("click", {
                let order = order.clone();
                move |_| order.borrow_mut().push("own")
            })
            .compose_handler("click", {
                let order = order.clone();
                move |_| order.borrow_mut().push("bound")
            });
        let node = &View::from(el).snapshot()[0];
        assert!(node.fire("click", Event::Click));
        assert!(!node.fire("blur", Event::Blur));
        assert_eq!(*order.borrow(), vec!["own", "bound"]);
    }

    #[test]
    fn dynamic_attrs_and_regions_follow_state() {
        let on = signal(false);
        let view = View::from(
            Element::new("div")
                .attr_dyn("data-on", {
                    let on = on.clone();
                    move || on.get().then(|| AttrValue::Bool(true))
                })
                .child(View::dynamic({
                    let on = on.clone();
                    move || if on.get() { "yes".into() } else { View::Empty }
                })),
        );

        let before = &view.snapshot()[0];
        assert!(before.attr("data-on").is_none());
        assert_eq!(before.text_content(), "");

        on.set(true);
        let after = &view.snapshot()[0];
        assert_eq!(after.attr("data-on"), Some(&AttrValue::Bool(true)));
        assert_eq!(after.text_content(), "yes");
    }

    #[test]
    fn dynamic_region_stops_previous_scope() {
        let n = signal(0);
        let disposed = Rc::new(Cell::new(0));
        let view = View::dynamic({
            let (n, disposed) = (n.clone(), disposed.clone());
            move || {
                n.get();
                let disposed = disposed.clone();
                crate::primitives::scope::on_scope_dispose(move || disposed.set(disposed.get() + 1));
                View::Empty
            }
        });
        n.set(1);
        n.set(2);
        assert_eq!(disposed.get(), 2);

        drop(view);
        assert_eq!(disposed.get(), 3);
    }

    #[test]
    fn snapshots_reuse_the_last_build() {
        let n = signal(0);
        let other = signal(0);
        let builds = Rc::new(Cell::new(0));
        let view = View::dynamic({
            let (n, builds) = (n.clone(), builds.clone());
            move || {
                builds.set(builds.get() + 1);
                n.get().to_string().into()
            }
        });

        view.snapshot();
        view.snapshot();
        other.set(1);
        assert_eq!(builds.get(), 1);
        assert_eq!(Node::root(view.snapshot()).text_content(), "0");

        n.set(7);
        assert_eq!(builds.get(), 2);
        assert_eq!(Node::root(view.snapshot()).text_content(), "7");
        if let View::Dynamic(region) = &view {
            assert_eq!(region.builds(), 2);
        }
    }

    #[test]
    fn state_built_inside_a_region_survives_redraws() {
        let count = signal(0);
        let view = View::dynamic({
            let count = count.clone();
            move || {
                // Local state, created once per build
                let local = Signal::new(0);
                let (count, local_for_text) = (count.clone(), local.clone());
                Element::new("button")
                    .attr("id", "b")
                    .on("click", move |_| local.update(|n| *n += 1))
                    .child(View::from(Element::new("span").attr_dyn("data-n", move || {
                        Some(format!("{}:{}", count.get(), local_for_text.get()).into())
                    })))
                    .into()
            }
        });

        let fire = |view: &View| {
            let root = Node::root(view.snapshot());
            assert!(root.by_id("b").is_some_and(|b| b.fire("click", Event::Click)));
        };
        let state = |view: &View| {
            Node::root(view.snapshot())
                .select("span")
                .and_then(|n| n.attr_str("data-n"))
        };

        fire(&view);
        fire(&view);
        count.set(5);
        assert_eq!(state(&view).as_deref(), Some("5:2"));
    }

    #[test]
    fn selectors_and_markup() {
        let view = View::from(
            Element::new("div")
                .attr("data-slot", "field")
                .child(Element::new("label").attr("id", "l1").child("Name")),
        );
        let root = Node::root(view.snapshot());
        assert_eq!(root.select("#l1").map(Node::tag), Some("label"));
        assert_eq!(root.select("[data-slot=field]").map(Node::tag), Some("div"));
        assert_eq!(root.select("[data-slot]").map(Node::tag), Some("div"));
        assert_eq!(root.select("label").map(Node::text_content).as_deref(), Some("Name"));
        assert_eq!(
            root.to_string(),
            r#"<div data-slot="field"><label id="l1">Name</label></div>"#
        );
    }

    #[test]
    fn event_values() {
        assert_eq!(Event::Input(Value::from("x")).value(), Value::from("x"));
        assert_eq!(Event::Checked(true).value(), Value::Bool(true));
        assert_eq!(Event::Click.value(), Value::Null);
    }
}
