use spark_compose::{
    Capability, Element, Event, Lookup, ShallowEq, View, effect, effect_scope, mount, signal,
};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct Theme {
    accent: String,
    dense: bool,
}

impl ShallowEq for Theme {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.accent == other.accent && self.dense == other.dense
    }
}

fn default_theme() -> Theme {
    Theme {
        accent: "slate".to_string(),
        dense: false,
    }
}

static THEME: Capability<Theme> = Capability::with_default("Theme", default_theme);
static USER: Capability<String> = Capability::new("User");

#[test]
fn test_capability_names() {
    assert_eq!(THEME.name(), "Theme");
    assert_eq!(USER.display_name(), "UserProvider");
    assert!(THEME.has_default());
    assert!(!USER.has_default());
}

#[test]
fn test_missing_provider_error() {
    let err = USER.use_value().err().unwrap();
    assert_eq!(err.capability(), Some("User"));
    assert_eq!(err.to_string(), "useContext must be used within `UserProvider`.");
}

#[test]
fn test_default_outside_provider() {
    match THEME.lookup() {
        Lookup::Default(theme) => assert_eq!(theme, default_theme()),
        _ => panic!("expected the default theme"),
    }
}

#[test]
fn test_consumer_rerenders_with_provider() {
    let accent = signal("indigo".to_string());

    let handle = mount({
        let accent = accent.clone();
        move || {
            THEME.provide(
                move || Theme {
                    accent: accent.get(),
                    dense: true,
                },
                || -> spark_compose::Result<View> {
                    let theme = THEME.use_value()?;
                    Ok(View::from(
                        Element::new("div")
                            .attr("id", "card")
                            .attr_dyn("data-accent", move || {
                                Some(theme.with(|t| t.accent.clone()).into())
                            }),
                    ))
                },
            )
        }
    })
    .unwrap();

    let accent_of = |handle: &spark_compose::MountHandle| {
        handle.snapshot().by_id("card").and_then(|n| n.attr_str("data-accent"))
    };
    assert_eq!(accent_of(&handle).as_deref(), Some("indigo"));

    let before = handle.render_count();
    accent.set("indigo".to_string());
    assert_eq!(handle.render_count(), before);

    accent.set("rose".to_string());
    assert_eq!(accent_of(&handle).as_deref(), Some("rose"));
}

#[test]
fn test_sibling_providers_do_not_leak() {
    let root = effect_scope(true);
    root.run(|| {
        USER.provide(|| "ada".to_string(), || {
            assert_eq!(USER.use_value().unwrap().get(), "ada");
        });
        USER.provide(|| "grace".to_string(), || {
            assert_eq!(USER.use_value().unwrap().get(), "grace");
        });
        assert!(USER.lookup().is_missing());
    });
}

#[test]
fn test_handlers_read_latest_value() {
    let name = signal("ada".to_string());
    let seen = Rc::new(Cell::new(0usize));

    let handle = mount({
        let (name, seen) = (name.clone(), seen.clone());
        move || {
            USER.provide(
                move || name.get(),
                || -> spark_compose::Result<View> {
                    let user = USER.use_value()?;
                    Ok(View::from(Element::new("button").attr("id", "hello").on(
                        "click",
                        move |_| seen.set(user.peek().len()),
                    )))
                },
            )
        }
    })
    .unwrap();

    name.set("margaret".to_string());
    handle.dispatch("#hello", "click", Event::Click);
    assert_eq!(seen.get(), "margaret".len());
}

#[test]
fn test_effects_under_a_provider_stop_with_it() {
    let runs = Rc::new(Cell::new(0));
    let source = signal(0);
    let root = effect_scope(true);

    root.run(|| {
        USER.provide(|| "ada".to_string(), || {
            let (runs, source) = (runs.clone(), source.clone());
            effect(move || {
                source.get();
                runs.set(runs.get() + 1);
            });
        });
    });
    source.set(1);
    assert_eq!(runs.get(), 2);

    root.stop();
    source.set(2);
    assert_eq!(runs.get(), 2);
}
