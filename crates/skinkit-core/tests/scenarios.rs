use std::sync::{Arc, Mutex};
use std::time::Duration;

use skinkit_config::SkinConfig;
use skinkit_core::{
    ClickOutcome, Environment, Hook, IntersectionEntry, Key, MemoryStore, PageContext, PinState,
    PreferenceStore, PreferenceWriter, ScrollDirection, Skin, SkinError, SkinEvent, Visibility,
};
use skinkit_dom::{Document, ElementId};

const PAGE: &str = r##"<!DOCTYPE html>
<html class="simple-unpinned movable-unpinned mock-feature-clientpref-0 limited-width-enabled">
<body>
  <div id="vector-sticky-header" class="vector-sticky-header">
    <span class="vector-sticky-header-context-bar-primary"></span>
    <button id="vector-sticky-search-toggle">search</button>
    <a id="ca-history-sticky-header" href="#">History</a>
    <a id="ca-talk-sticky-header" href="#">Talk</a>
    <a id="ca-ve-edit-sticky-header" href="#">Edit</a>
    <a id="ca-edit-sticky-header" href="#">Edit source</a>
    <a id="ca-viewsource-sticky-header" href="#">View source</a>
    <div id="vector-sticky-header-user-links"></div>
  </div>
  <button class="search-toggle" id="search">search</button>
  <div id="vector-user-links-dropdown" data-event-name="user-links">
    <ul id="p-personal"><li id="pt-login"><a href="/login">Log in</a></li></ul>
  </div>

  <div class="vector-pinnable-header vector-pinnable-header-unpinned" data-name="simple">
    <button class="vector-pinnable-header-pin-button" id="simple-pin">pin</button>
    <button class="vector-pinnable-header-unpin-button" id="simple-unpin">unpin</button>
  </div>
  <div id="pinned-container"></div>
  <div id="unpinned-container">
    <nav id="movable">
      <div class="vector-pinnable-header vector-pinnable-header-unpinned" data-name="movable"
           data-pinnable-element-id="movable"
           data-pinned-container-id="pinned-container"
           data-unpinned-container-id="unpinned-container">
        <button class="vector-pinnable-header-pin-button" id="movable-pin">pin</button>
        <button class="vector-pinnable-header-unpin-button" id="movable-unpin">unpin</button>
      </div>
    </nav>
  </div>

  <h1 id="firstHeading">Rust (programming language)</h1>
  <ul id="p-views">
    <li id="ca-history"><a href="/w/index.php?title=Rust&amp;action=history" title="Past revisions of this page">View history</a></li>
    <li id="ca-ve-edit"><a href="/w/index.php?title=Rust&amp;veaction=edit">Edit</a></li>
    <li id="ca-edit"><a href="/w/index.php?title=Rust&amp;action=edit">Edit source</a></li>
  </ul>
</body>
</html>"##;

fn anonymous() -> PreferenceStore {
    PreferenceStore::anonymous(Box::new(MemoryStore::new()), "skin-preferences")
}

fn init(prefs: PreferenceStore) -> Skin {
    Skin::init(
        Document::parse(PAGE),
        SkinConfig::default(),
        &PageContext::default(),
        Environment::default(),
        prefs,
    )
    .unwrap()
}

fn id(skin: &Skin, id: &str) -> ElementId {
    skin.document()
        .get_element_by_id(id)
        .unwrap_or_else(|| panic!("#{id} missing"))
}

fn root_classes(skin: &Skin) -> Vec<String> {
    let doc = skin.document();
    let mut classes: Vec<String> = doc
        .classes(doc.root().unwrap())
        .into_iter()
        .map(str::to_string)
        .collect();
    classes.sort();
    classes
}

fn parent_id(skin: &Skin, child: &str) -> String {
    let doc = skin.document();
    let parent = doc.parent(id(skin, child)).unwrap();
    doc.id_of(parent).unwrap().to_string()
}

fn past_heading(skin: &Skin) -> IntersectionEntry {
    IntersectionEntry {
        target: id(skin, "firstHeading"),
        is_intersecting: false,
        top: -120.0,
    }
}

#[test]
fn toggle_round_trip_restores_root_classes() {
    let mut skin = init(anonymous());
    let before = root_classes(&skin);
    for name in ["limited-width", "mock-feature"] {
        skin.toggle_feature(name).unwrap();
        skin.toggle_feature(name).unwrap();
    }
    assert_eq!(root_classes(&skin), before);
}

#[test]
fn clientpref_zero_toggles_to_one() {
    let mut skin = init(anonymous());
    assert!(skin.toggle_feature("mock-feature").unwrap());
    let classes = root_classes(&skin);
    assert!(classes.contains(&"mock-feature-clientpref-1".to_string()));
    assert!(!classes.contains(&"mock-feature-clientpref-0".to_string()));
}

#[test]
fn unknown_feature_is_a_programming_error() {
    let mut skin = init(anonymous());
    let before = root_classes(&skin);
    let err = skin.toggle_feature("never-declared").unwrap_err();
    assert!(matches!(err, SkinError::UnknownFeature(ref name) if name == "never-declared"));
    assert_eq!(root_classes(&skin), before);
    assert!(skin.take_events().is_empty());
}

#[test]
fn simple_panel_pin_and_unpin() {
    let mut skin = init(anonymous());
    let pin = id(&skin, "simple-pin");
    let unpin = id(&skin, "simple-unpin");

    assert_eq!(skin.click(pin).unwrap(), ClickOutcome::Handled);
    let classes = root_classes(&skin);
    assert!(classes.contains(&"simple-pinned".to_string()));
    assert!(!classes.contains(&"simple-unpinned".to_string()));
    let header = skin.pinnables().panel("simple").unwrap().header;
    assert!(skin.document().has_class(header, "vector-pinnable-header-pinned"));
    assert_eq!(
        skin.take_events(),
        vec![SkinEvent::PinStateChanged {
            name: "simple".to_string(),
            state: PinState::Pinned,
        }]
    );

    skin.activate_key(unpin, Key::Enter).unwrap();
    let classes = root_classes(&skin);
    assert!(classes.contains(&"simple-unpinned".to_string()));
    assert!(!classes.contains(&"simple-pinned".to_string()));
    assert!(skin.document().has_class(header, "vector-pinnable-header-unpinned"));
    assert!(!skin.document().has_class(header, "vector-pinnable-header-pinned"));
    // the other panel is untouched
    assert!(classes.contains(&"movable-unpinned".to_string()));
}

#[test]
fn movable_panel_relocates() {
    let mut skin = init(anonymous());
    assert_eq!(parent_id(&skin, "movable"), "unpinned-container");

    let pin = id(&skin, "movable-pin");
    skin.click(pin).unwrap();
    assert_eq!(parent_id(&skin, "movable"), "pinned-container");
    skin.click(pin).unwrap();
    assert_eq!(parent_id(&skin, "movable"), "pinned-container");
    let container = id(&skin, "pinned-container");
    assert_eq!(skin.document().children(container).len(), 1);

    let unpin = id(&skin, "movable-unpin");
    skin.activate_key(unpin, Key::Space).unwrap();
    assert_eq!(parent_id(&skin, "movable"), "unpinned-container");
}

#[test]
fn narrow_viewport_round_trip() {
    let mut skin = init(anonymous());
    skin.resize(1600).unwrap();
    skin.click(id(&skin, "movable-pin")).unwrap();
    skin.take_events();

    skin.resize(800).unwrap();
    assert_eq!(parent_id(&skin, "movable"), "unpinned-container");
    skin.resize(700).unwrap();
    skin.resize(1400).unwrap();
    assert_eq!(parent_id(&skin, "movable"), "pinned-container");
    assert_eq!(skin.take_events().len(), 2);
}

#[test]
fn sticky_header_shows_once_per_transition() {
    let mut skin = init(anonymous());
    let header = id(&skin, "vector-sticky-header");
    assert_eq!(skin.sticky_visibility(), Some(Visibility::Hidden));
    let entry = past_heading(&skin);
    for _ in 0..3 {
        skin.intersect(&[entry]);
    }
    assert!(skin.document().has_class(header, "vector-sticky-header-visible"));
    assert_eq!(
        skin.take_events(),
        vec![SkinEvent::PageTitleScroll(ScrollDirection::Down)]
    );

    let back = IntersectionEntry {
        is_intersecting: true,
        top: 40.0,
        ..entry
    };
    skin.intersect(&[back]);
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));
    assert_eq!(skin.document().attr(header, "aria-hidden"), Some("true"));
    assert_eq!(
        skin.take_events(),
        vec![SkinEvent::PageTitleScroll(ScrollDirection::Up)]
    );
}

#[test]
fn sticky_icons_follow_canonical_actions() {
    let skin = init(anonymous());
    let doc = skin.document();
    assert!(doc.get_element_by_id("ca-talk-sticky-header").is_none());
    assert!(doc.get_element_by_id("ca-viewsource-sticky-header").is_none());
    let history = id(&skin, "ca-history-sticky-header");
    assert_eq!(
        doc.attr(history, "href"),
        Some("/w/index.php?title=Rust&action=history")
    );
    assert_eq!(doc.attr(history, "title"), Some("Past revisions of this page"));
    let title = doc
        .query_selector(None, ".vector-sticky-header-context-bar-primary")
        .unwrap()
        .unwrap();
    assert_eq!(doc.text_content(title), "Rust (programming language)");
}

#[test]
fn sticky_edit_click_through_navigates_when_not_intercepted() {
    let mut skin = init(anonymous());
    let sticky_edit = id(&skin, "ca-edit-sticky-header");
    assert_eq!(
        skin.click(sticky_edit).unwrap(),
        ClickOutcome::Navigate(
            "/w/index.php?title=Rust&action=edit&wvprov=sticky-header".to_string()
        )
    );
}

#[test]
fn intercepted_canonical_click_disables_sticky_header() {
    let mut skin = init(anonymous());
    let canonical = skin
        .document()
        .query_selector(None, "#ca-ve-edit a")
        .unwrap()
        .unwrap();
    skin.on_click(canonical, |event| event.prevent_default());
    skin.intersect(&[past_heading(&skin)]);
    skin.take_events();

    let sticky_edit = id(&skin, "ca-ve-edit-sticky-header");
    assert_eq!(skin.click(sticky_edit).unwrap(), ClickOutcome::Handled);
    assert_eq!(skin.take_events(), vec![SkinEvent::StickyHeaderDisabled]);
    let header = id(&skin, "vector-sticky-header");
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));

    // Scrolling no longer shows the header until the editor closes.
    let entry = past_heading(&skin);
    skin.intersect(&[entry]);
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));

    skin.hook(Hook::EditorDeactivated).unwrap();
    skin.intersect(&[entry]);
    assert!(skin.document().has_class(header, "vector-sticky-header-visible"));
}

#[test]
fn editor_hooks_hide_and_restore() {
    let mut skin = init(anonymous());
    let header = id(&skin, "vector-sticky-header");
    let entry = past_heading(&skin);
    skin.intersect(&[entry]);
    skin.hook(Hook::EditorActivated).unwrap();
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));
    assert_eq!(skin.sticky_visibility(), Some(Visibility::Hidden));

    skin.hook(Hook::PostEdit).unwrap();
    skin.intersect(&[entry]);
    assert_eq!(skin.sticky_visibility(), Some(Visibility::Visible));
}

#[test]
fn search_toggle_forwards_to_canonical() {
    let mut skin = init(anonymous());
    let canonical = id(&skin, "search");
    let opened = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&opened);
    skin.on_click(canonical, move |event| {
        *counter.lock().unwrap() += 1;
        event.prevent_default();
    });
    let sticky = id(&skin, "vector-sticky-search-toggle");
    assert_eq!(skin.click(sticky).unwrap(), ClickOutcome::Handled);
    assert_eq!(*opened.lock().unwrap(), 1);
}

#[test]
fn portlet_link_added_refreshes_user_menu_clone() {
    let mut skin = init(anonymous());
    let list = id(&skin, "p-personal");
    let doc = skin.document_mut();
    let item = doc.create_element(skinkit_dom::ElementData::with_attrs(
        "li",
        [("id", "pt-custom")],
    ));
    doc.append_child(list, item).unwrap();
    skin.hook(Hook::PortletLinkAdded { link: item }).unwrap();

    let doc = skin.document();
    let clone = id(&skin, "pt-custom-sticky-header");
    let container = id(&skin, "vector-sticky-header-user-links");
    assert!(doc.contains(container, clone));
    assert_eq!(doc.children(container).len(), 1);
}

#[test]
fn inert_without_intersection_observer() {
    let mut skin = Skin::init(
        Document::parse(PAGE),
        SkinConfig::default(),
        &PageContext::default(),
        Environment {
            intersection_observer: false,
        },
        anonymous(),
    )
    .unwrap();
    assert!(skin.sticky_header().is_none());
    assert_eq!(skin.sticky_visibility(), None);
    let entry = past_heading(&skin);
    skin.intersect(&[entry]);
    skin.scroll_to(500.0);
    assert!(skin.take_events().is_empty());
    // talk icon is left alone when the header is inert
    assert!(skin.document().get_element_by_id("ca-talk-sticky-header").is_some());
}

#[test]
fn registered_session_coalesces_remote_saves() {
    let calls: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let sink = Arc::clone(&calls);
    let writer = PreferenceWriter::spawn(
        move |name: &str, value: &str| -> anyhow::Result<()> {
            sink.lock().unwrap().push((name.to_string(), value.to_string()));
            Ok(())
        },
        Duration::from_secs(30),
    );
    let prefs = PreferenceStore::registered(
        Box::new(MemoryStore::new()),
        "skin-preferences",
        writer,
    );
    let mut skin = init(prefs);
    for _ in 0..5 {
        skin.toggle_feature("limited-width").unwrap();
    }
    assert!(calls.lock().unwrap().is_empty());
    skin.flush_preferences();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![("limited-width".to_string(), "0".to_string())]
    );
}

#[test]
fn rebinding_boundary_while_visible_hides_header() {
    let mut skin = init(anonymous());
    let header = id(&skin, "vector-sticky-header");
    skin.intersect(&[past_heading(&skin)]);
    assert!(skin.document().has_class(header, "vector-sticky-header-visible"));

    let views = id(&skin, "p-views");
    skin.rebind_boundary(views);
    let in_view = IntersectionEntry {
        target: views,
        is_intersecting: true,
        top: 200.0,
    };
    skin.intersect(&[in_view]);
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));
    assert_eq!(skin.document().attr(header, "aria-hidden"), Some("true"));
    assert_eq!(skin.sticky_visibility(), Some(Visibility::Hidden));

    let views_past = IntersectionEntry {
        is_intersecting: false,
        top: -5.0,
        ..in_view
    };
    skin.intersect(&[views_past]);
    assert!(skin.document().has_class(header, "vector-sticky-header-visible"));
    skin.hook(Hook::PostEdit).unwrap();
    let heading_in_view = IntersectionEntry {
        is_intersecting: true,
        top: 10.0,
        ..past_heading(&skin)
    };
    skin.intersect(&[heading_in_view]);
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));
}

#[test]
fn disabled_header_stays_hidden_after_rebinding() {
    let mut skin = init(anonymous());
    let canonical = skin
        .document()
        .query_selector(None, "#ca-ve-edit a")
        .unwrap()
        .unwrap();
    skin.on_click(canonical, |event| event.prevent_default());
    let sticky_edit = id(&skin, "ca-ve-edit-sticky-header");
    skin.click(sticky_edit).unwrap();
    assert!(skin.sticky_header().unwrap().is_disabled());

    let heading = id(&skin, "firstHeading");
    skin.rebind_boundary(heading);
    skin.intersect(&[past_heading(&skin)]);
    let header = id(&skin, "vector-sticky-header");
    assert!(!skin.document().has_class(header, "vector-sticky-header-visible"));
    assert_eq!(skin.sticky_visibility(), Some(Visibility::Hidden));
}
