//! Sticky header assembly.
//!
//! Runs once per page. When any prerequisite is missing the header stays
//! inert and [`StickyHeader::assemble`] returns `None`.

use std::cell::Cell;
use std::rc::Rc;

use skinkit_config::StickyHeaderConfig;
use skinkit_dom::{Document, ElementId};
use tracing::{debug, info};
use url::Url;

use crate::Result;
use crate::page::{Environment, PageContext};
use crate::scroll::{ScrollObserver, init_scroll_observer};

pub const STICKY_HEADER_ID: &str = "vector-sticky-header";
pub const BOUNDARY_ID: &str = "firstHeading";
pub const USER_MENU_ID: &str = "vector-user-links-dropdown";
pub const USER_MENU_CONTAINER_ID: &str = "vector-sticky-header-user-links";
pub const VISIBLE_CLASS: &str = "vector-sticky-header-visible";
pub const TITLE_SELECTOR: &str = ".vector-sticky-header-context-bar-primary";
pub const SEARCH_TOGGLE_ID: &str = "vector-sticky-search-toggle";
pub const CANONICAL_SEARCH_SELECTOR: &str = ".search-toggle";
pub const ICON_IDS: [&str; 4] = ["ca-history", "ca-talk", "ca-subject", "ca-watch"];

const VE_EDIT_ID: &str = "ca-ve-edit";
const EDIT_ID: &str = "ca-edit";
const VIEW_SOURCE_ID: &str = "ca-viewsource";

/// Attributes whose values are ids that must follow a suffixed id.
const ID_REFERENCE_ATTRS: [&str; 3] = ["for", "aria-controls", "aria-labelledby"];

/// Static page gate, evaluated once.
pub fn is_allowed(page: &PageContext, config: &StickyHeaderConfig) -> bool {
    config.enabled
        && config.allowed_actions.iter().any(|action| *action == page.action)
        && !config.disallowed_namespaces.contains(&page.namespace)
}

#[derive(Debug, Clone)]
pub struct StickyHeader {
    header: ElementId,
    boundary: ElementId,
    user_menu: ElementId,
    user_menu_container: ElementId,
    suffix: String,
    /// Canonical user-menu markup behind the current clone.
    menu_snapshot: Option<String>,
    click_throughs: Vec<(ElementId, ElementId)>,
    forwards: Vec<(ElementId, ElementId)>,
    /// Shared with the observer callbacks built by `scroll_observer`.
    disabled: Rc<Cell<bool>>,
}

impl StickyHeader {
    pub fn assemble(
        doc: &mut Document,
        page: &PageContext,
        env: &Environment,
        config: &StickyHeaderConfig,
    ) -> Result<Option<Self>> {
        if !is_allowed(page, config) {
            info!(action = %page.action, namespace = page.namespace, "sticky header not allowed on this page");
            return Ok(None);
        }
        if !env.intersection_observer {
            info!("intersection observation unavailable; sticky header inert");
            return Ok(None);
        }
        let (Some(header), Some(boundary), Some(user_menu), Some(user_menu_container)) = (
            doc.get_element_by_id(STICKY_HEADER_ID),
            doc.get_element_by_id(BOUNDARY_ID),
            doc.get_element_by_id(USER_MENU_ID),
            doc.get_element_by_id(USER_MENU_CONTAINER_ID),
        ) else {
            info!("sticky header markup incomplete; sticky header inert");
            return Ok(None);
        };

        let mut sticky = Self {
            header,
            boundary,
            user_menu,
            user_menu_container,
            suffix: config.id_suffix.clone(),
            menu_snapshot: None,
            click_throughs: Vec::new(),
            forwards: Vec::new(),
            disabled: Rc::new(Cell::new(false)),
        };
        sticky.sync_title(doc)?;
        sticky.refresh_user_menu(doc)?;
        sticky.prepare_icons(doc)?;
        sticky.prepare_edit_icons(doc, config.tracking_param.as_deref())?;
        sticky.prepare_search(doc)?;
        hide_header(doc, header);
        info!("sticky header assembled");
        Ok(Some(sticky))
    }

    fn sticky_element(&self, doc: &Document, canonical_id: &str) -> Option<ElementId> {
        doc.get_element_by_id(&format!("{canonical_id}{}", self.suffix))
            .filter(|el| doc.contains(self.header, *el))
    }

    fn sync_title(&self, doc: &mut Document) -> Result<()> {
        if let Some(title) = doc.query_selector(Some(self.header), TITLE_SELECTOR)? {
            let text = doc.text_content(self.boundary);
            doc.set_text_content(title, text.trim());
        }
        Ok(())
    }

    /// Replaces the sticky copy of the user menu with a fresh clone.
    ///
    /// Detached nodes stay allocated in the document arena, so the clone is
    /// only rebuilt when the canonical menu's markup has changed.
    pub fn refresh_user_menu(&mut self, doc: &mut Document) -> Result<()> {
        let markup = doc.outer_html(self.user_menu);
        if self.menu_snapshot.as_deref() == Some(markup.as_str()) {
            debug!("user menu unchanged; keeping sticky clone");
            return Ok(());
        }
        for child in doc.children(self.user_menu_container) {
            doc.remove(child);
        }
        let Some(clone) = doc.deep_clone(self.user_menu) else {
            return Ok(());
        };
        for el in doc.descendants(clone) {
            suffix_identifiers(doc, el, &self.suffix);
        }
        doc.append_child(self.user_menu_container, clone)?;
        self.menu_snapshot = Some(markup);
        debug!("cloned user menu into sticky header");
        Ok(())
    }

    fn prepare_icons(&self, doc: &mut Document) -> Result<()> {
        for id in ICON_IDS {
            let Some(sticky) = self.sticky_element(doc, id) else {
                continue;
            };
            let canonical = match doc.get_element_by_id(id) {
                Some(canonical) => link_of(doc, canonical)?,
                None => None,
            };
            match canonical {
                Some(canonical) => copy_link(doc, canonical, sticky)?,
                None => {
                    debug!(id, "canonical action absent; removing sticky icon");
                    doc.remove(sticky);
                }
            }
        }
        Ok(())
    }

    fn prepare_edit_icons(&mut self, doc: &mut Document, tracking: Option<&str>) -> Result<()> {
        let sticky_ve = self.sticky_element(doc, VE_EDIT_ID);
        let sticky_edit = self.sticky_element(doc, EDIT_ID);
        let sticky_source = self.sticky_element(doc, VIEW_SOURCE_ID);

        let ve_edit = doc.get_element_by_id(VE_EDIT_ID);
        let edit = doc.get_element_by_id(EDIT_ID);
        let (primary, protected) = match (doc.get_element_by_id(VIEW_SOURCE_ID), ve_edit, edit) {
            (Some(source), _, _) => (Some(source), true),
            (None, Some(ve), _) => (Some(ve), false),
            (None, None, Some(edit)) => (Some(edit), false),
            (None, None, None) => (None, false),
        };
        let secondary = ve_edit.and(edit);

        let Some(primary) = primary else {
            debug!("page not editable; removing sticky edit icons");
            for el in [sticky_ve, sticky_edit, sticky_source].into_iter().flatten() {
                doc.remove(el);
            }
            return Ok(());
        };

        if protected {
            for el in [sticky_ve, sticky_edit].into_iter().flatten() {
                doc.remove(el);
            }
            if let (Some(sticky), Some(link)) = (sticky_source, link_of(doc, primary)?) {
                copy_link(doc, link, sticky)?;
            }
            return Ok(());
        }

        if let Some(el) = sticky_source {
            doc.remove(el);
        }
        // The primary icon is the ve-edit slot; `#ca-edit` becomes secondary
        // only when both editors exist.
        let primary_sticky = sticky_ve.or(if secondary.is_none() { sticky_edit } else { None });
        if let Some(sticky) = primary_sticky {
            self.wire_editable(doc, primary, sticky, tracking)?;
        }
        match (secondary, sticky_edit) {
            (Some(canonical), Some(sticky)) if Some(sticky) != primary_sticky => {
                self.wire_editable(doc, canonical, sticky, tracking)?;
            }
            (None, Some(sticky)) if Some(sticky) != primary_sticky => doc.remove(sticky),
            _ => {}
        }
        Ok(())
    }

    fn wire_editable(
        &mut self,
        doc: &mut Document,
        canonical: ElementId,
        sticky: ElementId,
        tracking: Option<&str>,
    ) -> Result<()> {
        let Some(link) = link_of(doc, canonical)? else {
            doc.remove(sticky);
            return Ok(());
        };
        copy_link(doc, link, sticky)?;
        if let (Some(param), Some(target)) = (tracking, link_of(doc, sticky)?) {
            if let Some(href) = doc.attr(target, "href").map(str::to_string) {
                doc.set_attr(target, "href", &with_tracking(&href, param));
            }
        }
        self.click_throughs.push((sticky, link));
        Ok(())
    }

    fn prepare_search(&mut self, doc: &mut Document) -> Result<()> {
        let Some(sticky) = doc.get_element_by_id(SEARCH_TOGGLE_ID) else {
            return Ok(());
        };
        let canonical = doc
            .query_selector_all(None, CANONICAL_SEARCH_SELECTOR)?
            .into_iter()
            .find(|el| !doc.contains(self.header, *el));
        if let Some(canonical) = canonical {
            self.forwards.push((sticky, canonical));
        }
        Ok(())
    }

    /// Scroll observer driving this header. Its show callback does nothing
    /// while the header is disabled.
    pub fn scroll_observer(&self) -> ScrollObserver {
        let header = self.header;
        let disabled = Rc::clone(&self.disabled);
        init_scroll_observer(
            move |doc: &mut Document| {
                if !disabled.get() {
                    show_header(doc, header);
                }
            },
            move |doc: &mut Document| hide_header(doc, header),
        )
    }

    pub fn show(&self, doc: &mut Document) {
        if !self.disabled.get() {
            show_header(doc, self.header);
        }
    }

    pub fn hide(&self, doc: &mut Document) {
        hide_header(doc, self.header);
    }

    /// Hides the header until [`enable`](Self::enable) is called.
    pub fn disable(&mut self, doc: &mut Document) {
        self.disabled.set(true);
        hide_header(doc, self.header);
    }

    pub fn enable(&mut self) {
        self.disabled.set(false);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    pub fn is_visible(&self, doc: &Document) -> bool {
        doc.has_class(self.header, VISIBLE_CLASS)
    }

    pub fn header(&self) -> ElementId {
        self.header
    }

    pub fn boundary(&self) -> ElementId {
        self.boundary
    }

    pub fn user_menu(&self) -> ElementId {
        self.user_menu
    }

    /// `(sticky, canonical)` pairs for editable icons.
    pub fn click_throughs(&self) -> &[(ElementId, ElementId)] {
        &self.click_throughs
    }

    /// `(sticky, canonical)` pairs that only forward clicks.
    pub fn forwards(&self) -> &[(ElementId, ElementId)] {
        &self.forwards
    }
}

fn show_header(doc: &mut Document, header: ElementId) {
    doc.add_class(header, VISIBLE_CLASS);
    doc.set_attr(header, "aria-hidden", "false");
}

fn hide_header(doc: &mut Document, header: ElementId) {
    doc.remove_class(header, VISIBLE_CLASS);
    doc.set_attr(header, "aria-hidden", "true");
}

/// The element itself when it is a link, else its first link.
fn link_of(doc: &Document, el: ElementId) -> Result<Option<ElementId>> {
    if doc.tag_name(el) == Some("a") {
        return Ok(Some(el));
    }
    Ok(doc.query_selector(Some(el), "a")?)
}

fn copy_link(doc: &mut Document, canonical: ElementId, sticky: ElementId) -> Result<()> {
    let Some(target) = link_of(doc, sticky)? else {
        return Ok(());
    };
    for name in ["href", "title"] {
        match doc.attr(canonical, name).map(str::to_string) {
            Some(value) => doc.set_attr(target, name, &value),
            None => {
                doc.remove_attr(target, name);
            }
        }
    }
    Ok(())
}

fn suffix_identifiers(doc: &mut Document, el: ElementId, suffix: &str) {
    for name in ["id", "data-event-name"] {
        if let Some(value) = doc.attr(el, name).filter(|v| !v.is_empty()) {
            let renamed = format!("{value}{suffix}");
            doc.set_attr(el, name, &renamed);
        }
    }
    for name in ID_REFERENCE_ATTRS {
        if let Some(value) = doc.attr(el, name) {
            let renamed = value
                .split_whitespace()
                .map(|token| format!("{token}{suffix}"))
                .collect::<Vec<_>>()
                .join(" ");
            doc.set_attr(el, name, &renamed);
        }
    }
}

/// Appends a `key=value` parameter to `href`, keeping relative links relative.
fn with_tracking(href: &str, param: &str) -> String {
    let (key, value) = param.split_once('=').unwrap_or((param, ""));
    if let Ok(mut url) = Url::parse(href) {
        url.query_pairs_mut().append_pair(key, value);
        return url.into();
    }
    let (base, fragment) = match href.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (href, None),
    };
    let separator = match base.find('?') {
        Some(index) if index + 1 == base.len() => "",
        Some(_) => "&",
        None => "?",
    };
    let mut out = format!("{base}{separator}{param}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
