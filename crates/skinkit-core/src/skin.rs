//! Page runtime.
//!
//! [`Skin`] owns the document and every controller. Host input (clicks,
//! keys, intersection entries, scroll offsets, resizes, hooks) enters here,
//! is applied synchronously, and leaves a trail of [`SkinEvent`]s.

use skinkit_config::SkinConfig;
use skinkit_dom::{Document, ElementId};
use tracing::{debug, info};

use crate::bindings::{Binding, Bindings, ClickEvent};
use crate::client_prefs::{ClientPreferences, PreferenceGroup};
use crate::features::FeatureToggle;
use crate::hooks::{Hook, SkinEvent};
use crate::markers::{ClientPrefMarker, MarkerState};
use crate::page::{Environment, PageContext};
use crate::pinnable::{PinState, PinnableController};
use crate::prefs::PreferenceStore;
use crate::scroll::{
    DirectionObserver, IntersectionEntry, ScrollObserver, SectionTracker, Visibility,
};
use crate::sticky::{self, StickyHeader};
use crate::{Result, SkinError};

pub const FEATURE_TOGGLE_SELECTOR: &str = "[data-feature-toggle]";
pub const CLIENT_PREF_INPUT_SELECTOR: &str = "input[data-client-pref]";

/// What the host should do after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing bound; no link to follow.
    Unhandled,
    Handled,
    /// Follow this link.
    Navigate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Other,
}

pub struct Skin {
    doc: Document,
    config: SkinConfig,
    env: Environment,
    features: FeatureToggle,
    pinnables: PinnableController,
    bindings: Bindings,
    sticky: Option<StickyHeader>,
    observer: Option<ScrollObserver>,
    direction: DirectionObserver,
    sections: SectionTracker,
    narrow: Option<bool>,
    events: Vec<SkinEvent>,
}

impl Skin {
    /// Enhances `doc`: restores anonymous client preferences, binds every
    /// declared control and assembles the sticky header when allowed.
    pub fn init(
        mut doc: Document,
        config: SkinConfig,
        page: &PageContext,
        env: Environment,
        prefs: PreferenceStore,
    ) -> Result<Self> {
        if doc.root().is_none() {
            return Err(SkinError::MissingRoot);
        }
        let client_prefs = ClientPreferences::new(&config);
        if !prefs.is_registered() {
            let restored = client_prefs.restore(prefs.local(), &mut doc);
            debug!(restored, "restored client preferences");
        }
        let features = FeatureToggle::new(prefs, client_prefs);
        let pinnables = PinnableController::discover(&doc)?;
        let sticky = StickyHeader::assemble(&mut doc, page, &env, &config.sticky_header)?;
        let observer = sticky.as_ref().map(|sticky| {
            let mut observer = sticky.scroll_observer();
            observer.observe(&mut doc, sticky.boundary());
            observer
        });

        let mut skin = Self {
            doc,
            direction: DirectionObserver::new(config.scroll.direction_threshold),
            sections: SectionTracker::new(0.0),
            config,
            env,
            features,
            pinnables,
            bindings: Bindings::new(),
            sticky,
            observer,
            narrow: None,
            events: Vec::new(),
        };
        skin.rebind_controls()?;
        info!(
            panels = skin.pinnables.panels().len(),
            bindings = skin.bindings.len(),
            sticky = skin.sticky.is_some(),
            "skin initialized"
        );
        Ok(skin)
    }

    /// Rebuilds every binding from the current markup.
    pub fn rebind_controls(&mut self) -> Result<()> {
        self.bindings.unbind_where(|_| true);
        for (index, panel) in self.pinnables.panels().iter().enumerate() {
            if let Some(button) = panel.pin_button {
                self.bindings.bind(button, Binding::Pin(index));
            }
            if let Some(button) = panel.unpin_button {
                self.bindings.bind(button, Binding::Unpin(index));
            }
        }
        for el in self.doc.query_selector_all(None, FEATURE_TOGGLE_SELECTOR)? {
            if let Some(name) = self.doc.data(el, "feature-toggle").filter(|n| !n.is_empty()) {
                self.bindings.bind(el, Binding::FeatureToggle(name.to_string()));
            }
        }
        for el in self.doc.query_selector_all(None, CLIENT_PREF_INPUT_SELECTOR)? {
            let feature = self.doc.data(el, "client-pref");
            let value = self.doc.attr(el, "value");
            if let (Some(feature), Some(value)) = (feature, value) {
                let binding = Binding::ClientPref {
                    feature: feature.to_string(),
                    value: value.to_string(),
                };
                self.bindings.bind(el, binding);
            }
        }
        if let Some(sticky) = &self.sticky {
            for &(el, canonical) in sticky.click_throughs() {
                self.bindings.bind(el, Binding::ClickThrough { canonical });
            }
            for &(el, canonical) in sticky.forwards() {
                self.bindings.bind(el, Binding::Forward { canonical });
            }
        }
        self.sync_client_pref_inputs()?;
        Ok(())
    }

    fn path(&self, el: ElementId) -> Vec<ElementId> {
        std::iter::successors(Some(el), |current| self.doc.parent(*current)).collect()
    }

    fn bubble(&mut self, el: ElementId, event: &mut ClickEvent) {
        for node in self.path(el) {
            self.bindings.dispatch(node, event);
        }
    }

    fn link_href(&self, el: ElementId) -> Result<Option<String>> {
        let link = self.doc.closest(el, "a[href]")?;
        Ok(link.and_then(|link| self.doc.attr(link, "href").map(str::to_string)))
    }

    /// Delivers a click on `el`. Listeners run along the ancestor path, then
    /// the nearest bound element handles it.
    pub fn click(&mut self, el: ElementId) -> Result<ClickOutcome> {
        let mut event = ClickEvent::new(el);
        self.bubble(el, &mut event);
        let binding = self
            .path(el)
            .into_iter()
            .find_map(|node| self.bindings.get(node).cloned());

        let Some(binding) = binding else {
            if event.is_default_prevented() {
                return Ok(ClickOutcome::Handled);
            }
            return Ok(match self.link_href(el)? {
                Some(href) => ClickOutcome::Navigate(href),
                None => ClickOutcome::Unhandled,
            });
        };

        debug!(?el, ?binding, "click");
        match binding {
            Binding::Pin(index) => self.set_pin(index, PinState::Pinned)?,
            Binding::Unpin(index) => self.set_pin(index, PinState::Unpinned)?,
            Binding::FeatureToggle(name) => {
                self.toggle_feature(&name)?;
            }
            Binding::ClientPref { feature, value } => self.select_client_pref(&feature, &value)?,
            Binding::ClickThrough { canonical } => {
                let mut forwarded = ClickEvent::new(canonical);
                self.bubble(canonical, &mut forwarded);
                if forwarded.is_default_prevented() || event.is_default_prevented() {
                    self.disable_sticky_header();
                    return Ok(ClickOutcome::Handled);
                }
                return Ok(match self.link_href(el)? {
                    Some(href) => ClickOutcome::Navigate(href),
                    None => ClickOutcome::Handled,
                });
            }
            Binding::Forward { canonical } => return self.click(canonical),
        }
        Ok(ClickOutcome::Handled)
    }

    /// Enter and Space activate bound elements exactly like a click.
    pub fn activate_key(&mut self, el: ElementId, key: Key) -> Result<ClickOutcome> {
        if key == Key::Other {
            return Ok(ClickOutcome::Unhandled);
        }
        let bound = self
            .path(el)
            .into_iter()
            .any(|node| self.bindings.get(node).is_some());
        if !bound {
            return Ok(ClickOutcome::Unhandled);
        }
        self.click(el)
    }

    /// Registers an external click listener.
    pub fn on_click(&mut self, el: ElementId, handler: impl FnMut(&mut ClickEvent) + 'static) {
        self.bindings.listen(el, handler);
    }

    fn set_pin(&mut self, index: usize, state: PinState) -> Result<()> {
        let changed = self
            .pinnables
            .set_state(index, &mut self.doc, &mut self.features, state)?;
        if let (Some(state), Some(panel)) = (changed, self.pinnables.panels().get(index)) {
            self.events.push(SkinEvent::PinStateChanged {
                name: panel.name.clone(),
                state,
            });
        }
        Ok(())
    }

    fn disable_sticky_header(&mut self) {
        let Some(sticky) = &mut self.sticky else {
            return;
        };
        if sticky.is_disabled() {
            return;
        }
        sticky.disable(&mut self.doc);
        if let Some(observer) = &mut self.observer {
            observer.unobserve(&mut self.doc);
        }
        info!("canonical control intercepted sticky click; sticky header disabled");
        self.events.push(SkinEvent::StickyHeaderDisabled);
    }

    pub fn toggle_feature(&mut self, name: &str) -> Result<bool> {
        let enabled = self.features.toggle(&mut self.doc, name)?;
        let state = self.features.state(&self.doc, name)?;
        self.events.push(SkinEvent::FeatureChanged {
            name: name.to_string(),
            state,
        });
        self.sync_client_pref_inputs()?;
        Ok(enabled)
    }

    pub fn select_client_pref(&mut self, feature: &str, value: &str) -> Result<()> {
        self.features.select(&mut self.doc, feature, value)?;
        let state = self.features.state(&self.doc, feature)?;
        self.events.push(SkinEvent::FeatureChanged {
            name: feature.to_string(),
            state,
        });
        self.sync_client_pref_inputs()
    }

    fn sync_client_pref_inputs(&mut self) -> Result<()> {
        let Some(root) = self.doc.root() else {
            return Ok(());
        };
        for input in self.doc.query_selector_all(None, CLIENT_PREF_INPUT_SELECTOR)? {
            let (Some(feature), Some(value)) =
                (self.doc.data(input, "client-pref"), self.doc.attr(input, "value"))
            else {
                continue;
            };
            let checked = ClientPrefMarker::new(feature).read(&self.doc, root).as_deref() == Some(value);
            if checked {
                self.doc.set_attr(input, "checked", "checked");
            } else {
                self.doc.remove_attr(input, "checked");
            }
        }
        Ok(())
    }

    /// Feeds intersection entries to the sticky header observer.
    pub fn intersect(&mut self, entries: &[IntersectionEntry]) {
        let Some(observer) = &mut self.observer else {
            return;
        };
        if let Some(direction) = observer.handle(&mut self.doc, entries) {
            self.events.push(SkinEvent::PageTitleScroll(direction));
        }
    }

    /// Reports the page scroll offset.
    pub fn scroll_to(&mut self, y: f64) {
        if !self.env.intersection_observer {
            return;
        }
        if let Some(direction) = self.direction.scrolled_to(y) {
            self.events.push(SkinEvent::ScrollDirectionChanged(direction));
        }
    }

    /// Reports section heading tops for table-of-contents highlighting.
    pub fn update_sections(&mut self, tops: &[(String, f64)]) {
        if !self.env.intersection_observer {
            return;
        }
        if self.sections.update(&mut self.doc, tops) {
            let active = self.sections.active().map(str::to_string);
            self.events.push(SkinEvent::ActiveSectionChanged(active));
        }
    }

    /// Reports the viewport width. Crossing the narrow breakpoint suspends
    /// or restores pinned relocatable panels.
    pub fn resize(&mut self, width: u32) -> Result<()> {
        let breakpoint = self.config.pinning.narrow_breakpoint;
        let narrow = breakpoint > 0 && width < breakpoint;
        if self.narrow == Some(narrow) {
            return Ok(());
        }
        self.narrow = Some(narrow);
        let changed = self
            .pinnables
            .set_narrow(&mut self.doc, &mut self.features, narrow)?;
        for (name, state) in changed {
            self.events.push(SkinEvent::PinStateChanged { name, state });
        }
        Ok(())
    }

    pub fn hook(&mut self, hook: Hook) -> Result<()> {
        let Some(sticky) = &mut self.sticky else {
            return Ok(());
        };
        match hook {
            Hook::EditorActivated => {
                sticky.disable(&mut self.doc);
                if let Some(observer) = &mut self.observer {
                    observer.unobserve(&mut self.doc);
                }
                debug!("editor active; sticky header hidden");
            }
            Hook::EditorDeactivated | Hook::PostEdit => {
                sticky.enable();
                let boundary = self
                    .doc
                    .get_element_by_id(sticky::BOUNDARY_ID)
                    .unwrap_or(sticky.boundary());
                if let Some(observer) = &mut self.observer {
                    observer.observe(&mut self.doc, boundary);
                }
            }
            Hook::PortletLinkAdded { link } => {
                if self.doc.contains(sticky.user_menu(), link) {
                    sticky.refresh_user_menu(&mut self.doc)?;
                }
            }
        }
        Ok(())
    }

    /// Moves scroll observation to `boundary`. Ignored while the sticky
    /// header is disabled; re-enabling observes the heading again.
    pub fn rebind_boundary(&mut self, boundary: ElementId) {
        if self.sticky.as_ref().is_some_and(StickyHeader::is_disabled) {
            debug!(?boundary, "sticky header disabled; not rebinding");
            return;
        }
        if let Some(observer) = &mut self.observer {
            observer.observe(&mut self.doc, boundary);
        }
    }

    pub fn take_events(&mut self) -> Vec<SkinEvent> {
        std::mem::take(&mut self.events)
    }

    /// Blocks until queued remote preference saves are written.
    pub fn flush_preferences(&self) {
        self.features.preferences().flush();
    }

    pub fn client_pref_menu(&self) -> Vec<PreferenceGroup> {
        self.features.client_prefs().menu(&self.doc)
    }

    pub fn sticky_visibility(&self) -> Option<Visibility> {
        self.observer.as_ref().map(ScrollObserver::state)
    }

    pub fn sticky_header(&self) -> Option<&StickyHeader> {
        self.sticky.as_ref()
    }

    pub fn pinnables(&self) -> &PinnableController {
        &self.pinnables
    }

    pub fn features(&self) -> &FeatureToggle {
        &self.features
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn config(&self) -> &SkinConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }
}
