//! Pinnable panels.
//!
//! Each `.vector-pinnable-header` in the markup is a two-state machine.
//! Transitions update the header marker, the root marker (directly or via a
//! feature) and, when the panel declares all three relocation ids, move the
//! panel between its pinned and unpinned containers.

use skinkit_dom::{Document, ElementId};
use tracing::{debug, info};

use crate::features::FeatureToggle;
use crate::markers::{BinaryMarker, MarkerState};
use crate::{Result, SkinError};

pub const PINNABLE_HEADER_SELECTOR: &str = ".vector-pinnable-header";
pub const PINNED_HEADER_CLASS: &str = "vector-pinnable-header-pinned";
pub const UNPINNED_HEADER_CLASS: &str = "vector-pinnable-header-unpinned";
pub const PIN_BUTTON_SELECTOR: &str = ".vector-pinnable-header-pin-button";
pub const UNPIN_BUTTON_SELECTOR: &str = ".vector-pinnable-header-unpin-button";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Pinned,
    Unpinned,
}

impl PinState {
    pub fn is_pinned(self) -> bool {
        self == PinState::Pinned
    }

    fn from_pinned(pinned: bool) -> Self {
        if pinned {
            PinState::Pinned
        } else {
            PinState::Unpinned
        }
    }
}

/// Where a relocatable panel lives in each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub element_id: String,
    pub pinned_container_id: String,
    pub unpinned_container_id: String,
}

impl Relocation {
    fn container_for(&self, state: PinState) -> &str {
        match state {
            PinState::Pinned => &self.pinned_container_id,
            PinState::Unpinned => &self.unpinned_container_id,
        }
    }
}

/// One bound header.
#[derive(Debug, Clone)]
pub struct PinnableHeader {
    pub name: String,
    pub header: ElementId,
    pub pin_button: Option<ElementId>,
    pub unpin_button: Option<ElementId>,
    pub feature_name: Option<String>,
    pub relocation: Option<Relocation>,
    /// The user's choice. Differs from the displayed state while suspended.
    saved: PinState,
    suspended: bool,
}

fn header_marker() -> BinaryMarker {
    BinaryMarker::new(PINNED_HEADER_CLASS, UNPINNED_HEADER_CLASS)
}

impl PinnableHeader {
    /// Reads a header's declaration. `None` when it has no `data-name`.
    pub fn from_markup(doc: &Document, header: ElementId) -> Result<Option<Self>> {
        let Some(name) = doc.data(header, "name").filter(|name| !name.is_empty()) else {
            return Ok(None);
        };
        let relocation = match (
            doc.data(header, "pinnable-element-id"),
            doc.data(header, "pinned-container-id"),
            doc.data(header, "unpinned-container-id"),
        ) {
            (Some(element), Some(pinned), Some(unpinned)) => Some(Relocation {
                element_id: element.to_string(),
                pinned_container_id: pinned.to_string(),
                unpinned_container_id: unpinned.to_string(),
            }),
            _ => None,
        };
        let mut panel = Self {
            name: name.to_string(),
            header,
            pin_button: doc.query_selector(Some(header), PIN_BUTTON_SELECTOR)?,
            unpin_button: doc.query_selector(Some(header), UNPIN_BUTTON_SELECTOR)?,
            feature_name: doc
                .data(header, "feature-name")
                .filter(|feature| !feature.is_empty())
                .map(str::to_string),
            relocation,
            saved: PinState::Unpinned,
            suspended: false,
        };
        panel.saved = panel.state(doc);
        Ok(Some(panel))
    }

    /// Displayed state, read from the header marker.
    pub fn state(&self, doc: &Document) -> PinState {
        PinState::from_pinned(header_marker().read(doc, self.header).unwrap_or(false))
    }

    pub fn saved_state(&self) -> PinState {
        self.saved
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn display(
        &self,
        doc: &mut Document,
        features: &mut FeatureToggle,
        target: PinState,
        persist: bool,
    ) -> Result<()> {
        let pinned = target.is_pinned();
        let root = doc.root().ok_or(SkinError::MissingRoot)?;
        match &self.feature_name {
            Some(feature) if persist => {
                features.set_enabled(doc, feature, pinned)?;
            }
            Some(feature) => {
                features.toggle_doc_classes(doc, feature, Some(pinned))?;
            }
            None => BinaryMarker::pinned(&self.name).write(doc, root, &pinned),
        }
        header_marker().write(doc, self.header, &pinned);
        if let Some(relocation) = &self.relocation {
            relocate(doc, relocation, target)?;
        }
        Ok(())
    }
}

fn relocate(doc: &mut Document, relocation: &Relocation, target: PinState) -> Result<()> {
    let destination_id = relocation.container_for(target);
    let (Some(element), Some(container)) = (
        doc.get_element_by_id(&relocation.element_id),
        doc.get_element_by_id(destination_id),
    ) else {
        debug!(element = %relocation.element_id, container = destination_id, "relocation target missing");
        return Ok(());
    };
    if doc.parent(element) != Some(container) {
        doc.append_child(container, element)?;
        debug!(element = %relocation.element_id, container = destination_id, "relocated panel");
    }
    Ok(())
}

/// Every pinnable header on the page.
#[derive(Debug, Default)]
pub struct PinnableController {
    panels: Vec<PinnableHeader>,
}

impl PinnableController {
    /// Scans the document once. Headers without a name are skipped.
    pub fn discover(doc: &Document) -> Result<Self> {
        let mut panels = Vec::new();
        for header in doc.query_selector_all(None, PINNABLE_HEADER_SELECTOR)? {
            match PinnableHeader::from_markup(doc, header)? {
                Some(panel) => panels.push(panel),
                None => debug!(?header, "skipping pinnable header without a name"),
            }
        }
        info!(count = panels.len(), "bound pinnable headers");
        Ok(Self { panels })
    }

    pub fn panels(&self) -> &[PinnableHeader] {
        &self.panels
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.panels.iter().position(|panel| panel.name == name)
    }

    pub fn panel(&self, name: &str) -> Option<&PinnableHeader> {
        self.find(name).map(|index| &self.panels[index])
    }

    /// User transition of panel `index`. Returns the new state when the
    /// header actually changed.
    pub fn set_state(
        &mut self,
        index: usize,
        doc: &mut Document,
        features: &mut FeatureToggle,
        target: PinState,
    ) -> Result<Option<PinState>> {
        let Some(panel) = self.panels.get_mut(index) else {
            return Ok(None);
        };
        let previous = panel.state(doc);
        panel.display(doc, features, target, true)?;
        panel.saved = target;
        panel.suspended = false;
        let focus = match target {
            PinState::Pinned => panel.unpin_button,
            PinState::Unpinned => panel.pin_button,
        };
        if let Some(button) = focus {
            doc.focus(button);
        }
        if previous == target {
            return Ok(None);
        }
        debug!(name = %panel.name, state = ?target, "pin state changed");
        Ok(Some(target))
    }

    /// Shows relocatable panels the user pinned as unpinned while `narrow`,
    /// and restores them afterwards. Nothing is persisted.
    pub fn set_narrow(
        &mut self,
        doc: &mut Document,
        features: &mut FeatureToggle,
        narrow: bool,
    ) -> Result<Vec<(String, PinState)>> {
        let mut changed = Vec::new();
        for panel in &mut self.panels {
            if panel.relocation.is_none() || !panel.saved.is_pinned() {
                continue;
            }
            if narrow == panel.suspended {
                continue;
            }
            let target = if narrow {
                PinState::Unpinned
            } else {
                panel.saved
            };
            panel.display(doc, features, target, false)?;
            panel.suspended = narrow;
            debug!(name = %panel.name, narrow, "adjusted panel for viewport");
            changed.push((panel.name.clone(), target));
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_prefs::ClientPreferences;
    use crate::prefs::PreferenceStore;
    use crate::store::MemoryStore;
    use skinkit_config::SkinConfig;

    const PAGE: &str = r#"<html class="simple-unpinned movable-unpinned"><body>
        <div class="vector-pinnable-header vector-pinnable-header-unpinned" data-name="simple">
          <button class="vector-pinnable-header-pin-button" id="simple-pin">pin</button>
          <button class="vector-pinnable-header-unpin-button" id="simple-unpin">unpin</button>
        </div>
        <div class="vector-pinnable-header">decorative</div>
        <div id="pinned-container"></div>
        <div id="unpinned-container">
          <div id="movable">
            <div class="vector-pinnable-header vector-pinnable-header-unpinned" data-name="movable"
                 data-pinnable-element-id="movable"
                 data-pinned-container-id="pinned-container"
                 data-unpinned-container-id="unpinned-container">
              <button class="vector-pinnable-header-pin-button">pin</button>
              <button class="vector-pinnable-header-unpin-button">unpin</button>
            </div>
          </div>
        </div>
    </body></html>"#;

    fn features() -> FeatureToggle {
        FeatureToggle::new(
            PreferenceStore::anonymous(Box::new(MemoryStore::new()), "prefs"),
            ClientPreferences::new(&SkinConfig::default()),
        )
    }

    fn parent_id(doc: &Document, id: &str) -> String {
        let el = doc.get_element_by_id(id).unwrap();
        doc.id_of(doc.parent(el).unwrap()).unwrap().to_string()
    }

    #[test]
    fn discovery_skips_nameless_headers() {
        let doc = Document::parse(PAGE);
        let controller = PinnableController::discover(&doc).unwrap();
        let names: Vec<&str> = controller.panels().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["simple", "movable"]);
        assert!(controller.panel("simple").unwrap().relocation.is_none());
        assert!(controller.panel("movable").unwrap().relocation.is_some());
    }

    #[test]
    fn partial_relocation_ids_mean_no_relocation() {
        let doc = Document::parse(
            r#"<html><body><div class="vector-pinnable-header" data-name="p"
                data-pinnable-element-id="x" data-pinned-container-id="y"></div></body></html>"#,
        );
        let controller = PinnableController::discover(&doc).unwrap();
        assert!(controller.panel("p").unwrap().relocation.is_none());
    }

    #[test]
    fn simple_panel_toggles_header_and_root() {
        let mut doc = Document::parse(PAGE);
        let mut features = features();
        let mut controller = PinnableController::discover(&doc).unwrap();
        let index = controller.find("simple").unwrap();
        let root = doc.root().unwrap();

        let changed = controller
            .set_state(index, &mut doc, &mut features, PinState::Pinned)
            .unwrap();
        assert_eq!(changed, Some(PinState::Pinned));
        let header = controller.panels()[index].header;
        assert!(doc.has_class(header, PINNED_HEADER_CLASS));
        assert!(!doc.has_class(header, UNPINNED_HEADER_CLASS));
        assert!(doc.has_class(root, "simple-pinned"));
        assert!(!doc.has_class(root, "simple-unpinned"));
        assert_eq!(doc.focused(), doc.get_element_by_id("simple-unpin"));

        controller
            .set_state(index, &mut doc, &mut features, PinState::Unpinned)
            .unwrap();
        assert!(doc.has_class(header, UNPINNED_HEADER_CLASS));
        assert!(doc.has_class(root, "simple-unpinned"));
        assert!(!doc.has_class(root, "simple-pinned"));
        assert!(doc.has_class(root, "movable-unpinned"));
        assert_eq!(doc.focused(), doc.get_element_by_id("simple-pin"));
    }

    #[test]
    fn relocation_is_idempotent() {
        let mut doc = Document::parse(PAGE);
        let mut features = features();
        let mut controller = PinnableController::discover(&doc).unwrap();
        let index = controller.find("movable").unwrap();

        for _ in 0..2 {
            controller
                .set_state(index, &mut doc, &mut features, PinState::Pinned)
                .unwrap();
            assert_eq!(parent_id(&doc, "movable"), "pinned-container");
        }
        let pinned = doc.get_element_by_id("pinned-container").unwrap();
        assert_eq!(doc.children(pinned).len(), 1);

        let repeat = controller
            .set_state(index, &mut doc, &mut features, PinState::Unpinned)
            .unwrap();
        assert_eq!(repeat, Some(PinState::Unpinned));
        assert_eq!(parent_id(&doc, "movable"), "unpinned-container");
        assert!(doc.children(pinned).is_empty());
    }

    #[test]
    fn narrow_viewport_suspends_pinned_panels() {
        let mut doc = Document::parse(PAGE);
        let mut features = features();
        let mut controller = PinnableController::discover(&doc).unwrap();
        let movable = controller.find("movable").unwrap();
        let simple = controller.find("simple").unwrap();
        controller
            .set_state(movable, &mut doc, &mut features, PinState::Pinned)
            .unwrap();
        controller
            .set_state(simple, &mut doc, &mut features, PinState::Pinned)
            .unwrap();

        let changed = controller.set_narrow(&mut doc, &mut features, true).unwrap();
        assert_eq!(changed, vec![("movable".to_string(), PinState::Unpinned)]);
        assert_eq!(parent_id(&doc, "movable"), "unpinned-container");
        let panel = &controller.panels()[movable];
        assert_eq!(panel.state(&doc), PinState::Unpinned);
        assert_eq!(panel.saved_state(), PinState::Pinned);
        assert!(controller.set_narrow(&mut doc, &mut features, true).unwrap().is_empty());

        controller.set_narrow(&mut doc, &mut features, false).unwrap();
        assert_eq!(parent_id(&doc, "movable"), "pinned-container");
        assert_eq!(controller.panels()[movable].state(&doc), PinState::Pinned);
    }

    #[test]
    fn feature_backed_panel_delegates_root_classes() {
        let mut doc = Document::parse(
            r#"<html class="vector-feature-toc-pinned-clientpref-0"><body>
                <div class="vector-pinnable-header vector-pinnable-header-unpinned"
                     data-name="vector-toc" data-feature-name="vector-feature-toc-pinned">
                  <button class="vector-pinnable-header-pin-button">pin</button>
                </div></body></html>"#,
        );
        let mut features = features();
        let mut controller = PinnableController::discover(&doc).unwrap();
        controller
            .set_state(0, &mut doc, &mut features, PinState::Pinned)
            .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.classes(root), vec!["vector-feature-toc-pinned-clientpref-1"]);
        assert!(!doc.has_class(root, "vector-toc-pinned"));
    }

    #[test]
    fn unknown_feature_on_panel_is_an_error() {
        let mut doc = Document::parse(
            r#"<html><body><div class="vector-pinnable-header" data-name="p"
                 data-feature-name="nope"></div></body></html>"#,
        );
        let mut features = features();
        let mut controller = PinnableController::discover(&doc).unwrap();
        assert!(matches!(
            controller.set_state(0, &mut doc, &mut features, PinState::Pinned),
            Err(SkinError::UnknownFeature(name)) if name == "nope"
        ));
    }
}
