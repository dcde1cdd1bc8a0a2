//! Class-name adapters.
//!
//! State lives in the document as marker classes. Everything that reads or
//! writes those classes goes through [`MarkerState`], which keeps paired
//! classes mutually exclusive.

use skinkit_dom::{Document, ElementId};

/// Typed view over a set of mutually exclusive marker classes on one element.
pub trait MarkerState {
    type Value;

    /// Current value, or `None` when no marker class is present.
    fn read(&self, doc: &Document, el: ElementId) -> Option<Self::Value>;

    /// Replaces whichever marker is present with the one for `value`.
    fn write(&self, doc: &mut Document, el: ElementId, value: &Self::Value);
}

/// A pair of classes standing for `true` / `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMarker {
    on: String,
    off: String,
}

impl BinaryMarker {
    pub fn new(on: impl Into<String>, off: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            off: off.into(),
        }
    }

    /// `{name}-enabled` / `{name}-disabled`
    pub fn feature(name: &str) -> Self {
        Self::new(format!("{name}-enabled"), format!("{name}-disabled"))
    }

    /// `{name}-pinned` / `{name}-unpinned`
    pub fn pinned(name: &str) -> Self {
        Self::new(format!("{name}-pinned"), format!("{name}-unpinned"))
    }

    pub fn on(&self) -> &str {
        &self.on
    }

    pub fn off(&self) -> &str {
        &self.off
    }
}

impl MarkerState for BinaryMarker {
    type Value = bool;

    fn read(&self, doc: &Document, el: ElementId) -> Option<bool> {
        if doc.has_class(el, &self.on) {
            Some(true)
        } else if doc.has_class(el, &self.off) {
            Some(false)
        } else {
            None
        }
    }

    fn write(&self, doc: &mut Document, el: ElementId, value: &bool) {
        doc.toggle_class(el, &self.on, Some(*value));
        doc.toggle_class(el, &self.off, Some(!*value));
    }
}

/// `{name}-clientpref-{value}` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPrefMarker {
    prefix: String,
}

impl ClientPrefMarker {
    pub fn new(name: &str) -> Self {
        Self {
            prefix: format!("{name}-clientpref-"),
        }
    }

    pub fn class_for(&self, value: &str) -> String {
        format!("{}{value}", self.prefix)
    }
}

impl MarkerState for ClientPrefMarker {
    type Value = String;

    fn read(&self, doc: &Document, el: ElementId) -> Option<String> {
        doc.classes(el)
            .into_iter()
            .find_map(|class| class.strip_prefix(self.prefix.as_str()))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn write(&self, doc: &mut Document, el: ElementId, value: &String) {
        let stale: Vec<String> = doc
            .classes(el)
            .into_iter()
            .filter(|class| class.starts_with(self.prefix.as_str()))
            .map(str::to_string)
            .collect();
        for class in stale {
            doc.remove_class(el, &class);
        }
        doc.add_class(el, &self.class_for(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(classes: &str) -> (Document, ElementId) {
        let doc = Document::parse(&format!("<html class=\"{classes}\"><body></body></html>"));
        let root = doc.root().unwrap();
        (doc, root)
    }

    #[test]
    fn binary_marker_keeps_pair_exclusive() {
        let (mut doc, root) = doc("toc-pinned other");
        let marker = BinaryMarker::pinned("toc");
        assert_eq!(marker.read(&doc, root), Some(true));
        marker.write(&mut doc, root, &false);
        assert_eq!(doc.classes(root), vec!["other", "toc-unpinned"]);
        marker.write(&mut doc, root, &false);
        assert_eq!(doc.classes(root), vec!["other", "toc-unpinned"]);
    }

    #[test]
    fn binary_marker_unknown_when_absent() {
        let (doc, root) = doc("unrelated");
        assert_eq!(BinaryMarker::feature("limited-width").read(&doc, root), None);
    }

    #[test]
    fn client_pref_marker_replaces_every_stale_value() {
        let (mut doc, root) = doc("font-clientpref-0 font-clientpref-2 x");
        let marker = ClientPrefMarker::new("font");
        assert_eq!(marker.read(&doc, root).as_deref(), Some("0"));
        marker.write(&mut doc, root, &"1".to_string());
        assert_eq!(doc.classes(root), vec!["x", "font-clientpref-1"]);
    }

    #[test]
    fn client_pref_prefix_does_not_match_longer_names() {
        let (doc, root) = doc("font-size-clientpref-1");
        assert_eq!(ClientPrefMarker::new("font").read(&doc, root), None);
    }
}
