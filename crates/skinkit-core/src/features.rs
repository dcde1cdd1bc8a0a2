//! Named features backed by root marker classes.

use skinkit_dom::{Document, ElementId};
use tracing::debug;

use crate::client_prefs::ClientPreferences;
use crate::markers::{BinaryMarker, ClientPrefMarker, MarkerState};
use crate::prefs::PreferenceStore;
use crate::{Result, SkinError};

const BINARY_OPTIONS: [&str; 2] = ["0", "1"];

/// Current value of a feature as read from the root classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureState {
    /// `{name}-enabled` / `{name}-disabled`
    Binary(bool),
    /// `{name}-clientpref-{value}`
    ClientPref(String),
}

impl FeatureState {
    /// Boolean view. Any client preference other than `0` counts as enabled.
    pub fn is_enabled(&self) -> bool {
        match self {
            FeatureState::Binary(enabled) => *enabled,
            FeatureState::ClientPref(value) => value != "0",
        }
    }

    /// The value handed to persistence.
    pub fn persisted_value(&self) -> &str {
        match self {
            FeatureState::Binary(true) => "1",
            FeatureState::Binary(false) => "0",
            FeatureState::ClientPref(value) => value,
        }
    }
}

/// Reads, flips and persists features.
///
/// The root classes are updated first and synchronously; persistence
/// follows and never fails the call.
pub struct FeatureToggle {
    prefs: PreferenceStore,
    client_prefs: ClientPreferences,
}

impl FeatureToggle {
    pub fn new(prefs: PreferenceStore, client_prefs: ClientPreferences) -> Self {
        Self { prefs, client_prefs }
    }

    /// Current state of `name`. Client preference classes win over binary
    /// ones; a name with neither is an unknown feature.
    pub fn state(&self, doc: &Document, name: &str) -> Result<FeatureState> {
        let root = doc.root().ok_or(SkinError::MissingRoot)?;
        read_state(doc, root, name).ok_or_else(|| SkinError::UnknownFeature(name.to_string()))
    }

    pub fn is_enabled(&self, doc: &Document, name: &str) -> bool {
        self.state(doc, name)
            .map(|state| state.is_enabled())
            .unwrap_or(false)
    }

    /// Updates the root classes without persisting.
    ///
    /// `None` flips a binary feature or rotates a client preference through
    /// its options. `Some(force)` sets the feature on or off; forcing the
    /// current state leaves the classes alone.
    pub fn toggle_doc_classes(
        &mut self,
        doc: &mut Document,
        name: &str,
        force: Option<bool>,
    ) -> Result<bool> {
        self.apply(doc, name, force).map(|state| state.is_enabled())
    }

    fn apply(&self, doc: &mut Document, name: &str, force: Option<bool>) -> Result<FeatureState> {
        let root = doc.root().ok_or(SkinError::MissingRoot)?;
        let current = read_state(doc, root, name)
            .ok_or_else(|| SkinError::UnknownFeature(name.to_string()))?;
        let next = match &current {
            FeatureState::Binary(enabled) => FeatureState::Binary(force.unwrap_or(!enabled)),
            FeatureState::ClientPref(value) => FeatureState::ClientPref(match force {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => self.rotate(name, value),
            }),
        };
        if next != current {
            write_state(doc, root, name, &next);
            debug!(name, from = ?current, to = ?next, "feature changed");
        }
        Ok(next)
    }

    fn rotate(&self, name: &str, current: &str) -> String {
        let options: Vec<&str> = match self.client_prefs.options(name) {
            Some(options) if !options.is_empty() => options.iter().map(String::as_str).collect(),
            _ => BINARY_OPTIONS.to_vec(),
        };
        let next = match options.iter().position(|option| *option == current) {
            Some(index) => options[(index + 1) % options.len()],
            None => options[0],
        };
        next.to_string()
    }

    pub fn toggle(&mut self, doc: &mut Document, name: &str) -> Result<bool> {
        self.toggle_with(doc, name, None)
    }

    /// [`toggle_doc_classes`](Self::toggle_doc_classes) followed by persistence.
    pub fn toggle_with(
        &mut self,
        doc: &mut Document,
        name: &str,
        force: Option<bool>,
    ) -> Result<bool> {
        let state = self.apply(doc, name, force)?;
        self.persist(name, &state);
        Ok(state.is_enabled())
    }

    pub fn set_enabled(&mut self, doc: &mut Document, name: &str, enabled: bool) -> Result<bool> {
        self.toggle_with(doc, name, Some(enabled))
    }

    /// Selects one declared option of a client preference.
    pub fn select(&mut self, doc: &mut Document, name: &str, value: &str) -> Result<()> {
        let legal = self
            .client_prefs
            .options(name)
            .is_some_and(|options| options.iter().any(|option| option == value));
        if !legal {
            return Err(SkinError::InvalidOption {
                feature: name.to_string(),
                value: value.to_string(),
            });
        }
        let root = doc.root().ok_or(SkinError::MissingRoot)?;
        let state = FeatureState::ClientPref(value.to_string());
        write_state(doc, root, name, &state);
        debug!(name, value, "client preference selected");
        self.persist(name, &state);
        Ok(())
    }

    fn persist(&mut self, name: &str, state: &FeatureState) {
        let value = state.persisted_value();
        if self.prefs.is_registered() {
            let key = self.client_prefs.preference_key(name).unwrap_or(name);
            self.prefs.save(key, value);
        } else if self.client_prefs.is_declared(name) {
            self.client_prefs.set(self.prefs.local_mut(), name, value);
        } else {
            self.prefs.save(name, value);
        }
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    pub fn preferences_mut(&mut self) -> &mut PreferenceStore {
        &mut self.prefs
    }

    pub fn client_prefs(&self) -> &ClientPreferences {
        &self.client_prefs
    }
}

fn read_state(doc: &Document, root: ElementId, name: &str) -> Option<FeatureState> {
    if let Some(value) = ClientPrefMarker::new(name).read(doc, root) {
        return Some(FeatureState::ClientPref(value));
    }
    BinaryMarker::feature(name)
        .read(doc, root)
        .map(FeatureState::Binary)
}

fn write_state(doc: &mut Document, root: ElementId, name: &str, state: &FeatureState) {
    match state {
        FeatureState::Binary(enabled) => BinaryMarker::feature(name).write(doc, root, enabled),
        FeatureState::ClientPref(value) => ClientPrefMarker::new(name).write(doc, root, value),
    }
}
