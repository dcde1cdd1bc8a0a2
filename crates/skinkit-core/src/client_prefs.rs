//! Client preferences for anonymous sessions.
//!
//! Choices are kept in the local store as a comma list of
//! `{name}-clientpref-{value}` tokens, the same spelling as the root classes.

use std::collections::BTreeMap;

use skinkit_config::{ClientPrefConfig, SkinConfig};
use skinkit_dom::Document;
use tracing::{debug, warn};

use crate::markers::{ClientPrefMarker, MarkerState};
use crate::store::LocalStore;

const TOKEN_INFIX: &str = "-clientpref-";

/// One declared feature as shown in the appearance menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceGroup {
    pub feature: String,
    pub preference_key: String,
    pub options: Vec<PreferenceOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceOption {
    pub value: String,
    pub selected: bool,
}

/// Declared client preferences and their local persistence.
#[derive(Debug, Clone)]
pub struct ClientPreferences {
    definitions: BTreeMap<String, ClientPrefConfig>,
    key: String,
}

impl ClientPreferences {
    pub fn new(config: &SkinConfig) -> Self {
        Self {
            definitions: config.client_prefs.clone(),
            key: config.preferences.client_prefs_key.clone(),
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn options(&self, name: &str) -> Option<&[String]> {
        self.definitions.get(name).map(|def| def.options.as_slice())
    }

    pub fn preference_key(&self, name: &str) -> Option<&str> {
        self.definitions
            .get(name)
            .map(|def| def.preference_key.as_str())
    }

    /// Stores `value` for `name`. Returns false, storing nothing, when the
    /// feature is undeclared or the value is not one of its options.
    pub fn set(&self, store: &mut dyn LocalStore, name: &str, value: &str) -> bool {
        let legal = self
            .options(name)
            .is_some_and(|options| options.iter().any(|option| option == value));
        if !legal {
            debug!(name, value, "rejecting client preference");
            return false;
        }
        let mut stored = self.stored(store);
        stored.insert(name.to_string(), value.to_string());
        if let Err(error) = store.set(&self.key, &encode(&stored)) {
            warn!(%error, name, "failed to store client preference");
        }
        true
    }

    /// Every choice currently in the local store.
    pub fn stored(&self, store: &dyn LocalStore) -> BTreeMap<String, String> {
        store
            .get(&self.key)
            .map(|raw| decode(&raw))
            .unwrap_or_default()
    }

    /// Applies stored choices to the root for features the page already
    /// exposes. Returns how many classes were replaced.
    pub fn restore(&self, store: &dyn LocalStore, doc: &mut Document) -> usize {
        let Some(root) = doc.root() else {
            return 0;
        };
        let mut applied = 0;
        for (name, value) in self.stored(store) {
            let marker = ClientPrefMarker::new(&name);
            match marker.read(doc, root) {
                Some(current) if current != value => {
                    marker.write(doc, root, &value);
                    applied += 1;
                }
                Some(_) => {}
                None => debug!(%name, "stored client preference not exposed on this page"),
            }
        }
        applied
    }

    /// Appearance-menu model for the declared features the page exposes.
    pub fn menu(&self, doc: &Document) -> Vec<PreferenceGroup> {
        let Some(root) = doc.root() else {
            return Vec::new();
        };
        self.definitions
            .iter()
            .filter_map(|(name, def)| {
                let current = ClientPrefMarker::new(name).read(doc, root)?;
                Some(PreferenceGroup {
                    feature: name.clone(),
                    preference_key: def.preference_key.clone(),
                    options: def
                        .options
                        .iter()
                        .map(|value| PreferenceOption {
                            value: value.clone(),
                            selected: *value == current,
                        })
                        .collect(),
                })
            })
            .collect()
    }
}

fn encode(stored: &BTreeMap<String, String>) -> String {
    stored
        .iter()
        .map(|(name, value)| format!("{name}{TOKEN_INFIX}{value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn decode(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|token| {
            let (name, value) = token.rsplit_once(TOKEN_INFIX)?;
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn prefs() -> ClientPreferences {
        let config = SkinConfig::from_toml(
            r#"
            [client_prefs.vector-feature-custom-font-size]
            options = ["0", "1", "2"]
            preference_key = "vector-font-size"

            [client_prefs.skin-theme]
            options = ["day", "night", "os"]
            preference_key = "skin-theme"
            "#,
        )
        .unwrap();
        ClientPreferences::new(&config)
    }

    #[test]
    fn set_validates_name_and_value() {
        let prefs = prefs();
        let mut store = MemoryStore::new();
        assert!(!prefs.set(&mut store, "unknown", "1"));
        assert!(!prefs.set(&mut store, "skin-theme", "sepia"));
        assert!(store.get("clientpreferences").is_none());

        assert!(prefs.set(&mut store, "skin-theme", "night"));
        assert!(prefs.set(&mut store, "vector-feature-custom-font-size", "2"));
        assert!(prefs.set(&mut store, "skin-theme", "day"));
        assert_eq!(
            store.get("clientpreferences").as_deref(),
            Some("skin-theme-clientpref-day,vector-feature-custom-font-size-clientpref-2")
        );
    }

    #[test]
    fn decode_skips_malformed_tokens() {
        let decoded = decode("a-clientpref-1,garbage,,-clientpref-2,b-clientpref-");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["a"], "1");
    }

    #[test]
    fn restore_only_touches_exposed_features() {
        let prefs = prefs();
        let mut store = MemoryStore::new();
        store
            .set(
                "clientpreferences",
                "skin-theme-clientpref-night,vector-feature-custom-font-size-clientpref-2",
            )
            .unwrap();
        let mut doc = Document::parse(
            r#"<html class="skin-theme-clientpref-day"><body></body></html>"#,
        );
        assert_eq!(prefs.restore(&store, &mut doc), 1);
        let root = doc.root().unwrap();
        assert_eq!(doc.classes(root), vec!["skin-theme-clientpref-night"]);
    }

    #[test]
    fn menu_marks_selected_option() {
        let prefs = prefs();
        let doc = Document::parse(
            r#"<html class="vector-feature-custom-font-size-clientpref-1"><body></body></html>"#,
        );
        let menu = prefs.menu(&doc);
        assert_eq!(menu.len(), 1);
        let group = &menu[0];
        assert_eq!(group.feature, "vector-feature-custom-font-size");
        assert_eq!(group.preference_key, "vector-font-size");
        let selected: Vec<&str> = group
            .options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.value.as_str())
            .collect();
        assert_eq!(selected, vec!["1"]);
    }
}
