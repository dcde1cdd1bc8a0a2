//! Skinkit configuration system
//!
//! Loads settings from `skinkit.toml`, with environment variables taking
//! precedence for quick overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "skinkit.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SkinConfig {
    /// Preference persistence settings
    pub preferences: PreferencesConfig,
    /// Declared client preferences keyed by feature name
    pub client_prefs: BTreeMap<String, ClientPrefConfig>,
    /// Sticky header gating and naming
    pub sticky_header: StickyHeaderConfig,
    /// Pinnable panel behavior
    pub pinning: PinningConfig,
    /// Scroll observation settings
    pub scroll: ScrollConfig,
}

/// Preference persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Debounce window for remote saves, in milliseconds
    pub debounce_ms: u64,
    /// Local store key of the composite anonymous preference record
    pub local_key: String,
    /// Local store key holding anonymous client preferences
    pub client_prefs_key: String,
    /// Remote save-option endpoint used for registered sessions
    pub options_endpoint: Option<String>,
}

/// One client preference: its legal values and the persisted preference name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClientPrefConfig {
    pub options: Vec<String>,
    #[serde(alias = "preference_key")]
    pub preference_key: String,
}

/// Sticky header configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StickyHeaderConfig {
    /// Master switch
    pub enabled: bool,
    /// Page actions on which the sticky header initializes
    pub allowed_actions: Vec<String>,
    /// Namespaces on which it never initializes
    pub disallowed_namespaces: Vec<i32>,
    /// Suffix appended to ids and event names copied into the sticky header
    pub id_suffix: String,
    /// `key=value` query parameter added to edit links in the sticky header
    pub tracking_param: Option<String>,
}

/// Pinning configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PinningConfig {
    /// Viewport width (px) below which relocatable panels are shown unpinned; 0 disables
    pub narrow_breakpoint: u32,
}

/// Scroll observation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pixels of travel before a direction change is reported
    pub direction_threshold: f64,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            local_key: "skin-preferences".to_string(),
            client_prefs_key: "clientpreferences".to_string(),
            options_endpoint: None,
        }
    }
}

impl Default for StickyHeaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_actions: vec!["view".to_string()],
            disallowed_namespaces: vec![-1],
            id_suffix: "-sticky-header".to_string(),
            tracking_param: Some("wvprov=sticky-header".to_string()),
        }
    }
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            narrow_breakpoint: 1120,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            direction_threshold: 50.0,
        }
    }
}

impl SkinConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `skinkit.toml` from the current directory, or defaults if it is
    /// missing or invalid.
    pub fn load_or_default() -> Self {
        match Self::load_from_file(CONFIG_FILE) {
            Ok(config) => config,
            Err(error) => {
                debug!(%error, "using default configuration");
                Self::default()
            }
        }
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Values that fail to parse are ignored.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Same as [`merge_with_env`](Self::merge_with_env) with an explicit lookup.
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SKINKIT_DEBOUNCE_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.preferences.debounce_ms = ms;
            }
        }
        if let Some(endpoint) = lookup("SKINKIT_OPTIONS_ENDPOINT") {
            self.preferences.options_endpoint = Some(endpoint);
        }
        if let Some(val) = lookup("SKINKIT_STICKY_HEADER") {
            if let Some(flag) = parse_flag(&val) {
                self.sticky_header.enabled = flag;
            }
        }
        if let Some(val) = lookup("SKINKIT_NARROW_BREAKPOINT") {
            if let Ok(px) = val.parse::<u32>() {
                self.pinning.narrow_breakpoint = px;
            }
        }
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    /// Declaration of a client preference, if any.
    pub fn client_pref(&self, feature: &str) -> Option<&ClientPrefConfig> {
        self.client_prefs.get(feature)
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    if val == "1" || val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
