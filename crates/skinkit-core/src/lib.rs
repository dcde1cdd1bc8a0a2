//! Pinning and sticky-visibility controllers for server-rendered skin chrome.
//!
//! The document is the only state store. Controllers read marker classes
//! through [`markers`], mutate them synchronously, and hand persistence off
//! to [`prefs`], which never reports failures back to the caller.

pub mod bindings;
pub mod client_prefs;
pub mod features;
pub mod hooks;
pub mod markers;
pub mod page;
pub mod pinnable;
pub mod prefs;
pub mod scroll;
pub mod skin;
pub mod sticky;
pub mod store;

pub use bindings::{Binding, Bindings, ClickEvent};
pub use client_prefs::{ClientPreferences, PreferenceGroup, PreferenceOption};
pub use features::{FeatureState, FeatureToggle};
pub use hooks::{Hook, SkinEvent};
pub use page::{Environment, PageContext};
pub use pinnable::{PinState, PinnableController, PinnableHeader, Relocation};
pub use prefs::{HttpOptionsApi, OptionsApi, PreferenceStore, PreferenceWriter};
pub use scroll::{
    DirectionObserver, IntersectionEntry, ScrollDirection, ScrollObserver, SectionTracker,
    Visibility, init_scroll_observer,
};
pub use skin::{ClickOutcome, Key, Skin};
pub use sticky::StickyHeader;
pub use store::{FileStore, LocalStore, MemoryStore};

use skinkit_dom::DomError;

/// Errors surfaced by the controllers.
///
/// Only programming errors (markup and script disagreeing) are reported;
/// missing optional markup and persistence failures are not errors.
#[derive(Debug, thiserror::Error)]
pub enum SkinError {
    #[error("Attempted to toggle unknown feature: {0}")]
    UnknownFeature(String),
    #[error("`{value}` is not an option of feature `{feature}`")]
    InvalidOption { feature: String, value: String },
    #[error("document has no root element")]
    MissingRoot,
    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type Result<T> = std::result::Result<T, SkinError>;
