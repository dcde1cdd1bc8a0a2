//! Signals exchanged with collaborators outside the skin.

use skinkit_dom::ElementId;

use crate::features::FeatureState;
use crate::pinnable::PinState;
use crate::scroll::ScrollDirection;

/// Inbound signals the skin reacts to but never raises itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    EditorActivated,
    EditorDeactivated,
    PostEdit,
    /// An extension added a link to a portlet.
    PortletLinkAdded { link: ElementId },
}

/// Outbound notifications, drained with `Skin::take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum SkinEvent {
    /// The sticky header appeared (`Down`) or went away (`Up`).
    PageTitleScroll(ScrollDirection),
    ScrollDirectionChanged(ScrollDirection),
    PinStateChanged { name: String, state: PinState },
    FeatureChanged { name: String, state: FeatureState },
    StickyHeaderDisabled,
    ActiveSectionChanged(Option<String>),
}
