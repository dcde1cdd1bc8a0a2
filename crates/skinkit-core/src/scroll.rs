//! Scroll-driven observers.
//!
//! The host reports intersection entries and scroll offsets; nothing here
//! polls. [`ScrollObserver`] only acts on visibility transitions, so
//! repeated identical entries are harmless.

use skinkit_dom::{Document, ElementId};
use tracing::{debug, trace};

pub const TOC_ACTIVE_CLASS: &str = "vector-toc-list-item-active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

/// One intersection observation for an observed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    pub is_intersecting: bool,
    /// Top edge of the target's bounding box relative to the viewport.
    pub top: f64,
}

impl IntersectionEntry {
    /// Visible once the target has scrolled out above the viewport.
    pub fn visibility(&self) -> Visibility {
        if !self.is_intersecting && self.top < 0.0 {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

type Callback = Box<dyn FnMut(&mut Document)>;

/// Watches a single boundary and calls `show` / `hide` on transitions.
pub struct ScrollObserver {
    boundary: Option<ElementId>,
    state: Visibility,
    show: Callback,
    hide: Callback,
}

/// Creates an observer that is not yet watching anything.
pub fn init_scroll_observer(
    show: impl FnMut(&mut Document) + 'static,
    hide: impl FnMut(&mut Document) + 'static,
) -> ScrollObserver {
    ScrollObserver {
        boundary: None,
        state: Visibility::Hidden,
        show: Box::new(show),
        hide: Box::new(hide),
    }
}

impl ScrollObserver {
    /// Starts watching `boundary`, dropping any previous one.
    pub fn observe(&mut self, doc: &mut Document, boundary: ElementId) {
        self.unobserve(doc);
        self.boundary = Some(boundary);
        debug!(?boundary, "observing scroll boundary");
    }

    /// Stops watching. A visible state is hidden first.
    pub fn unobserve(&mut self, doc: &mut Document) {
        if let Some(boundary) = self.boundary.take() {
            debug!(?boundary, "stopped observing scroll boundary");
        }
        if self.state == Visibility::Visible {
            self.state = Visibility::Hidden;
            (self.hide)(doc);
        }
    }

    pub fn boundary(&self) -> Option<ElementId> {
        self.boundary
    }

    pub fn is_observing(&self) -> bool {
        self.boundary.is_some()
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    /// Processes a batch of entries. Returns the direction of the last
    /// transition, if any happened.
    pub fn handle(
        &mut self,
        doc: &mut Document,
        entries: &[IntersectionEntry],
    ) -> Option<ScrollDirection> {
        let boundary = self.boundary?;
        let mut direction = None;
        for entry in entries.iter().filter(|entry| entry.target == boundary) {
            let next = entry.visibility();
            if next == self.state {
                trace!(?next, "visibility unchanged");
                continue;
            }
            self.state = next;
            match next {
                Visibility::Visible => {
                    (self.show)(doc);
                    direction = Some(ScrollDirection::Down);
                }
                Visibility::Hidden => {
                    (self.hide)(doc);
                    direction = Some(ScrollDirection::Up);
                }
            }
        }
        direction
    }
}

/// Reports scroll direction changes after a minimum travel.
#[derive(Debug, Clone)]
pub struct DirectionObserver {
    threshold: f64,
    anchor: f64,
    direction: Option<ScrollDirection>,
}

impl DirectionObserver {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.max(0.0),
            anchor: 0.0,
            direction: None,
        }
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        self.direction
    }

    /// Feeds the current scroll offset. Returns the new direction when it
    /// flips.
    pub fn scrolled_to(&mut self, y: f64) -> Option<ScrollDirection> {
        let travel = y - self.anchor;
        let moving = if travel > 0.0 {
            ScrollDirection::Down
        } else if travel < 0.0 {
            ScrollDirection::Up
        } else {
            return None;
        };
        if Some(moving) == self.direction {
            // Keep the anchor at the furthest point in the current direction.
            self.anchor = y;
            return None;
        }
        if travel.abs() < self.threshold {
            return None;
        }
        self.anchor = y;
        self.direction = Some(moving);
        Some(moving)
    }
}

/// Highlights the table-of-contents entry for the section being read.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    offset: f64,
    active: Option<String>,
}

impl SectionTracker {
    pub fn new(offset: f64) -> Self {
        Self {
            offset,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// `tops` are `(section id, heading top)` pairs in document order.
    /// Returns true when the active section changed.
    pub fn update(&mut self, doc: &mut Document, tops: &[(String, f64)]) -> bool {
        let next = tops
            .iter()
            .filter(|(_, top)| *top <= self.offset)
            .map(|(id, _)| id.clone())
            .last();
        if next == self.active {
            return false;
        }
        if let Some(previous) = &self.active {
            if let Some(item) = doc.get_element_by_id(&format!("toc-{previous}")) {
                doc.remove_class(item, TOC_ACTIVE_CLASS);
            }
        }
        if let Some(current) = &next {
            if let Some(item) = doc.get_element_by_id(&format!("toc-{current}")) {
                doc.add_class(item, TOC_ACTIVE_CLASS);
            }
        }
        debug!(from = ?self.active, to = ?next, "active section changed");
        self.active = next;
        true
    }
}
