//! Registry of element behavior.
//!
//! One map from element to its bound controller action, plus external click
//! listeners. Rebinding an element replaces its entry, so repeated
//! initialization never stacks handlers.

use std::collections::HashMap;

use skinkit_dom::ElementId;

/// Built-in behavior attached to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Pin the panel at this index.
    Pin(usize),
    Unpin(usize),
    FeatureToggle(String),
    ClientPref { feature: String, value: String },
    /// Sticky edit icon: click the canonical control first and follow the
    /// link only when it did not intercept the click.
    ClickThrough { canonical: ElementId },
    /// Sticky control that simply clicks the canonical one.
    Forward { canonical: ElementId },
}

/// Click delivered to listeners.
#[derive(Debug)]
pub struct ClickEvent {
    target: ElementId,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

type Listener = Box<dyn FnMut(&mut ClickEvent)>;

#[derive(Default)]
pub struct Bindings {
    bound: HashMap<ElementId, Binding>,
    listeners: HashMap<ElementId, Vec<Listener>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `el`, returning whatever it was bound to before.
    pub fn bind(&mut self, el: ElementId, binding: Binding) -> Option<Binding> {
        self.bound.insert(el, binding)
    }

    pub fn unbind(&mut self, el: ElementId) -> Option<Binding> {
        self.bound.remove(&el)
    }

    /// Drops every binding matching `predicate`.
    pub fn unbind_where(&mut self, mut predicate: impl FnMut(&Binding) -> bool) {
        self.bound.retain(|_, binding| !predicate(binding));
    }

    pub fn get(&self, el: ElementId) -> Option<&Binding> {
        self.bound.get(&el)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn listen(&mut self, el: ElementId, listener: impl FnMut(&mut ClickEvent) + 'static) {
        self.listeners.entry(el).or_default().push(Box::new(listener));
    }

    /// Runs the listeners registered directly on `el`.
    pub fn dispatch(&mut self, el: ElementId, event: &mut ClickEvent) {
        if let Some(listeners) = self.listeners.get_mut(&el) {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinkit_dom::Document;

    #[test]
    fn rebinding_replaces_and_listeners_prevent_default() {
        let doc = Document::parse(r#"<html><body><a id="a">x</a></body></html>"#);
        let a = doc.get_element_by_id("a").unwrap();
        let mut bindings = Bindings::new();
        assert_eq!(bindings.bind(a, Binding::Pin(0)), None);
        assert_eq!(bindings.bind(a, Binding::Unpin(0)), Some(Binding::Pin(0)));
        assert_eq!(bindings.len(), 1);

        bindings.listen(a, |event| event.prevent_default());
        let mut event = ClickEvent::new(a);
        bindings.dispatch(a, &mut event);
        assert!(event.is_default_prevented());

        bindings.unbind_where(|binding| matches!(binding, Binding::Unpin(_)));
        assert!(bindings.is_empty());
    }
}
