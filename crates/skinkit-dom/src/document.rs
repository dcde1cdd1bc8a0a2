use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};
use tracing::trace;

use crate::element::DomElement;
use crate::node::{DomNode, ElementData};
use crate::selector::Selector;
use crate::serialize::write_node;
use crate::{DomError, Result};

/// Handle to an element in a [`Document`].
///
/// Handles stay valid for the lifetime of the document, including while
/// the element is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(NodeId);

/// Mutable HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<DomNode>,
    focused: Option<ElementId>,
}

/// Owned copy of a subtree, used to clone without holding a tree borrow.
struct Snapshot {
    value: DomNode,
    children: Vec<Snapshot>,
}

impl Document {
    /// Parses a full HTML document. Parsing never fails; html5ever repairs
    /// malformed markup the way a browser would.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut tree = Tree::new(DomNode::Document);
        let root = tree.root().id();
        for child in parsed.tree.root().children() {
            import(&mut tree, root, child);
        }
        Self {
            tree,
            focused: None,
        }
    }

    /// The document element (`<html>`).
    pub fn root(&self) -> Option<ElementId> {
        self.tree
            .root()
            .children()
            .find(|child| child.value().is_element())
            .map(|child| ElementId(child.id()))
    }

    pub fn body(&self) -> Option<ElementId> {
        let root = self.root()?;
        self.tree
            .get(root.0)?
            .children()
            .find(|child| matches!(child.value(), DomNode::Element(data) if data.tag() == "body"))
            .map(|child| ElementId(child.id()))
    }

    pub fn element(&self, el: ElementId) -> Option<&ElementData> {
        self.tree.get(el.0).and_then(|node| node.value().as_element())
    }

    fn with_element_mut<R>(
        &mut self,
        el: ElementId,
        f: impl FnOnce(&mut ElementData) -> R,
    ) -> Option<R> {
        let mut node = self.tree.get_mut(el.0)?;
        match node.value() {
            DomNode::Element(data) => Some(f(data)),
            _ => None,
        }
    }

    pub fn tag_name(&self, el: ElementId) -> Option<&str> {
        self.element(el).map(ElementData::tag)
    }

    pub fn id_of(&self, el: ElementId) -> Option<&str> {
        self.element(el).and_then(ElementData::id)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<ElementId> {
        self.tree
            .root()
            .descendants()
            .find(|node| node.value().as_element().and_then(ElementData::id) == Some(id))
            .map(|node| ElementId(node.id()))
    }

    /// First element under `scope` (or the whole document) matching `css`.
    /// The scope element itself is never returned.
    pub fn query_selector(&self, scope: Option<ElementId>, css: &str) -> Result<Option<ElementId>> {
        let selector = Selector::parse(css)?;
        Ok(self.select(scope, &selector).next())
    }

    pub fn query_selector_all(&self, scope: Option<ElementId>, css: &str) -> Result<Vec<ElementId>> {
        let selector = Selector::parse(css)?;
        Ok(self.select(scope, &selector).collect())
    }

    /// Matches a precompiled selector under `scope`.
    pub fn select<'a>(
        &'a self,
        scope: Option<ElementId>,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementId> + 'a {
        let start = match scope {
            Some(el) => self.tree.get(el.0),
            None => Some(self.tree.root()),
        };
        start
            .into_iter()
            .flat_map(|node| node.descendants().skip(1))
            .filter_map(DomElement::wrap)
            .filter(move |element| selector.matches(element))
            .map(|element| ElementId(element.node_id()))
    }

    /// Whether `el` itself matches `css`.
    pub fn matches(&self, el: ElementId, css: &str) -> Result<bool> {
        let selector = Selector::parse(css)?;
        let node = self.tree.get(el.0).ok_or(DomError::NotAnElement)?;
        let element = DomElement::wrap(node).ok_or(DomError::NotAnElement)?;
        Ok(selector.matches(&element))
    }

    /// Nearest inclusive ancestor matching `css`.
    pub fn closest(&self, el: ElementId, css: &str) -> Result<Option<ElementId>> {
        let selector = Selector::parse(css)?;
        let Some(node) = self.tree.get(el.0) else {
            return Ok(None);
        };
        let found = std::iter::once(node)
            .chain(node.ancestors())
            .filter_map(DomElement::wrap)
            .find(|element| selector.matches(element))
            .map(|element| ElementId(element.node_id()));
        Ok(found)
    }

    pub fn attr(&self, el: ElementId, name: &str) -> Option<&str> {
        self.element(el).and_then(|data| data.attr(name))
    }

    /// Reads `data-{key}`.
    pub fn data(&self, el: ElementId, key: &str) -> Option<&str> {
        self.attr(el, &format!("data-{key}"))
    }

    pub fn set_attr(&mut self, el: ElementId, name: &str, value: &str) {
        self.with_element_mut(el, |data| data.set_attr(name, value));
    }

    pub fn remove_attr(&mut self, el: ElementId, name: &str) -> Option<String> {
        self.with_element_mut(el, |data| data.remove_attr(name))
            .flatten()
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.element(el).is_some_and(|data| data.has_class(class))
    }

    pub fn classes(&self, el: ElementId) -> Vec<&str> {
        self.element(el)
            .map(|data| data.classes().collect())
            .unwrap_or_default()
    }

    pub fn add_class(&mut self, el: ElementId, class: &str) -> bool {
        self.with_element_mut(el, |data| data.add_class(class))
            .unwrap_or(false)
    }

    pub fn remove_class(&mut self, el: ElementId, class: &str) -> bool {
        self.with_element_mut(el, |data| data.remove_class(class))
            .unwrap_or(false)
    }

    pub fn toggle_class(&mut self, el: ElementId, class: &str, force: Option<bool>) -> bool {
        self.with_element_mut(el, |data| data.toggle_class(class, force))
            .unwrap_or(false)
    }

    /// Parent element, if any. The document node is not an element.
    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        let parent = self.tree.get(el.0)?.parent()?;
        parent.value().is_element().then(|| ElementId(parent.id()))
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.tree
            .get(el.0)
            .map(|node| {
                node.children()
                    .filter(|child| child.value().is_element())
                    .map(|child| ElementId(child.id()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The element and every element below it, in document order.
    pub fn descendants(&self, el: ElementId) -> Vec<ElementId> {
        self.tree
            .get(el.0)
            .map(|node| {
                node.descendants()
                    .filter(|child| child.value().is_element())
                    .map(|child| ElementId(child.id()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `el` is attached to the document.
    pub fn is_connected(&self, el: ElementId) -> bool {
        let root = self.tree.root().id();
        match self.tree.get(el.0) {
            Some(node) => node.ancestors().any(|ancestor| ancestor.id() == root),
            None => false,
        }
    }

    /// Whether `ancestor` is `el` or one of its ancestors.
    pub fn contains(&self, ancestor: ElementId, el: ElementId) -> bool {
        match self.tree.get(el.0) {
            Some(node) => {
                node.id() == ancestor.0 || node.ancestors().any(|a| a.id() == ancestor.0)
            }
            None => false,
        }
    }

    /// Moves `child` (attached or not) to the end of `parent`.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        if self.element(parent).is_none() || self.element(child).is_none() {
            return Err(DomError::NotAnElement);
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(mut node) = self.tree.get_mut(parent.0) {
            node.append_id(child.0);
        }
        trace!(?parent, ?child, "append_child");
        Ok(())
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, data: ElementData) -> ElementId {
        ElementId(self.tree.orphan(DomNode::Element(data)).id())
    }

    /// Detaches `el` from its parent. Detached elements are invisible to
    /// lookups and queries but keep their handle.
    pub fn remove(&mut self, el: ElementId) {
        if let Some(focused) = self.focused {
            if self.contains(el, focused) {
                self.focused = None;
            }
        }
        if let Some(mut node) = self.tree.get_mut(el.0) {
            node.detach();
        }
    }

    /// Copies `el` and its subtree into a new detached element.
    pub fn deep_clone(&mut self, el: ElementId) -> Option<ElementId> {
        let snapshot = snapshot(self.tree.get(el.0)?);
        let mut orphan = self.tree.orphan(snapshot.value);
        let id = orphan.id();
        for child in snapshot.children {
            graft(&mut orphan, child);
        }
        Some(ElementId(id))
    }

    pub fn text_content(&self, el: ElementId) -> String {
        let Some(node) = self.tree.get(el.0) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|child| match child.value() {
                DomNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces the children of `el` with a single text node.
    pub fn set_text_content(&mut self, el: ElementId, text: &str) {
        let children: Vec<NodeId> = match self.tree.get(el.0) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => return,
        };
        for child in children {
            if let Some(mut node) = self.tree.get_mut(child) {
                node.detach();
            }
        }
        if let Some(mut node) = self.tree.get_mut(el.0) {
            node.append(DomNode::Text(text.to_string()));
        }
    }

    pub fn focus(&mut self, el: ElementId) {
        if self.is_connected(el) {
            self.focused = Some(el);
        }
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused.filter(|el| self.is_connected(*el))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(&mut out, self.tree.root(), false);
        out
    }

    pub fn outer_html(&self, el: ElementId) -> String {
        let mut out = String::new();
        if let Some(node) = self.tree.get(el.0) {
            write_node(&mut out, node, false);
        }
        out
    }
}

fn import(tree: &mut Tree<DomNode>, parent: NodeId, source: NodeRef<'_, Node>) {
    let value = match source.value() {
        Node::Element(element) => DomNode::Element(ElementData::with_attrs(
            element.name(),
            element.attrs(),
        )),
        Node::Text(text) => DomNode::Text(String::from(&**text)),
        Node::Comment(comment) => DomNode::Comment(String::from(&**comment)),
        _ => return,
    };
    let Some(mut parent_node) = tree.get_mut(parent) else {
        return;
    };
    let id = parent_node.append(value).id();
    for child in source.children() {
        import(tree, id, child);
    }
}

fn snapshot(node: NodeRef<'_, DomNode>) -> Snapshot {
    Snapshot {
        value: node.value().clone(),
        children: node.children().map(snapshot).collect(),
    }
}

fn graft(parent: &mut ego_tree::NodeMut<'_, DomNode>, snapshot: Snapshot) {
    let mut node = parent.append(snapshot.value);
    for child in snapshot.children {
        graft(&mut node, child);
    }
}
