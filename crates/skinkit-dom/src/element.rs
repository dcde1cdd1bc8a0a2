use ego_tree::NodeRef;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::{Element as ServoElement, OpaqueElement};

use crate::node::{DomNode, ElementData};
use crate::selector::SimpleImpl;

/// Element view over the arena handed to Servo's matcher.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DomElement<'a> {
    node: NodeRef<'a, DomNode>,
    data: &'a ElementData,
}

impl<'a> DomElement<'a> {
    pub(crate) fn wrap(node: NodeRef<'a, DomNode>) -> Option<Self> {
        let data = node.value().as_element()?;
        Some(Self { node, data })
    }

    pub(crate) fn node_id(&self) -> ego_tree::NodeId {
        self.node.id()
    }

    fn data(&self) -> &'a ElementData {
        self.data
    }
}

impl<'a> ServoElement for DomElement<'a> {
    type Impl = SimpleImpl;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.node.value())
    }

    fn parent_element(&self) -> Option<Self> {
        self.node.parent().and_then(DomElement::wrap)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.node.prev_siblings().find_map(DomElement::wrap)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.node.next_siblings().find_map(DomElement::wrap)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.node.children().find_map(DomElement::wrap)
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(
        &self,
        name: &<Self::Impl as selectors::parser::SelectorImpl>::BorrowedLocalName,
    ) -> bool {
        self.data().tag().eq_ignore_ascii_case(name)
    }

    fn has_namespace(
        &self,
        _ns: &<Self::Impl as selectors::parser::SelectorImpl>::BorrowedNamespaceUrl,
    ) -> bool {
        true
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.data().tag().eq_ignore_ascii_case(other.data().tag())
    }

    fn attr_matches(
        &self,
        _ns: &NamespaceConstraint<&<Self::Impl as selectors::parser::SelectorImpl>::NamespaceUrl>,
        local_name: &<Self::Impl as selectors::parser::SelectorImpl>::LocalName,
        operation: &AttrSelectorOperation<
            &<Self::Impl as selectors::parser::SelectorImpl>::AttrValue,
        >,
    ) -> bool {
        match self.data().attr(local_name.as_ref()) {
            Some(value) => operation.eval_str(value),
            None => false,
        }
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &<Self::Impl as selectors::parser::SelectorImpl>::NonTSPseudoClass,
        _context: &mut selectors::matching::MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &<Self::Impl as selectors::parser::SelectorImpl>::PseudoElement,
        _context: &mut selectors::matching::MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: selectors::matching::ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        self.data().tag() == "a" && self.data().attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn imported_part(
        &self,
        _name: &<Self::Impl as selectors::parser::SelectorImpl>::Identifier,
    ) -> Option<<Self::Impl as selectors::parser::SelectorImpl>::Identifier> {
        None
    }

    fn is_part(&self, _name: &<Self::Impl as selectors::parser::SelectorImpl>::Identifier) -> bool {
        false
    }

    fn has_id(
        &self,
        id: &<Self::Impl as selectors::parser::SelectorImpl>::Identifier,
        case: CaseSensitivity,
    ) -> bool {
        match self.data().id() {
            Some(value) => case.eq(value.as_bytes(), id.as_ref().as_bytes()),
            None => false,
        }
    }

    fn has_class(
        &self,
        name: &<Self::Impl as selectors::parser::SelectorImpl>::Identifier,
        case: CaseSensitivity,
    ) -> bool {
        let needle = name.as_ref().as_bytes();
        self.data()
            .classes()
            .any(|class| case.eq(class.as_bytes(), needle))
    }

    fn is_empty(&self) -> bool {
        self.node.children().all(|child| match child.value() {
            DomNode::Text(text) => text.is_empty(),
            DomNode::Comment(_) => true,
            _ => false,
        })
    }

    fn is_root(&self) -> bool {
        self.parent_element().is_none()
    }
}
