//! Selector compilation on top of Servo's `selectors` crate.
//!
//! Only the subset the markup needs is supported: type, id, class and
//! attribute selectors with combinators and `:not()`. Pseudo-classes that
//! depend on live state (`:hover`, `:focus`, ...) fail to parse.

use std::hash::{Hash, Hasher};

use cssparser::{CssStringWriter, Parser as CssParser, ParserInput, ToCss, serialize_identifier};
use precomputed_hash::PrecomputedHash;
use selectors::NthIndexCache;
use selectors::context::QuirksMode;
use selectors::matching::{
    IgnoreNthChildForInvalidation, MatchingContext, MatchingMode, NeedsSelectorFlags,
    matches_selector_list,
};
use selectors::parser::{
    ParseRelative, Parser as SelParser, SelectorImpl, SelectorList, SelectorParseErrorKind,
};

use crate::DomError;
use crate::element::DomElement;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct CssIdent(pub String);

impl AsRef<str> for CssIdent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for CssIdent {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'a> From<&'a str> for CssIdent {
    fn from(s: &'a str) -> Self {
        Self(s.to_owned())
    }
}

impl ToCss for CssIdent {
    fn to_css<W>(&self, dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        serialize_identifier(&self.0, dest)
    }
}

impl PrecomputedHash for CssIdent {
    fn precomputed_hash(&self) -> u32 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish() as u32
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct CssAttrValue(pub String);

impl AsRef<str> for CssAttrValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'a> From<&'a str> for CssAttrValue {
    fn from(s: &'a str) -> Self {
        Self(s.to_owned())
    }
}

impl ToCss for CssAttrValue {
    fn to_css<W>(&self, dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        use std::fmt::Write;
        write!(CssStringWriter::new(dest), "{}", &self.0)
    }
}

#[derive(Clone, Debug)]
pub enum SimpleImpl {}

impl SelectorImpl for SimpleImpl {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssAttrValue;
    type Identifier = CssIdent;
    type LocalName = CssIdent;
    type NamespaceUrl = CssIdent;
    type NamespacePrefix = CssIdent;
    type BorrowedNamespaceUrl = str;
    type BorrowedLocalName = str;
    type NonTSPseudoClass = Never;
    type PseudoElement = Never;
}

/// Uninhabited; disables pseudo-classes and pseudo-elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Never {}

impl ToCss for Never {
    fn to_css<W>(&self, _dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        Ok(())
    }
}

impl selectors::parser::NonTSPseudoClass for Never {
    type Impl = SimpleImpl;
    fn is_active_or_hover(&self) -> bool {
        false
    }
    fn is_user_action_state(&self) -> bool {
        false
    }
}

impl selectors::parser::PseudoElement for Never {
    type Impl = SimpleImpl;
    fn accepts_state_pseudo_classes(&self) -> bool {
        false
    }
    fn valid_after_slotted(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct BasicParser;

impl<'i> SelParser<'i> for BasicParser {
    type Impl = SimpleImpl;
    type Error = SelectorParseErrorKind<'i>;
}

/// A compiled selector list.
#[derive(Clone, Debug)]
pub struct Selector {
    source: String,
    list: SelectorList<SimpleImpl>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let mut input = ParserInput::new(source);
        let mut parser = CssParser::new(&mut input);
        let list = SelectorList::parse(&BasicParser, &mut parser, ParseRelative::No)
            .map_err(|_| DomError::InvalidSelector(source.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            list,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn matches(&self, element: &DomElement<'_>) -> bool {
        let mut cache = NthIndexCache::default();
        let mut ctx = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        matches_selector_list(&self.list, element, &mut ctx)
    }
}
