//! In-memory HTML document used by the skin controllers.
//!
//! Server-rendered markup is parsed with `scraper` and copied into an
//! `ego_tree` arena that the controllers mutate freely: class lists,
//! attributes, subtree moves and clones. Queries use Servo's `selectors`
//! engine so the same CSS selectors that target the markup in a browser
//! work here.

mod document;
mod element;
mod node;
mod selector;
mod serialize;

pub use document::{Document, ElementId};
pub use node::{DomNode, ElementData};
pub use selector::Selector;

/// Errors raised by document operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("node is not an element")]
    NotAnElement,
    #[error("cannot insert a node into itself or one of its descendants")]
    HierarchyRequest,
}

pub type Result<T> = std::result::Result<T, DomError>;
