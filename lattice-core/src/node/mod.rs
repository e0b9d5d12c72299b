//! Scoped, stack-tracked views over a markup token stream.
//!
//! The read side ([`NodeCursor`]) hands out [`InputNode`] handles that may
//! only be advanced while they are the innermost open element. The write side
//! ([`NodeBuilder`]) hands out [`NodeId`] handles and forces pending
//! descendants closed before any sibling or ancestor is touched, so the
//! emitted token sequence is always balanced.

mod builder;
mod cursor;
mod event;

use std::fmt;

use indexmap::IndexMap;

pub use builder::NodeBuilder;
pub use cursor::{InputNode, NodeCursor};
pub use event::{Event, EventLog, EventReader, EventWriter, Logged, XmlEventReader, XmlEventWriter};

/// Location of an element in its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    offset: u64,
}

impl Position {
    pub fn new(offset: u64) -> Self {
        Position { offset }
    }

    /// Byte offset of the element's start tag.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {}", self.offset)
    }
}

/// Handle to a node created by a [`NodeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The virtual document node. Its only legal child is the root element.
    pub const DOCUMENT: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A single name/value attribute pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// Either an element handle or one of its attributes.
#[derive(Debug, Clone)]
pub enum Node {
    Element(InputNode),
    Attribute(Attribute),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Element(element) => element.name(),
            Node::Attribute(attribute) => attribute.name(),
        }
    }

    /// Short description used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Element(_) => "element",
            Node::Attribute(_) => "attribute",
        }
    }
}

/// Ordered attribute map of one element.
///
/// Insertion order is preserved on output. Removal keeps the relative order of
/// the remaining entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMap {
    entries: IndexMap<String, Attribute>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, returning the one it replaced.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<Attribute> {
        let attribute = Attribute::new(name, value);
        self.entries.insert(attribute.name.clone(), attribute)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Attribute::value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a NodeMap {
    type Item = &'a Attribute;
    type IntoIter = indexmap::map::Values<'a, String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NodeMap::new();
        for (name, value) in iter {
            map.put(name, value);
        }
        map
    }
}
