use crate::error::Result;
use crate::node::event::{Event, EventReader};
use crate::node::{Node, NodeMap, Position};

/// A scoped handle to an element being read.
///
/// The handle owns a copy of the element's attributes so that callers can
/// remove the ones they consume. Children and text are fetched through the
/// [`NodeCursor`] that produced it.
#[derive(Debug, Clone)]
pub struct InputNode {
    id: usize,
    name: String,
    attributes: NodeMap,
    position: Position,
}

impl InputNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn attributes(&self) -> &NodeMap {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut NodeMap {
        &mut self.attributes
    }

    /// Returns the named attribute as a [`Node`].
    pub fn attribute(&self, name: &str) -> Option<Node> {
        self.attributes.get(name).cloned().map(Node::Attribute)
    }

    pub fn into_node(self) -> Node {
        Node::Element(self)
    }
}

/// Elements that have been opened but not yet closed, innermost last.
#[derive(Debug, Default)]
struct InputStack {
    open: Vec<usize>,
}

impl InputStack {
    fn top(&self) -> Option<usize> {
        self.open.last().copied()
    }

    fn push(&mut self, id: usize) {
        self.open.push(id);
    }

    fn pop(&mut self) -> Option<usize> {
        self.open.pop()
    }

    fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// An element may be advanced while it is innermost, or once the whole
    /// document has been closed.
    fn is_relevant(&self, id: usize) -> bool {
        self.top().is_none_or(|top| top == id)
    }
}

/// Presents a token stream as nested element handles.
///
/// Children of an element may only be fetched while that element is the
/// innermost open one. Asking a stale handle for children returns None and
/// leaves the stream untouched.
pub struct NodeCursor<R: EventReader> {
    events: R,
    stack: InputStack,
    produced: usize,
    root: Option<usize>,
}

impl<R: EventReader> NodeCursor<R> {
    pub fn new(events: R) -> Self {
        NodeCursor {
            events,
            stack: InputStack::default(),
            produced: 0,
            root: None,
        }
    }

    /// Returns the document's root element.
    ///
    /// Only the first call can succeed: once any element has been produced,
    /// this returns None.
    pub fn read_root(&mut self) -> Result<Option<InputNode>> {
        if self.produced > 0 || !self.stack.is_empty() {
            return Ok(None);
        }
        loop {
            match self.events.next()? {
                Some(Event::Start {
                    name,
                    attributes,
                    position,
                }) => {
                    let node = self.open(name, attributes, position);
                    self.root = Some(node.id);
                    return Ok(Some(node));
                }
                Some(Event::Text(_)) => continue,
                Some(Event::End { .. }) | None => return Ok(None),
            }
        }
    }

    /// Returns the next child of `from`, or None once `from` is exhausted.
    ///
    /// Text between child elements is discarded. Reaching the end of `from`
    /// closes it.
    pub fn read_next(&mut self, from: &InputNode) -> Result<Option<InputNode>> {
        if !self.stack.is_relevant(from.id) {
            return Ok(None);
        }
        while let Some(event) = self.events.next()? {
            match event {
                Event::Start {
                    name,
                    attributes,
                    position,
                } => return Ok(Some(self.open(name, attributes, position))),
                Event::End { name } => {
                    let closed = self.stack.pop();
                    log::trace!("closed <{name}>");
                    if closed == Some(from.id) {
                        return Ok(None);
                    }
                }
                Event::Text(_) => {}
            }
        }
        Ok(None)
    }

    /// Accumulates the text content of `from` up to its next child or end.
    ///
    /// Returns None, as opposed to an empty string, when there is no text.
    pub fn read_value(&mut self, from: &InputNode) -> Result<Option<String>> {
        if self.stack.top() != Some(from.id) {
            return Ok(None);
        }
        let mut value: Option<String> = None;
        while matches!(self.events.peek()?, Some(Event::Text(_))) {
            if let Some(Event::Text(text)) = self.events.next()? {
                value.get_or_insert_with(String::new).push_str(&text);
            }
        }
        Ok(value)
    }

    /// Consumes the remainder of `from`, including all of its descendants.
    pub fn skip(&mut self, from: &InputNode) -> Result<()> {
        while let Some(child) = self.read_next(from)? {
            self.skip(&child)?;
        }
        Ok(())
    }

    pub fn is_root(&self, node: &InputNode) -> bool {
        self.root == Some(node.id)
    }

    /// Returns true if `node` has no attributes left and its end tag is the
    /// next token.
    pub fn is_empty(&mut self, node: &InputNode) -> Result<bool> {
        if !node.attributes.is_empty() || self.stack.top() != Some(node.id) {
            return Ok(false);
        }
        Ok(matches!(self.events.peek()?, Some(Event::End { .. })))
    }

    pub fn into_inner(self) -> R {
        self.events
    }

    fn open(&mut self, name: String, attributes: NodeMap, position: Position) -> InputNode {
        let id = self.produced;
        self.produced += 1;
        self.stack.push(id);
        log::trace!("opened <{name}> at {position}");
        InputNode {
            id,
            name,
            attributes,
            position,
        }
    }
}
