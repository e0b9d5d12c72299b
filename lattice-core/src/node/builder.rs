use crate::error::{Error, Result};
use crate::format::Mode;
use crate::node::event::EventWriter;
use crate::node::{NodeId, NodeMap};

/// Lifecycle of an output node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Start tag not yet written; attributes may still change.
    Open,
    /// Start tag and attributes written.
    Flushed,
    /// End tag written.
    Closed,
}

#[derive(Debug)]
struct OutputNode {
    name: String,
    parent: Option<NodeId>,
    attributes: NodeMap,
    value: Option<String>,
    mode: Mode,
    state: State,
    children: usize,
}

impl OutputNode {
    fn new(name: String, parent: Option<NodeId>, state: State, mode: Mode) -> Self {
        OutputNode {
            name,
            parent,
            attributes: NodeMap::new(),
            value: None,
            mode,
            state,
            children: 0,
        }
    }
}

/// Nodes written but not yet committed, innermost last.
#[derive(Debug, Default)]
struct OutputStack {
    open: Vec<NodeId>,
}

impl OutputStack {
    fn top(&self) -> Option<NodeId> {
        self.open.last().copied()
    }

    fn push(&mut self, id: NodeId) {
        self.open.push(id);
    }

    fn pop(&mut self) -> Option<NodeId> {
        self.open.pop()
    }

    fn contains(&self, id: NodeId) -> bool {
        self.open.contains(&id)
    }

    fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

/// Builds a document from scoped node handles.
///
/// Attributes are buffered until the node's first child is created or the
/// node is committed. Creating a child of `parent` or committing `parent`
/// first closes every node opened above it, so the emitted tokens are always
/// balanced however the handles are used.
pub struct NodeBuilder<W: EventWriter> {
    writer: W,
    nodes: Vec<OutputNode>,
    stack: OutputStack,
}

impl<W: EventWriter> NodeBuilder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_mode(writer, Mode::Escape)
    }

    /// Creates a builder whose root text mode is `mode`.
    pub fn with_mode(writer: W, mode: Mode) -> Self {
        let mode = match mode {
            Mode::Inherit => Mode::Escape,
            other => other,
        };
        let document = OutputNode::new(String::new(), None, State::Flushed, mode);
        NodeBuilder {
            writer,
            nodes: vec![document],
            stack: OutputStack::default(),
        }
    }

    /// The virtual document node, used only to create the root element.
    pub fn root(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    /// Creates a child element of `parent`.
    ///
    /// Returns None if `parent` is not a valid insertion point: it is not
    /// open, or it is the document and a root element already exists.
    pub fn child(&mut self, parent: NodeId, name: &str) -> Result<Option<NodeId>> {
        if parent == NodeId::DOCUMENT {
            if self.nodes[0].children > 0 {
                return Ok(None);
            }
        } else if !self.stack.contains(parent) {
            return Ok(None);
        } else if self.nodes[parent.index()].value.is_some() {
            return Err(Error::structural(format!(
                "element {} has a value and cannot also have children",
                self.nodes[parent.index()].name
            )));
        } else {
            self.flush(parent)?;
            while let Some(top) = self.stack.top() {
                if top == parent {
                    break;
                }
                self.close(top)?;
            }
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes[parent.index()].children += 1;
        self.nodes
            .push(OutputNode::new(name.to_string(), Some(parent), State::Open, Mode::Inherit));
        self.stack.push(id);
        log::trace!("opened <{name}>");
        Ok(Some(id))
    }

    /// Sets an attribute on a node whose start tag has not been written.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.attributes_mut(node)?.put(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.attributes_mut(node)?.remove(name).map(|a| a.into_value()))
    }

    pub fn attributes(&self, node: NodeId) -> Option<&NodeMap> {
        self.nodes.get(node.index()).map(|n| &n.attributes)
    }

    /// Gives mutable access to the pending attributes of a node.
    ///
    /// Fails once the node has been flushed.
    pub fn attributes_mut(&mut self, node: NodeId) -> Result<&mut NodeMap> {
        let output = self.open_node(node)?;
        if output.state != State::Open {
            return Err(Error::structural(format!(
                "attributes of {} have already been written",
                output.name
            )));
        }
        Ok(&mut output.attributes)
    }

    /// Sets the text content, written when the node is closed.
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        let output = self.open_node(node)?;
        if output.children > 0 {
            return Err(Error::structural(format!(
                "element {} has children and cannot also have a value",
                output.name
            )));
        }
        output.value = Some(value.to_string());
        Ok(())
    }

    pub fn set_mode(&mut self, node: NodeId, mode: Mode) -> Result<()> {
        self.open_node(node)?.mode = mode;
        Ok(())
    }

    pub fn is_committed(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.index())
            .is_some_and(|n| n.state == State::Closed)
    }

    /// Closes `node`, after closing every node opened above it.
    ///
    /// Committing an already-closed node does nothing.
    pub fn commit(&mut self, node: NodeId) -> Result<()> {
        if self.stack.is_empty() {
            return Err(Error::structural("commit with no open element"));
        }
        if self.is_committed(node) {
            return Ok(());
        }
        if !self.stack.contains(node) {
            return Err(Error::structural("commit of an element that was never opened"));
        }
        while let Some(top) = self.stack.top() {
            self.close(top)?;
            if top == node {
                break;
            }
        }
        Ok(())
    }

    /// Closes everything still open and flushes the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        while let Some(top) = self.stack.top() {
            self.close(top)?;
        }
        self.writer.finish()?;
        Ok(self.writer)
    }

    fn open_node(&mut self, node: NodeId) -> Result<&mut OutputNode> {
        if node == NodeId::DOCUMENT {
            return Err(Error::structural("the document node has no content"));
        }
        match self.nodes.get_mut(node.index()) {
            Some(output) if output.state != State::Closed => Ok(output),
            Some(output) => Err(Error::structural(format!("element {} is already closed", output.name))),
            None => Err(Error::structural("unknown element")),
        }
    }

    fn mode(&self, node: NodeId) -> Mode {
        let mut current = Some(node);
        while let Some(id) = current {
            let output = &self.nodes[id.index()];
            if output.mode != Mode::Inherit {
                return output.mode;
            }
            current = output.parent;
        }
        Mode::Escape
    }

    fn flush(&mut self, node: NodeId) -> Result<()> {
        let output = &mut self.nodes[node.index()];
        if output.state == State::Open {
            self.writer.start(&output.name, &output.attributes)?;
            output.state = State::Flushed;
            log::trace!("flushed <{}>", output.name);
        }
        Ok(())
    }

    fn close(&mut self, node: NodeId) -> Result<()> {
        self.flush(node)?;
        let mode = self.mode(node);
        let output = &mut self.nodes[node.index()];
        if let Some(value) = output.value.take() {
            self.writer.text(&value, mode)?;
        }
        self.writer.end(&output.name)?;
        output.state = State::Closed;
        self.stack.pop();
        log::trace!("closed <{}>", output.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{EventLog, Logged};

    fn names(log: &EventLog) -> Vec<String> {
        log.events()
            .iter()
            .map(|e| match e {
                Logged::Start(name, _) => format!("<{name}>"),
                Logged::Text(value, _) => value.clone(),
                Logged::End(name) => format!("</{name}>"),
            })
            .collect()
    }

    #[test]
    fn single_root() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        assert!(builder.child(doc, "a").unwrap().is_some());
        assert!(builder.child(doc, "b").unwrap().is_none());
    }

    #[test]
    fn committing_ancestor_closes_descendants() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        let b = builder.child(a, "b").unwrap().unwrap();
        let _c = builder.child(b, "c").unwrap().unwrap();
        builder.commit(a).unwrap();

        let log = builder.finish().unwrap();
        assert!(log.is_balanced());
        assert_eq!(names(&log), vec!["<a>", "<b>", "<c>", "</c>", "</b>", "</a>"]);
    }

    #[test]
    fn sibling_closes_pending_child() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        let b = builder.child(a, "b").unwrap().unwrap();
        builder.set_value(b, "1").unwrap();
        let _c = builder.child(a, "c").unwrap().unwrap();
        // b is closed now, so it is no longer an insertion point
        assert!(builder.child(b, "d").unwrap().is_none());

        let log = builder.finish().unwrap();
        assert!(log.is_balanced());
        assert_eq!(names(&log), vec!["<a>", "<b>", "1", "</b>", "<c>", "</c>", "</a>"]);
    }

    #[test]
    fn attribute_after_flush_is_error() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.set_attribute(a, "x", "1").unwrap();
        builder.child(a, "b").unwrap().unwrap();
        assert!(matches!(builder.set_attribute(a, "y", "2"), Err(Error::Structural(_))));
    }

    #[test]
    fn attributes_flushed_with_start() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.set_attribute(a, "x", "1").unwrap();
        builder.set_attribute(a, "y", "2").unwrap();
        assert_eq!(builder.remove_attribute(a, "x").unwrap().as_deref(), Some("1"));
        builder.commit(a).unwrap();

        let log = builder.finish().unwrap();
        assert_eq!(
            log.events()[0],
            Logged::Start("a".to_string(), vec![("y".to_string(), "2".to_string())])
        );
    }

    #[test]
    fn commit_with_nothing_open_is_error() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        assert!(matches!(builder.commit(doc), Err(Error::Structural(_))));

        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.commit(a).unwrap();
        assert!(matches!(builder.commit(a), Err(Error::Structural(_))));
    }

    #[test]
    fn value_and_children_are_exclusive() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.set_value(a, "text").unwrap();
        assert!(builder.child(a, "b").is_err());

        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.child(a, "b").unwrap().unwrap();
        assert!(builder.set_value(a, "text").is_err());
    }

    #[test]
    fn mode_is_inherited() {
        let mut builder = NodeBuilder::with_mode(EventLog::new(), Mode::Escape);
        let doc = builder.root();
        let a = builder.child(doc, "a").unwrap().unwrap();
        builder.set_mode(a, Mode::Data).unwrap();
        let b = builder.child(a, "b").unwrap().unwrap();
        builder.set_value(b, "<x>").unwrap();

        let log = builder.finish().unwrap();
        assert!(log.events().contains(&Logged::Text("<x>".to_string(), Mode::Data)));
    }

    #[test]
    fn arbitrary_call_order_stays_balanced() {
        let mut builder = NodeBuilder::new(EventLog::new());
        let doc = builder.root();
        let root = builder.child(doc, "r").unwrap().unwrap();
        let mut open = vec![root];
        for step in 0..40usize {
            let target = open[step * 7 % open.len()];
            if step % 5 == 4 {
                builder.commit(target).unwrap();
            } else if let Some(child) = builder.child(target, &format!("n{step}")).unwrap() {
                open.push(child);
            }
            open.retain(|id| !builder.is_committed(*id));
            if open.is_empty() {
                break;
            }
        }
        let log = builder.finish().unwrap();
        assert!(log.is_balanced());
    }
}
