use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::bind::Bind;
use crate::class::{Class, ClassRef, Field, Role};
use crate::error::{Error, Result};
use crate::format::{Format, Mode};
use crate::graph::{GraphCodec, ReadGraph, WriteGraph};
use crate::node::{EventReader, EventWriter, InputNode, NodeBuilder, NodeCursor, NodeId, XmlEventReader, XmlEventWriter};
use crate::schema::Catalog;
use crate::transform::TransformRegistry;
use crate::value::{Array, ArrayRef, Object, ObjectRef, Value};

/// Reads and writes value graphs as documents.
///
/// A binder is cheap to share by reference; every call builds its own
/// graph state. The transform registry may be shared between binders.
pub struct Binder {
    registry: Arc<TransformRegistry>,
    catalog: Catalog,
    format: Format,
    codec: GraphCodec,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    pub fn new() -> Self {
        Binder {
            registry: Arc::new(TransformRegistry::new()),
            catalog: Catalog::new(),
            format: Format::default(),
            codec: GraphCodec::default(),
        }
    }

    /// Creates a binder with `format`, which must be valid.
    pub fn with_format(format: Format) -> Result<Self> {
        format.validate()?;
        Ok(Binder {
            codec: GraphCodec::new(format.contract.clone())?,
            format,
            ..Self::new()
        })
    }

    /// Replaces the transform registry.
    pub fn with_registry(mut self, registry: Arc<TransformRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Makes `class` and every class it mentions resolvable by type label.
    pub fn register(&self, class: &ClassRef) {
        self.catalog.register(class);
    }

    /// Writes `value`, declared as `class`, as a document to `output`.
    pub fn write<W: Write>(&self, class: &ClassRef, value: &Value, output: W) -> Result<W> {
        let writer = XmlEventWriter::new(output, &self.format)?;
        Ok(self.write_events(class, value, writer)?.into_inner())
    }

    pub fn write_to_string(&self, class: &ClassRef, value: &Value) -> Result<String> {
        let bytes = self.write(class, value, Vec::new())?;
        String::from_utf8(bytes).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Writes `value` as tokens to any [`EventWriter`].
    pub fn write_events<E: EventWriter>(&self, class: &ClassRef, value: &Value, events: E) -> Result<E> {
        self.catalog.register(class);
        let mut context = WriteContext {
            binder: self,
            builder: NodeBuilder::with_mode(events, self.format.mode),
            graph: self.codec.write_graph(),
        };
        let root = context.child(context.builder.root(), root_name(class))?;
        context.write_value(root, class, value, &self.format.entry)?;
        log::debug!("wrote {} with {} tracked values", class.name(), context.graph.len());
        context.builder.finish()
    }

    /// Reads a document declared as `class` from `input`.
    pub fn read<R: BufRead>(&self, class: &ClassRef, input: R) -> Result<Value> {
        self.read_events(class, XmlEventReader::new(input))
    }

    pub fn read_str(&self, class: &ClassRef, text: &str) -> Result<Value> {
        self.read(class, text.as_bytes())
    }

    /// Reads a value from any [`EventReader`].
    pub fn read_events<E: EventReader>(&self, class: &ClassRef, events: E) -> Result<Value> {
        self.catalog.register(class);
        let mut context = ReadContext {
            binder: self,
            cursor: NodeCursor::new(events),
            graph: self.codec.read_graph(),
        };
        let root = context
            .cursor
            .read_root()?
            .ok_or_else(|| Error::structural("document has no root element"))?;
        if self.format.strict && root.name() != root_name(class) {
            return Err(unexpected("element", &root));
        }
        let value = context.read_value(root, class, &self.format.entry)?;
        log::debug!("read {} with {} tracked values", class.name(), context.graph.len());
        Ok(value)
    }

    /// Writes a typed value.
    pub fn encode<T: Bind>(&self, value: &T) -> Result<String> {
        self.write_to_string(&T::class(), &value.to_value())
    }

    /// Reads a typed value.
    pub fn decode<T: Bind>(&self, text: &str) -> Result<T> {
        T::from_value(&self.read_str(&T::class(), text)?)
    }
}

/// Element name of a document whose root is declared as `class`.
fn root_name(class: &Class) -> &str {
    if class.is_array() { "array" } else { class.root_name() }
}

fn unexpected(kind: &'static str, node: &InputNode) -> Error {
    Error::Unexpected {
        kind,
        name: node.name().to_string(),
        position: node.position(),
    }
}

/// The value of `field`, or None when it is null and may be omitted.
fn present(class: &Class, field: &Field, object: &Object) -> Result<Option<Value>> {
    let value = object.value(field.name());
    if !value.is_null() {
        Ok(Some(value))
    } else if field.is_required() {
        Err(required(class, field))
    } else {
        Ok(None)
    }
}

fn required(class: &Class, field: &Field) -> Error {
    Error::ValueRequired {
        class: class.name().to_string(),
        field: field.name().to_string(),
    }
}

fn component(class: &Class, field: &Field, declared: &ClassRef) -> Result<ClassRef> {
    declared.component().cloned().ok_or_else(|| {
        Error::structural(format!(
            "collection {} of {} is not declared as an array",
            field.name(),
            class.name()
        ))
    })
}

struct WriteContext<'a, W: EventWriter> {
    binder: &'a Binder,
    builder: NodeBuilder<W>,
    graph: WriteGraph,
}

impl<W: EventWriter> WriteContext<'_, W> {
    fn child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.builder
            .child(parent, name)?
            .ok_or_else(|| Error::structural(format!("cannot open element {name}")))
    }

    fn write_value(&mut self, node: NodeId, declared: &ClassRef, value: &Value, entry: &str) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let binder = self.binder;
        let composite = matches!(value, Value::Object(_) | Value::Array(_)) && !binder.registry.valid(declared)?;
        if !composite {
            let text = binder.registry.write(value, declared)?;
            if text.is_empty() {
                // An element with no content reads as null.
                self.builder.set_mode(node, Mode::Data)?;
            }
            return self.builder.set_value(node, &text);
        }

        let attributes = self.builder.attributes_mut(node)?;
        if self.graph.set_element(declared, value, attributes)? {
            return Ok(());
        }
        match value {
            Value::Object(object) => self.write_object(node, object),
            Value::Array(array) => self.write_array(node, array, entry),
            _ => Ok(()),
        }
    }

    fn write_object(&mut self, node: NodeId, object: &ObjectRef) -> Result<()> {
        let binder = self.binder;
        let object = object.borrow();
        let class = object.class().clone();
        binder.catalog.register(&class);
        let fields = class.fields();

        for field in fields.iter().filter(|f| f.role() == Role::Attribute) {
            if binder.format.contract.is_reserved(field.name()) {
                return Err(Error::Config(format!(
                    "attribute {} of {} collides with a reserved name",
                    field.name(),
                    class.name()
                )));
            }
            if let Some(value) = present(&class, field, &object)? {
                let text = binder.registry.write(&value, &field.class())?;
                self.builder.set_attribute(node, field.name(), &text)?;
            }
        }

        for field in fields.iter().filter(|f| f.role() == Role::Text) {
            if let Some(value) = present(&class, field, &object)? {
                let text = binder.registry.write(&value, &field.class())?;
                self.builder.set_value(node, &text)?;
            }
        }

        for field in fields.iter().filter(|f| matches!(f.role(), Role::Element | Role::Collection)) {
            let Some(value) = present(&class, field, &object)? else {
                continue;
            };
            let declared = field.class();
            let entry = field.entry_name().unwrap_or(binder.format.entry.as_str());
            if field.role() == Role::Collection {
                self.write_collection(node, &class, field, &declared, &value, entry)?;
            } else {
                let child = self.child(node, field.name())?;
                self.write_value(child, &declared, &value, entry)?;
                self.builder.commit(child)?;
            }
        }
        Ok(())
    }

    /// Writes each item as an element named after the field, with no
    /// wrapper and no identity for the collection itself.
    fn write_collection(
        &mut self,
        node: NodeId,
        class: &Class,
        field: &Field,
        declared: &ClassRef,
        value: &Value,
        entry: &str,
    ) -> Result<()> {
        let component = component(class, field, declared)?;
        let array = value
            .as_array()
            .ok_or_else(|| Error::invalid(declared.name(), format!("{value:?}"), "expected an array"))?;
        let array = array.borrow();
        for item in array.items() {
            let child = self.child(node, field.name())?;
            self.write_value(child, &component, item, entry)?;
            self.builder.commit(child)?;
        }
        Ok(())
    }

    /// Writes one `entry` element per item; null items stay empty.
    fn write_array(&mut self, node: NodeId, array: &ArrayRef, entry: &str) -> Result<()> {
        let binder = self.binder;
        let array = array.borrow();
        let component = array.component().clone();
        for item in array.items() {
            let child = self.child(node, entry)?;
            self.write_value(child, &component, item, &binder.format.entry)?;
            self.builder.commit(child)?;
        }
        Ok(())
    }
}

struct ReadContext<'a, R: EventReader> {
    binder: &'a Binder,
    cursor: NodeCursor<R>,
    graph: ReadGraph,
}

impl<R: EventReader> ReadContext<'_, R> {
    fn read_value(&mut self, mut node: InputNode, declared: &ClassRef, entry: &str) -> Result<Value> {
        let binder = self.binder;
        if binder.registry.valid(declared)? {
            return self.read_leaf(node, declared);
        }

        let element = self.graph.get_element(declared, node.attributes_mut(), &binder.catalog)?;
        if element.is_reference() {
            self.cursor.skip(&node)?;
            return element.construct(&mut self.graph);
        }
        let value = element.construct(&mut self.graph)?;
        match &value {
            Value::Object(object) => self.read_object(node, object)?,
            Value::Array(array) => self.read_array(node, array, entry)?,
            _ => self.finish(&node)?,
        }
        Ok(value)
    }

    /// An element with no attributes and no content is a null entry.
    fn read_entry(&mut self, node: InputNode, component: &ClassRef, entry: &str) -> Result<Value> {
        if self.cursor.is_empty(&node)? {
            self.cursor.skip(&node)?;
            return Ok(Value::Null);
        }
        self.read_value(node, component, entry)
    }

    fn read_leaf(&mut self, node: InputNode, class: &ClassRef) -> Result<Value> {
        self.check_attributes(&node)?;
        let text = self.cursor.read_value(&node)?.unwrap_or_default();
        self.finish(&node)?;
        self.binder.registry.read(&text, class)
    }

    fn read_object(&mut self, mut node: InputNode, object: &ObjectRef) -> Result<()> {
        let binder = self.binder;
        let class = object.borrow().class().clone();
        let fields = class.fields();

        for field in fields.iter().filter(|f| f.role() == Role::Attribute) {
            if let Some(attribute) = node.attributes_mut().remove(field.name()) {
                let value = binder.registry.read(attribute.value(), &field.class())?;
                object.borrow_mut().set(field.name(), value);
            }
        }
        self.check_attributes(&node)?;

        if let Some(field) = fields.iter().find(|f| f.role() == Role::Text) {
            let text = match self.cursor.read_value(&node)? {
                Some(text) => Some(text),
                None if field.is_required() => Some(String::new()),
                None => None,
            };
            if let Some(text) = text {
                let value = binder.registry.read(&text, &field.class())?;
                object.borrow_mut().set(field.name(), value);
            }
        }

        for field in fields.iter().filter(|f| f.role() == Role::Collection) {
            let component = component(&class, field, &field.class())?;
            object.borrow_mut().set(field.name(), Array::shared(component, 0));
        }

        while let Some(child) = self.cursor.read_next(&node)? {
            let field = fields
                .iter()
                .find(|f| f.name() == child.name() && matches!(f.role(), Role::Element | Role::Collection));
            let Some(field) = field else {
                if binder.format.strict {
                    return Err(unexpected("element", &child));
                }
                log::debug!("skipped unknown element {} in {}", child.name(), class.name());
                self.cursor.skip(&child)?;
                continue;
            };
            let declared = field.class();
            let entry = field.entry_name().unwrap_or(binder.format.entry.as_str());
            if field.role() == Role::Collection {
                let component = component(&class, field, &declared)?;
                let item = self.read_entry(child, &component, entry)?;
                let items = object.borrow().value(field.name());
                if let Value::Array(items) = items {
                    items.borrow_mut().push(item);
                }
            } else {
                let value = self.read_value(child, &declared, entry)?;
                object.borrow_mut().set(field.name(), value);
            }
        }

        let object = object.borrow();
        match fields.iter().find(|f| f.is_required() && object.value(f.name()).is_null()) {
            Some(field) => Err(required(&class, field)),
            None => Ok(()),
        }
    }

    /// Fills a pre-allocated array in document order; surplus entries are
    /// appended.
    fn read_array(&mut self, node: InputNode, array: &ArrayRef, entry: &str) -> Result<()> {
        let binder = self.binder;
        self.check_attributes(&node)?;
        let component = array.borrow().component().clone();
        let mut index = 0;
        while let Some(child) = self.cursor.read_next(&node)? {
            if child.name() != entry {
                if binder.format.strict {
                    return Err(unexpected("element", &child));
                }
                log::debug!("skipped unknown element {} in array", child.name());
                self.cursor.skip(&child)?;
                continue;
            }
            let item = self.read_entry(child, &component, &binder.format.entry)?;
            let mut items = array.borrow_mut();
            if index < items.len() {
                items.set(index, item);
            } else {
                items.push(item);
            }
            index += 1;
        }
        Ok(())
    }

    fn check_attributes(&self, node: &InputNode) -> Result<()> {
        match node.attributes().iter().next() {
            Some(attribute) if self.binder.format.strict => Err(Error::Unexpected {
                kind: "attribute",
                name: attribute.name().to_string(),
                position: node.position(),
            }),
            _ => Ok(()),
        }
    }

    /// Consumes what is left of `node`; children are unexpected.
    fn finish(&mut self, node: &InputNode) -> Result<()> {
        while let Some(child) = self.cursor.read_next(node)? {
            if self.binder.format.strict {
                return Err(unexpected("element", &child));
            }
            self.cursor.skip(&child)?;
        }
        Ok(())
    }
}
