//! Lattice binds object graphs to tree-shaped XML documents.
//!
//! Core concepts:
//! - **Class**: A runtime descriptor of a value's shape (scalar, family, array, enum, record)
//! - **Value**: A dynamic value; objects and arrays are shared handles with identity
//! - **NodeCursor / NodeBuilder**: Scoped, stack-tracked reading and writing of elements
//! - **TransformRegistry**: Resolves leaf classes to string codecs, caching hits and misses
//! - **GraphCodec**: Identity, reference, type-label and length attributes that let shared
//!   sub-objects and cycles survive a tree
//! - **Binder**: Walks a value graph against its classes to write or read a whole document
//!
//! # Example
//!
//! ```
//! use lattice_core::{Binder, Class, Field, Format, IntType, Object, Value};
//!
//! let node = Class::record("Node")
//!     .field(Field::attribute("n", Class::int(IntType::I32)))
//!     .build();
//!
//! let a = Object::new(node.clone()).with("n", 1).into_shared();
//! let binder = Binder::with_format(Format::new(0)).unwrap();
//! let xml = binder.write_to_string(&node, &Value::from(&a)).unwrap();
//! assert_eq!(xml, r#"<Node id="0" n="1"/>"#);
//!
//! let back = binder.read_str(&node, &xml).unwrap();
//! assert_eq!(back.as_object().unwrap().borrow().value("n").as_i64(), Some(1));
//! ```

mod bind;
mod binder;
mod class;
mod error;
mod family;
mod format;
mod graph;
mod node;
mod schema;
mod transform;
mod value;

pub use bind::Bind;
pub use binder::Binder;
pub use class::{Class, ClassRef, ClassSource, Family, Field, FloatType, IntType, Record, RecordBuilder, Repr, Role};
pub use error::{Error, Result};
pub use family::{BigDecimal, BigInteger, Currency, Locale, TimeZone, Uri};
pub use format::{Contract, Format, Mode};
pub use graph::{GraphCodec, ReadGraph, Type, WriteGraph};
pub use node::{
    Attribute, Event, EventLog, EventReader, EventWriter, InputNode, Logged, Node, NodeBuilder, NodeCursor, NodeId,
    NodeMap, Position, XmlEventReader, XmlEventWriter,
};
pub use schema::Catalog;
pub use transform::{
    ArrayMatcher, ArrayTransform, CharArrayTransform, EnumMatcher, EnumTransform, FamilyMatcher, FamilyTransform,
    Matcher, MatcherChain, PrimitiveMatcher, ScalarTransform, Transform, TransformRegistry,
};
pub use value::{Array, ArrayRef, Object, ObjectRef, Value};

#[cfg(feature = "derive")]
pub use lattice_derive::Bind;
