//! Object identity on top of a tree-shaped document.
//!
//! Every object or array written gets a token in the identity attribute
//! on its first occurrence. Later occurrences of the same instance carry
//! only the reference attribute, so shared sub-objects stay shared and
//! cycles terminate. Type labels and array lengths ride along as two more
//! reserved attributes.
//!
//! A [`WriteGraph`] or [`ReadGraph`] lives for exactly one top-level call.

mod read;
mod write;

use crate::class::{ClassRef, Repr};
use crate::error::{Error, Result};
use crate::format::Contract;
use crate::value::{Array, Object, Value};

pub use read::ReadGraph;
pub use write::WriteGraph;

/// Creates per-call graphs that share one attribute contract.
#[derive(Debug, Clone, Default)]
pub struct GraphCodec {
    contract: Contract,
}

impl GraphCodec {
    pub fn new(contract: Contract) -> Result<Self> {
        contract.validate()?;
        Ok(GraphCodec { contract })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn write_graph(&self) -> WriteGraph {
        WriteGraph::new(self.contract.clone())
    }

    pub fn read_graph(&self) -> ReadGraph {
        ReadGraph::new(self.contract.clone())
    }
}

/// What the reader should do with an element, decided from its reserved
/// attributes alone.
#[derive(Debug)]
pub enum Type {
    /// A fresh instance with no identity.
    Instance { class: ClassRef, length: Option<usize> },
    /// A fresh instance registered under `token` as soon as it exists.
    Allocate {
        class: ClassRef,
        length: Option<usize>,
        token: String,
    },
    /// An instance read earlier in the document.
    Reference { class: ClassRef, value: Value },
}

impl Type {
    /// The concrete class of the element.
    pub fn class(&self) -> &ClassRef {
        match self {
            Type::Instance { class, .. } | Type::Allocate { class, .. } | Type::Reference { class, .. } => class,
        }
    }

    /// True when the element must not be populated.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference { .. })
    }

    /// Produces the value for the element.
    ///
    /// Instances come back empty, ready to be populated. An allocated
    /// instance is registered before it is returned, so its own children
    /// may refer back to it.
    pub fn construct(self, graph: &mut ReadGraph) -> Result<Value> {
        match self {
            Type::Instance { class, length } => instantiate(&class, length),
            Type::Allocate { class, length, token } => {
                let value = instantiate(&class, length)?;
                graph.register(token, value.clone())?;
                Ok(value)
            }
            Type::Reference { value, .. } => Ok(value),
        }
    }
}

fn instantiate(class: &ClassRef, length: Option<usize>) -> Result<Value> {
    match class.repr() {
        Repr::Record(_) => Ok(Value::Object(Object::shared(class.clone()))),
        Repr::Array(component) => {
            let array = Array::try_new(component.clone(), length.unwrap_or(0))?;
            Ok(Value::Array(array.into_shared()))
        }
        _ => Err(Error::structural(format!("class {} cannot be instantiated", class.name()))),
    }
}
