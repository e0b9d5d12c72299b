use std::collections::HashMap;

use crate::class::ClassRef;
use crate::error::Result;
use crate::format::Contract;
use crate::node::NodeMap;
use crate::value::Value;

/// Identity map for one write call.
///
/// Keyed by allocation address, never by equality: two equal but distinct
/// objects get two tokens.
#[derive(Debug)]
pub struct WriteGraph {
    contract: Contract,
    tokens: HashMap<usize, String>,
    /// Keeps every tracked allocation alive so no address is reused while
    /// the graph exists.
    held: Vec<Value>,
}

impl WriteGraph {
    pub(crate) fn new(contract: Contract) -> Self {
        WriteGraph {
            contract,
            tokens: HashMap::new(),
            held: Vec::new(),
        }
    }

    /// Writes the reserved attributes for `value` declared as `declared`.
    ///
    /// Returns true when the element is complete: `value` was written
    /// earlier in this call and only a reference was added. Returns false
    /// when the caller must go on to write the element's content. Values
    /// without identity get no attributes and always return false.
    pub fn set_element(&mut self, declared: &ClassRef, value: &Value, attributes: &mut NodeMap) -> Result<bool> {
        let Some(identity) = value.identity() else {
            return Ok(false);
        };

        if let Some(label) = self.label(declared, value) {
            attributes.put(&self.contract.label, label);
        }
        if let Value::Array(array) = value {
            attributes.put(&self.contract.length, array.borrow().len().to_string());
        }

        if let Some(token) = self.tokens.get(&identity) {
            attributes.put(&self.contract.reference, token.as_str());
            return Ok(true);
        }

        let token = self.tokens.len().to_string();
        log::debug!("assigned token {token} to {value:?}");
        attributes.put(&self.contract.identity, token.as_str());
        self.tokens.insert(identity, token);
        self.held.push(value.clone());
        Ok(false)
    }

    /// Number of tokens assigned so far.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The type label for `value`, or None when its class is the declared
    /// one. Arrays declared as arrays are labelled by component.
    fn label(&self, declared: &ClassRef, value: &Value) -> Option<String> {
        match value {
            Value::Object(object) => {
                let object = object.borrow();
                (object.class().name() != declared.name()).then(|| object.class().name().to_string())
            }
            Value::Array(array) => {
                let array = array.borrow();
                match declared.component() {
                    Some(expected) if expected.name() == array.component().name() => None,
                    Some(_) => Some(array.component().name().to_string()),
                    None => Some(array.class().name().to_string()),
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, Field, IntType};
    use crate::value::{Array, Object};

    fn base() -> ClassRef {
        Class::record("Base")
            .field(Field::attribute("n", Class::int(IntType::I32)).optional())
            .build()
    }

    #[test]
    fn tokens_are_sequential_from_zero() {
        let class = base();
        let mut graph = WriteGraph::new(Contract::default());
        for expected in ["0", "1", "2"] {
            let mut attributes = NodeMap::new();
            let value = Value::Object(Object::shared(class.clone()));
            assert!(!graph.set_element(&class, &value, &mut attributes).unwrap());
            assert_eq!(attributes.value("id"), Some(expected));
        }
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn equal_objects_are_distinct() {
        let class = base();
        let mut graph = WriteGraph::new(Contract::default());
        let a = Value::Object(Object::shared(class.clone()));
        let b = Value::Object(Object::shared(class.clone()));

        let mut attributes = NodeMap::new();
        graph.set_element(&class, &a, &mut attributes).unwrap();
        let mut attributes = NodeMap::new();
        assert!(!graph.set_element(&class, &b, &mut attributes).unwrap());
        assert_eq!(attributes.value("id"), Some("1"));
    }

    #[test]
    fn subclass_gets_label() {
        let base = base();
        let derived = Class::record("Derived").extends(&base).build();
        let mut graph = WriteGraph::new(Contract::default());
        let mut attributes = NodeMap::new();
        let value = Value::Object(Object::shared(derived));
        graph.set_element(&base, &value, &mut attributes).unwrap();
        assert_eq!(attributes.value("class"), Some("Derived"));
    }

    #[test]
    fn arrays_carry_length_and_component_label() {
        let base = base();
        let derived = Class::record("Derived").extends(&base).build();
        let declared = Class::array(base);
        let value = Value::Array(Array::shared(derived, 3));

        let mut graph = WriteGraph::new(Contract::default());
        let mut attributes = NodeMap::new();
        graph.set_element(&declared, &value, &mut attributes).unwrap();
        assert_eq!(attributes.value("length"), Some("3"));
        assert_eq!(attributes.value("class"), Some("Derived"));
        assert_eq!(attributes.value("id"), Some("0"));
    }

    #[test]
    fn leaves_are_untracked() {
        let mut graph = WriteGraph::new(Contract::default());
        let mut attributes = NodeMap::new();
        assert!(!graph.set_element(&Class::text(), &Value::from("x"), &mut attributes).unwrap());
        assert!(attributes.is_empty());
        assert!(graph.is_empty());
    }
}
