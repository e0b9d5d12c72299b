use std::collections::HashMap;

use crate::class::{Class, ClassRef};
use crate::error::{Error, Result};
use crate::format::Contract;
use crate::graph::Type;
use crate::node::NodeMap;
use crate::schema::Catalog;
use crate::value::Value;

/// Token table for one read call.
#[derive(Debug)]
pub struct ReadGraph {
    contract: Contract,
    values: HashMap<String, Value>,
}

impl ReadGraph {
    pub(crate) fn new(contract: Contract) -> Self {
        ReadGraph {
            contract,
            values: HashMap::new(),
        }
    }

    /// Decides how the element carrying `attributes` is built.
    ///
    /// Consumes the reserved attributes, leaving only the element's own.
    /// A type label must name `declared` or a descendant of it; for arrays
    /// it names the component.
    pub fn get_element(&mut self, declared: &ClassRef, attributes: &mut NodeMap, catalog: &Catalog) -> Result<Type> {
        let class = self.read_label(declared, attributes, catalog)?;
        let length = match attributes.remove(&self.contract.length) {
            Some(length) if class.is_array() => Some(
                length
                    .value()
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| Error::invalid(class.name(), length.value(), e))?,
            ),
            Some(length) => {
                return Err(Error::invalid(class.name(), length.value(), "only arrays carry a length"));
            }
            None => None,
        };

        if let Some(identity) = attributes.remove(&self.contract.identity) {
            let token = identity.into_value();
            if self.values.contains_key(&token) {
                return Err(Error::DuplicateToken(token));
            }
            return Ok(Type::Allocate { class, length, token });
        }

        if let Some(reference) = attributes.remove(&self.contract.reference) {
            let token = reference.into_value();
            let value = self
                .values
                .get(&token)
                .cloned()
                .ok_or(Error::UnknownToken(token))?;
            return Ok(Type::Reference { class, value });
        }

        Ok(Type::Instance { class, length })
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn register(&mut self, token: String, value: Value) -> Result<()> {
        if self.values.contains_key(&token) {
            return Err(Error::DuplicateToken(token));
        }
        log::debug!("registered token {token} as {value:?}");
        self.values.insert(token, value);
        Ok(())
    }

    fn read_label(&self, declared: &ClassRef, attributes: &mut NodeMap, catalog: &Catalog) -> Result<ClassRef> {
        let Some(label) = attributes.remove(&self.contract.label) else {
            return Ok(declared.clone());
        };
        let named = catalog.resolve(label.value())?;
        let actual = match declared.component() {
            Some(_) if !named.is_array() => Class::array(named),
            _ => named,
        };
        if !declared.is_assignable_from(&actual) {
            return Err(Error::IncompatibleClass {
                declared: declared.name().to_string(),
                actual: actual.name().to_string(),
            });
        }
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Field;

    fn base() -> ClassRef {
        Class::record("Base")
            .field(Field::attribute("n", Class::text()).optional())
            .build()
    }

    fn attributes(pairs: &[(&str, &str)]) -> NodeMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn unknown_reference_fails() {
        let mut graph = ReadGraph::new(Contract::default());
        let err = graph
            .get_element(&base(), &mut attributes(&[("reference", "7")]), &Catalog::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownToken(ref token) if token == "7"));
        assert!(err.is_cycle_error());
    }

    #[test]
    fn duplicate_identity_fails_on_second_occurrence() {
        let class = base();
        let catalog = Catalog::new();
        let mut graph = ReadGraph::new(Contract::default());

        let first = graph.get_element(&class, &mut attributes(&[("id", "3")]), &catalog).unwrap();
        first.construct(&mut graph).unwrap();

        let err = graph
            .get_element(&class, &mut attributes(&[("id", "3")]), &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateToken(ref token) if token == "3"));
    }

    #[test]
    fn registration_waits_for_construction() {
        let class = base();
        let catalog = Catalog::new();
        let mut graph = ReadGraph::new(Contract::default());

        let pending = graph.get_element(&class, &mut attributes(&[("id", "0")]), &catalog).unwrap();
        assert!(graph.is_empty());
        assert!(matches!(
            graph.get_element(&class, &mut attributes(&[("reference", "0")]), &catalog),
            Err(Error::UnknownToken(_))
        ));
        pending.construct(&mut graph).unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn reserved_attributes_are_consumed() {
        let class = base();
        let mut map = attributes(&[("id", "0"), ("n", "kept")]);
        let mut graph = ReadGraph::new(Contract::default());
        graph.get_element(&class, &mut map, &Catalog::new()).unwrap();
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["n"]);
    }

    #[test]
    fn array_label_names_component() {
        let base = base();
        let derived = Class::record("Derived").extends(&base).build();
        let catalog = Catalog::new();
        catalog.register(&derived);

        let mut graph = ReadGraph::new(Contract::default());
        let mut map = attributes(&[("class", "Derived"), ("length", "3")]);
        let element = graph.get_element(&Class::array(base), &mut map, &catalog).unwrap();
        match element {
            Type::Instance { class, length } => {
                assert_eq!(class.name(), "Derived[]");
                assert_eq!(length, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn label_must_be_compatible() {
        let catalog = Catalog::new();
        let other = Class::record("Other").build();
        catalog.register(&other);

        let mut graph = ReadGraph::new(Contract::default());
        let err = graph
            .get_element(&base(), &mut attributes(&[("class", "Other")]), &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleClass { .. }));

        let err = graph
            .get_element(&base(), &mut attributes(&[("class", "Missing")]), &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownClass(ref name) if name == "Missing"));
    }

    #[test]
    fn bad_length_is_invalid() {
        let mut graph = ReadGraph::new(Contract::default());
        let err = graph
            .get_element(&Class::array(base()), &mut attributes(&[("length", "three")]), &Catalog::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }
}
