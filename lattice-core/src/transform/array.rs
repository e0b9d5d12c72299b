use std::sync::Arc;

use crate::class::{ClassRef, Repr};
use crate::error::{Error, Result};
use crate::transform::{Matcher, Transform, TransformRegistry};
use crate::value::{Array, Value};

/// An array of leaves written as one delimiter-joined run of text.
///
/// Each token is trimmed on read, so `1, 2,3` reads as three items. Items are
/// not quoted: a string item that contains the delimiter reads back as
/// several items. Lists of arbitrary strings belong in a collection field
/// (`#[bind(collection)]`), which writes one element per item.
pub struct ArrayTransform {
    component: ClassRef,
    inner: Arc<dyn Transform>,
    delimiter: char,
}

impl ArrayTransform {
    pub fn new(component: ClassRef, inner: Arc<dyn Transform>) -> Self {
        Self::with_delimiter(component, inner, ',')
    }

    pub fn with_delimiter(component: ClassRef, inner: Arc<dyn Transform>, delimiter: char) -> Self {
        ArrayTransform {
            component,
            inner,
            delimiter,
        }
    }

    fn class_name(&self) -> String {
        format!("{}[]", self.component.name())
    }
}

impl Transform for ArrayTransform {
    fn read(&self, text: &str) -> Result<Value> {
        let mut array = Array::new(self.component.clone(), 0);
        if !text.trim().is_empty() {
            for token in text.split(self.delimiter) {
                array.push(self.inner.read(token.trim())?);
            }
        }
        Ok(Value::Array(array.into_shared()))
    }

    fn write(&self, value: &Value) -> Result<String> {
        let array = value
            .as_array()
            .ok_or_else(|| Error::invalid(self.class_name(), format!("{value:?}"), "expected an array"))?;
        let array = array.borrow();
        let mut parts = Vec::with_capacity(array.len());
        for item in array.items() {
            if item.is_null() {
                return Err(Error::invalid(self.class_name(), "null", "arrays written as text cannot hold nulls"));
            }
            parts.push(self.inner.write(item)?);
        }
        Ok(parts.join(&format!("{} ", self.delimiter)))
    }
}

/// A character array written as one contiguous run of text.
pub struct CharArrayTransform {
    component: ClassRef,
}

impl CharArrayTransform {
    pub fn new(component: ClassRef) -> Self {
        CharArrayTransform { component }
    }
}

impl Transform for CharArrayTransform {
    fn read(&self, text: &str) -> Result<Value> {
        let array = Array::from_items(self.component.clone(), text.chars().map(Value::Char));
        Ok(Value::Array(array.into_shared()))
    }

    fn write(&self, value: &Value) -> Result<String> {
        let invalid = || Error::invalid("char[]", format!("{value:?}"), "expected an array of characters");
        let array = value.as_array().ok_or_else(invalid)?;
        let array = array.borrow();
        array
            .items()
            .iter()
            .map(|item| match item {
                Value::Char(c) => Ok(*c),
                _ => Err(invalid()),
            })
            .collect()
    }
}

/// Matches arrays whose component is a leaf with a transform of its own.
///
/// Arrays of arrays never match, so the inner boundaries survive as entry
/// elements of a composite array.
pub struct ArrayMatcher;

impl Matcher for ArrayMatcher {
    fn matches(&self, class: &ClassRef, registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
        let Repr::Array(component) = class.repr() else {
            return Ok(None);
        };
        if component.is_array() {
            return Ok(None);
        }
        if matches!(component.repr(), Repr::Char) {
            return Ok(Some(Arc::new(CharArrayTransform::new(component.clone()))));
        }
        match registry.lookup(component) {
            Ok(inner) => Ok(Some(Arc::new(ArrayTransform::new(component.clone(), inner)))),
            Err(Error::TransformNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, IntType};

    #[test]
    fn integer_array_trims_tokens() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::int(IntType::I32));
        let value = registry.read(" 1, 2 ,3", &class).unwrap();

        let array = value.as_array().unwrap().borrow();
        let items: Vec<_> = array.items().iter().filter_map(Value::as_i64).collect();
        assert_eq!(items, vec![1, 2, 3]);
        drop(array);

        assert_eq!(registry.write(&value, &class).unwrap(), "1, 2, 3");
    }

    #[test]
    fn char_array_has_no_delimiter() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::character());
        let value = registry.read("a, b", &class).unwrap();
        assert_eq!(value.as_array().unwrap().borrow().len(), 4);
        assert_eq!(registry.write(&value, &class).unwrap(), "a, b");
    }

    #[test]
    fn empty_text_is_empty_array() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::text());
        let value = registry.read("", &class).unwrap();
        assert!(value.as_array().unwrap().borrow().is_empty());
        assert_eq!(registry.write(&value, &class).unwrap(), "");
    }

    #[test]
    fn nested_arrays_are_not_leaves() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::array(Class::int(IntType::I32)));
        assert!(!registry.valid(&class).unwrap());
        assert!(registry.valid(class.component().unwrap()).unwrap());
        assert!(!registry.valid(&Class::array(Class::array(Class::character()))).unwrap());
    }

    #[test]
    fn delimiter_inside_a_string_item_splits_it() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::text());
        let value = Value::Array(Array::from_items(Class::text(), [Value::from("a, b")]).into_shared());
        let text = registry.write(&value, &class).unwrap();
        let back = registry.read(&text, &class).unwrap();
        assert_eq!(back.as_array().unwrap().borrow().len(), 2);
    }

    #[test]
    fn null_items_are_rejected() {
        let registry = TransformRegistry::new();
        let class = Class::array(Class::text());
        let array = Array::new(Class::text(), 1).into_shared();
        assert!(registry.write(&Value::Array(array), &class).is_err());
    }
}
