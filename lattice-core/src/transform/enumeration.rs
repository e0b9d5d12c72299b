use std::sync::Arc;

use crate::class::{ClassRef, Repr};
use crate::error::{Error, Result};
use crate::transform::{Matcher, Transform, TransformRegistry};
use crate::value::Value;

/// Writes an enumeration value as its variant name.
pub struct EnumTransform {
    class: String,
    variants: Vec<String>,
}

impl EnumTransform {
    pub fn new(class: impl Into<String>, variants: Vec<String>) -> Self {
        EnumTransform {
            class: class.into(),
            variants,
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.variants.iter().any(|v| v == name) {
            Ok(())
        } else {
            Err(Error::invalid(&self.class, name, "not a variant"))
        }
    }
}

impl Transform for EnumTransform {
    fn read(&self, text: &str) -> Result<Value> {
        let name = text.trim();
        self.check(name)?;
        Ok(Value::Enum(name.to_string()))
    }

    fn write(&self, value: &Value) -> Result<String> {
        match value {
            Value::Enum(name) => {
                self.check(name)?;
                Ok(name.clone())
            }
            other => Err(Error::invalid(&self.class, format!("{other:?}"), "expected a variant")),
        }
    }
}

/// The default fallback: resolves enumeration classes.
pub struct EnumMatcher;

impl Matcher for EnumMatcher {
    fn matches(&self, class: &ClassRef, _registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
        match class.repr() {
            Repr::Enum(variants) => Ok(Some(Arc::new(EnumTransform::new(class.name(), variants.clone())))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    #[test]
    fn variants_are_checked() {
        let registry = TransformRegistry::new();
        let color = Class::enumeration("Color", ["Red", "Green"]);

        assert!(matches!(registry.read("Green", &color).unwrap(), Value::Enum(ref v) if v == "Green"));
        assert!(registry.read("Blue", &color).is_err());
        assert_eq!(registry.write(&Value::Enum("Red".into()), &color).unwrap(), "Red");
        assert!(registry.write(&Value::Text("Red".into()), &color).is_err());
    }
}
