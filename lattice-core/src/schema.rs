use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::class::{Class, ClassRef, Family, FloatType, IntType, Repr};
use crate::error::{Error, Result};

/// Resolves class names found in type labels.
///
/// A new catalog knows every built-in scalar and family class. Records,
/// enumerations and opaque classes become resolvable once registered,
/// either directly or as a field of a registered record. Array classes are
/// never stored: `T[]` resolves whenever `T` does.
#[derive(Debug)]
pub struct Catalog {
    classes: RwLock<HashMap<String, ClassRef>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        let catalog = Catalog {
            classes: RwLock::new(HashMap::new()),
        };
        let builtins = [Class::boolean(), Class::character(), Class::text()]
            .into_iter()
            .chain(IntType::ALL.into_iter().map(Class::int))
            .chain([FloatType::F32, FloatType::F64].into_iter().map(Class::float))
            .chain(Family::ALL.into_iter().map(Class::family));
        for class in builtins {
            catalog.insert(&class);
        }
        catalog
    }

    /// Registers `class` along with its parents and the classes of its
    /// fields.
    pub fn register(&self, class: &ClassRef) {
        if let Repr::Array(component) = class.repr() {
            return self.register(component);
        }
        if !self.insert(class) {
            return;
        }
        if let Some(parent) = class.parent() {
            self.register(parent);
        }
        if class.is_record() {
            for field in class.fields() {
                self.register(&field.class());
            }
        }
    }

    /// Looks up a class by name.
    pub fn resolve(&self, name: &str) -> Result<ClassRef> {
        if let Some(component) = name.strip_suffix("[]") {
            return Ok(Class::array(self.resolve(component)?));
        }
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        classes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.classes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns false if this exact class was already present.
    fn insert(&self, class: &ClassRef) -> bool {
        let known = |classes: &HashMap<String, ClassRef>| {
            classes.get(class.name()).is_some_and(|existing| Arc::ptr_eq(existing, class))
        };
        if known(&self.classes.read().unwrap_or_else(PoisonError::into_inner)) {
            return false;
        }
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        match classes.get(class.name()) {
            Some(existing) if Arc::ptr_eq(existing, class) => false,
            _ => {
                if classes.insert(class.name().to_string(), class.clone()).is_some() {
                    log::debug!("class {} replaced in catalog", class.name());
                }
                true
            }
        }
    }
}
