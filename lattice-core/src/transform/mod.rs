//! Bidirectional string codecs for leaf values.
//!
//! A [`TransformRegistry`] resolves a class to a [`Transform`] by asking a
//! fixed chain of matchers, first match wins:
//!
//! 1. scalars (booleans, integers, floats, characters, strings)
//! 2. well-known value families (dates, locales, URLs, paths, ...)
//! 3. arrays whose component resolves, as delimiter-joined text
//! 4. a caller-supplied fallback (enumerations by default)
//!
//! Results, including failures, are cached per class handle. Cache entries
//! hold the class weakly and are dropped once the class itself is gone.

mod array;
mod enumeration;
mod family;
mod primitive;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::class::{Class, ClassRef};
use crate::error::{Error, Result};
use crate::value::Value;

pub use array::{ArrayMatcher, ArrayTransform, CharArrayTransform};
pub use enumeration::{EnumMatcher, EnumTransform};
pub use family::{FamilyMatcher, FamilyTransform};
pub use primitive::{PrimitiveMatcher, ScalarTransform};

/// Converts values of exactly one class to and from text.
pub trait Transform: Send + Sync {
    fn read(&self, text: &str) -> Result<Value>;

    fn write(&self, value: &Value) -> Result<String>;
}

/// One link of the resolution chain.
pub trait Matcher: Send + Sync {
    /// Returns a transform for `class`, or None if this matcher does not
    /// handle it. `registry` allows recursive resolution.
    fn matches(&self, class: &ClassRef, registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>>;
}

/// Tries several matchers in order.
#[derive(Default)]
pub struct MatcherChain {
    matchers: Vec<Box<dyn Matcher>>,
}

impl MatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, matcher: impl Matcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }
}

impl Matcher for MatcherChain {
    fn matches(&self, class: &ClassRef, registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
        for matcher in &self.matchers {
            if let Some(transform) = matcher.matches(class, registry)? {
                return Ok(Some(transform));
            }
        }
        Ok(None)
    }
}

fn key(class: &ClassRef) -> usize {
    Arc::as_ptr(class) as usize
}

fn is_entry_for(entry: &Weak<Class>, class: &ClassRef) -> bool {
    entry.strong_count() > 0 && std::ptr::eq(entry.as_ptr(), Arc::as_ptr(class))
}

struct Hit {
    class: Weak<Class>,
    transform: Arc<dyn Transform>,
}

/// Positive and negative resolution results keyed by class handle.
#[derive(Default)]
struct TransformCache {
    hits: RwLock<HashMap<usize, Hit>>,
    misses: RwLock<HashMap<usize, Weak<Class>>>,
}

impl TransformCache {
    fn hit(&self, class: &ClassRef) -> Option<Arc<dyn Transform>> {
        let hits = self.hits.read().unwrap_or_else(PoisonError::into_inner);
        hits.get(&key(class))
            .filter(|hit| is_entry_for(&hit.class, class))
            .map(|hit| hit.transform.clone())
    }

    fn missed(&self, class: &ClassRef) -> bool {
        let misses = self.misses.read().unwrap_or_else(PoisonError::into_inner);
        misses.get(&key(class)).is_some_and(|weak| is_entry_for(weak, class))
    }

    fn insert_hit(&self, class: &ClassRef, transform: Arc<dyn Transform>) {
        let mut hits = self.hits.write().unwrap_or_else(PoisonError::into_inner);
        hits.retain(|_, hit| hit.class.strong_count() > 0);
        hits.insert(
            key(class),
            Hit {
                class: Arc::downgrade(class),
                transform,
            },
        );
    }

    fn insert_miss(&self, class: &ClassRef) {
        let mut misses = self.misses.write().unwrap_or_else(PoisonError::into_inner);
        misses.retain(|_, weak| weak.strong_count() > 0);
        misses.insert(key(class), Arc::downgrade(class));
    }

    fn len(&self) -> (usize, usize) {
        let hits = self.hits.read().unwrap_or_else(PoisonError::into_inner);
        let misses = self.misses.read().unwrap_or_else(PoisonError::into_inner);
        let live_hits = hits.values().filter(|h| h.class.strong_count() > 0).count();
        let live_misses = misses.values().filter(|w| w.strong_count() > 0).count();
        (live_hits, live_misses)
    }
}

/// Resolves classes to transforms, memoizing the outcome.
///
/// The registry is meant to be shared for the life of the process, across
/// calls and threads.
pub struct TransformRegistry {
    fallback: Box<dyn Matcher>,
    cache: TransformCache,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformRegistry {
    /// Creates a registry whose fallback resolves enumeration classes.
    pub fn new() -> Self {
        Self::with_fallback(EnumMatcher)
    }

    /// Creates a registry that consults `fallback` after the built-in chain.
    pub fn with_fallback(fallback: impl Matcher + 'static) -> Self {
        TransformRegistry {
            fallback: Box::new(fallback),
            cache: TransformCache::default(),
        }
    }

    /// Returns the transform for `class`.
    ///
    /// Fails with [`Error::TransformNotFound`] if no matcher handles it.
    /// Both outcomes are cached, so the chain runs at most once per class.
    pub fn lookup(&self, class: &ClassRef) -> Result<Arc<dyn Transform>> {
        if let Some(transform) = self.cache.hit(class) {
            return Ok(transform);
        }
        if self.cache.missed(class) {
            return Err(Error::TransformNotFound(class.name().to_string()));
        }
        match self.resolve(class)? {
            Some(transform) => {
                self.cache.insert_hit(class, transform.clone());
                Ok(transform)
            }
            None => {
                log::debug!("no transform for class {}", class.name());
                self.cache.insert_miss(class);
                Err(Error::TransformNotFound(class.name().to_string()))
            }
        }
    }

    /// Returns true if `class` is a leaf with a text form.
    pub fn valid(&self, class: &ClassRef) -> Result<bool> {
        match self.lookup(class) {
            Ok(_) => Ok(true),
            Err(Error::TransformNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn read(&self, text: &str, class: &ClassRef) -> Result<Value> {
        self.lookup(class)?.read(text)
    }

    pub fn write(&self, value: &Value, class: &ClassRef) -> Result<String> {
        self.lookup(class)?.write(value)
    }

    /// Number of live cached (hits, misses).
    pub fn cached(&self) -> (usize, usize) {
        self.cache.len()
    }

    fn resolve(&self, class: &ClassRef) -> Result<Option<Arc<dyn Transform>>> {
        let chain: [&dyn Matcher; 4] = [&PrimitiveMatcher, &FamilyMatcher, &ArrayMatcher, self.fallback.as_ref()];
        for matcher in chain {
            if let Some(transform) = matcher.matches(class, self)? {
                return Ok(Some(transform));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Field, IntType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often the fallback is consulted.
    struct Counting(Arc<AtomicUsize>);

    impl Matcher for Counting {
        fn matches(&self, _class: &ClassRef, _registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct Upper;

    impl Transform for Upper {
        fn read(&self, text: &str) -> Result<Value> {
            Ok(Value::Opaque(text.to_lowercase()))
        }

        fn write(&self, value: &Value) -> Result<String> {
            Ok(value.as_str().unwrap_or_default().to_uppercase())
        }
    }

    struct UpperMatcher;

    impl Matcher for UpperMatcher {
        fn matches(&self, class: &ClassRef, _registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
            Ok((class.name() == "Shout").then(|| Arc::new(Upper) as Arc<dyn Transform>))
        }
    }

    #[test]
    fn negative_result_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = TransformRegistry::with_fallback(Counting(calls.clone()));
        let widget = Class::opaque("Widget");

        let first = registry.lookup(&widget);
        let second = registry.lookup(&widget);

        assert!(matches!(first, Err(Error::TransformNotFound(ref name)) if name == "Widget"));
        assert!(matches!(second, Err(Error::TransformNotFound(ref name)) if name == "Widget"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn positive_result_is_cached() {
        let registry = TransformRegistry::new();
        let first = registry.lookup(&Class::int(IntType::I32)).unwrap();
        let second = registry.lookup(&Class::int(IntType::I32)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn dead_classes_leave_the_cache() {
        let registry = TransformRegistry::new();
        let gone = Class::opaque("Gone");
        assert!(!registry.valid(&gone).unwrap());
        assert_eq!(registry.cached(), (0, 1));

        drop(gone);
        assert_eq!(registry.cached(), (0, 0));

        let kept = Class::opaque("Kept");
        assert!(!registry.valid(&kept).unwrap());
        assert_eq!(registry.cached(), (0, 1));
    }

    #[test]
    fn fallback_resolves_custom_type() {
        let registry = TransformRegistry::with_fallback(MatcherChain::new().with(EnumMatcher).with(UpperMatcher));
        let shout = Class::opaque("Shout");
        assert_eq!(registry.write(&Value::Opaque("hey".into()), &shout).unwrap(), "HEY");
        assert!(matches!(registry.read("HEY", &shout).unwrap(), Value::Opaque(ref s) if s == "hey"));

        let color = Class::enumeration("Color", ["Red", "Green"]);
        assert!(registry.valid(&color).unwrap());
    }

    #[test]
    fn records_are_not_leaves() {
        let registry = TransformRegistry::new();
        let record = Class::record("Point")
            .field(Field::attribute("x", Class::int(IntType::I32)))
            .build();
        assert!(!registry.valid(&record).unwrap());
        assert!(!registry.valid(&Class::array(record)).unwrap());
    }

    #[test]
    fn shared_across_threads() {
        let registry = Arc::new(TransformRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.read("42", &Class::int(IntType::U8)).map(|v| v.as_u64()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), Some(42));
        }
    }
}
