use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use url::Url;

use crate::class::{Class, ClassRef};
use crate::error::{Error, Result};
use crate::family::{BigDecimal, BigInteger, Currency, Locale, TimeZone, Uri};

/// Shared, mutable handle to an object. Identity is the allocation.
pub type ObjectRef = Rc<RefCell<Object>>;

/// Shared, mutable handle to an array. Identity is the allocation.
pub type ArrayRef = Rc<RefCell<Array>>;

/// An instance of a record class.
pub struct Object {
    class: ClassRef,
    fields: IndexMap<String, Value>,
}

impl Object {
    /// Creates an instance with every field set to null.
    pub fn new(class: ClassRef) -> Self {
        let fields = class
            .fields()
            .into_iter()
            .map(|f| (f.name().to_string(), Value::Null))
            .collect();
        Object { class, fields }
    }

    pub fn shared(class: ClassRef) -> ObjectRef {
        Rc::new(RefCell::new(Object::new(class)))
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the field value, or null when unset.
    pub fn value(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`Object::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn into_shared(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field values may point back at this object, so only names are shown.
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A fixed-length sequence of values of one component class.
pub struct Array {
    component: ClassRef,
    items: Vec<Value>,
}

impl Array {
    /// Creates an array of `length` nulls.
    pub fn new(component: ClassRef, length: usize) -> Self {
        Array {
            component,
            items: vec![Value::Null; length],
        }
    }

    /// Like [`Array::new`], but fails instead of aborting when `length`
    /// nulls cannot be allocated.
    pub fn try_new(component: ClassRef, length: usize) -> Result<Self> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(length)
            .map_err(|e| Error::invalid(format!("{}[]", component.name()), length.to_string(), e))?;
        items.resize(length, Value::Null);
        Ok(Array { component, items })
    }

    pub fn from_items(component: ClassRef, items: impl IntoIterator<Item = Value>) -> Self {
        Array {
            component,
            items: items.into_iter().collect(),
        }
    }

    pub fn shared(component: ClassRef, length: usize) -> ArrayRef {
        Rc::new(RefCell::new(Array::new(component, length)))
    }

    pub fn into_shared(self) -> ArrayRef {
        Rc::new(RefCell::new(self))
    }

    pub fn component(&self) -> &ClassRef {
        &self.component
    }

    /// The array class, named after the component.
    pub fn class(&self) -> ClassRef {
        Class::array(self.component.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Replaces the item at `index`, returning false if out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({}[{}])", self.component.name(), self.items.len())
    }
}

/// A dynamically typed value in an object graph.
///
/// Leaf variants are plain values. `Object` and `Array` are shared handles;
/// cloning them clones the handle, not the target.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Locale(Locale),
    Url(Url),
    Uri(Uri),
    Path(PathBuf),
    BigInteger(BigInteger),
    BigDecimal(BigDecimal),
    Currency(Currency),
    TimeZone(TimeZone),
    /// A variant name of an enumeration class.
    Enum(String),
    /// Text form of a caller-defined value type.
    Opaque(String),
    Object(ObjectRef),
    Array(ArrayRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) | Value::Enum(text) | Value::Opaque(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Address of the shared target, for objects and arrays only.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(object) => Some(Rc::as_ptr(object) as *const () as usize),
            Value::Array(array) => Some(Rc::as_ptr(array) as *const () as usize),
            _ => None,
        }
    }

    /// Returns true if both values are handles to the same target.
    pub fn same(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Char(v) => write!(f, "Char({v:?})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::UInt(v) => write!(f, "UInt({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Text(v) => write!(f, "Text({v:?})"),
            Value::Date(v) => write!(f, "Date({v})"),
            Value::DateTime(v) => write!(f, "DateTime({})", v.to_rfc3339()),
            Value::Locale(v) => write!(f, "Locale({v})"),
            Value::Url(v) => write!(f, "Url({v})"),
            Value::Uri(v) => write!(f, "Uri({v})"),
            Value::Path(v) => write!(f, "Path({})", v.display()),
            Value::BigInteger(v) => write!(f, "BigInteger({v})"),
            Value::BigDecimal(v) => write!(f, "BigDecimal({v})"),
            Value::Currency(v) => write!(f, "Currency({v})"),
            Value::TimeZone(v) => write!(f, "TimeZone({v})"),
            Value::Enum(v) => write!(f, "Enum({v})"),
            Value::Opaque(v) => write!(f, "Opaque({v:?})"),
            Value::Object(object) => match object.try_borrow() {
                Ok(inner) => write!(f, "Object({}@{:p})", inner.class().name(), Rc::as_ptr(object)),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
            Value::Array(array) => match array.try_borrow() {
                Ok(array) => write!(f, "{array:?}"),
                Err(_) => f.write_str("Array(<borrowed>)"),
            },
        }
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl From<&ObjectRef> for Value {
    fn from(object: &ObjectRef) -> Self {
        Value::Object(object.clone())
    }
}

impl From<ArrayRef> for Value {
    fn from(array: ArrayRef) -> Self {
        Value::Array(array)
    }
}

impl From<&ArrayRef> for Value {
    fn from(array: &ArrayRef) -> Self {
        Value::Array(array.clone())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

macro_rules! value_from_int {
    ($variant:ident, $wide:ty, $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$wide>::from(v))
                }
            }
        )*
    };
}

value_from_int!(Int, i64, i8, i16, i32, i64);
value_from_int!(UInt, u64, u8, u16, u32, u64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
