use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use url::Url;

use crate::class::{Class, ClassRef, Family, FloatType, IntType};
use crate::error::{Error, Result};
use crate::family::{BigDecimal, BigInteger, Currency, Locale, TimeZone, Uri};
use crate::value::{Array, Value};

/// A Rust type with a class descriptor and a mapping to [`Value`].
///
/// Usually derived with `#[derive(Bind)]`. Values produced by
/// [`Bind::to_value`] are trees: a typed value never shares sub-objects,
/// so graphs with sharing or cycles are built from [`Value`] directly.
pub trait Bind: Sized {
    /// The class describing values of this type.
    fn class() -> ClassRef;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(class: &str, value: &Value) -> Error {
    Error::invalid(class, format!("{value:?}"), "value has the wrong type")
}

macro_rules! impl_bind_int {
    ($($t:ty => $kind:ident, $read:ident);* $(;)?) => {
        $(
            impl Bind for $t {
                fn class() -> ClassRef {
                    Class::int(IntType::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: &Value) -> Result<Self> {
                    value
                        .$read()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| mismatch(IntType::$kind.name(), value))
                }
            }
        )*
    };
}

impl_bind_int! {
    i8 => I8, as_i64;
    i16 => I16, as_i64;
    i32 => I32, as_i64;
    i64 => I64, as_i64;
    u8 => U8, as_u64;
    u16 => U16, as_u64;
    u32 => U32, as_u64;
    u64 => U64, as_u64;
}

/// Types held in one `Value` variant and cloned in and out of it.
macro_rules! impl_bind_variant {
    ($($t:ty => $class:expr, $variant:ident);* $(;)?) => {
        $(
            impl Bind for $t {
                fn class() -> ClassRef {
                    $class
                }

                fn to_value(&self) -> Value {
                    Value::$variant(Clone::clone(self))
                }

                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v.clone()),
                        other => Err(mismatch(Self::class().name(), other)),
                    }
                }
            }
        )*
    };
}

impl_bind_variant! {
    bool => Class::boolean(), Bool;
    char => Class::character(), Char;
    f64 => Class::float(FloatType::F64), Float;
    String => Class::text(), Text;
    NaiveDate => Class::family(Family::Date), Date;
    DateTime<FixedOffset> => Class::family(Family::DateTime), DateTime;
    Url => Class::family(Family::Url), Url;
    PathBuf => Class::family(Family::Path), Path;
    Locale => Class::family(Family::Locale), Locale;
    Uri => Class::family(Family::Uri), Uri;
    BigInteger => Class::family(Family::BigInteger), BigInteger;
    BigDecimal => Class::family(Family::BigDecimal), BigDecimal;
    Currency => Class::family(Family::Currency), Currency;
    TimeZone => Class::family(Family::TimeZone), TimeZone;
}

impl Bind for f32 {
    fn class() -> ClassRef {
        Class::float(FloatType::F32)
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v as f32),
            other => Err(mismatch("f32", other)),
        }
    }
}

/// `None` is null. The class is the class of `T`.
impl<T: Bind> Bind for Option<T> {
    fn class() -> ClassRef {
        T::class()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map(T::to_value).unwrap_or(Value::Null)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: Bind> Bind for Box<T> {
    fn class() -> ClassRef {
        T::class()
    }

    fn to_value(&self) -> Value {
        T::to_value(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

/// An array of `T`. Null reads as an empty vector.
impl<T: Bind> Bind for Vec<T> {
    fn class() -> ClassRef {
        Class::array(T::class())
    }

    fn to_value(&self) -> Value {
        let array = Array::from_items(T::class(), self.iter().map(T::to_value));
        Value::Array(array.into_shared())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(array) => array.borrow().items().iter().map(T::from_value).collect(),
            other => Err(mismatch(Self::class().name(), other)),
        }
    }
}
