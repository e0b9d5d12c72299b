use std::sync::Arc;

use crate::class::{ClassRef, FloatType, IntType, Repr};
use crate::error::{Error, Result};
use crate::transform::{Matcher, Transform, TransformRegistry};
use crate::value::Value;

/// Native parse/format for one scalar class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarTransform {
    Bool,
    Char,
    Int(IntType),
    Float(FloatType),
    Text,
}

impl ScalarTransform {
    fn name(self) -> &'static str {
        match self {
            ScalarTransform::Bool => "bool",
            ScalarTransform::Char => "char",
            ScalarTransform::Int(kind) => kind.name(),
            ScalarTransform::Float(kind) => kind.name(),
            ScalarTransform::Text => "string",
        }
    }

    fn mismatch(self, value: &Value) -> Error {
        Error::invalid(self.name(), format!("{value:?}"), "value has the wrong type")
    }
}

fn read_int(kind: IntType, text: &str) -> std::result::Result<Value, std::num::ParseIntError> {
    Ok(match kind {
        IntType::I8 => Value::from(text.parse::<i8>()?),
        IntType::I16 => Value::from(text.parse::<i16>()?),
        IntType::I32 => Value::from(text.parse::<i32>()?),
        IntType::I64 => Value::from(text.parse::<i64>()?),
        IntType::U8 => Value::from(text.parse::<u8>()?),
        IntType::U16 => Value::from(text.parse::<u16>()?),
        IntType::U32 => Value::from(text.parse::<u32>()?),
        IntType::U64 => Value::from(text.parse::<u64>()?),
    })
}

fn fits(kind: IntType, value: &Value) -> Option<String> {
    let text = match kind {
        IntType::I8 => i8::try_from(value.as_i64()?).ok()?.to_string(),
        IntType::I16 => i16::try_from(value.as_i64()?).ok()?.to_string(),
        IntType::I32 => i32::try_from(value.as_i64()?).ok()?.to_string(),
        IntType::I64 => value.as_i64()?.to_string(),
        IntType::U8 => u8::try_from(value.as_u64()?).ok()?.to_string(),
        IntType::U16 => u16::try_from(value.as_u64()?).ok()?.to_string(),
        IntType::U32 => u32::try_from(value.as_u64()?).ok()?.to_string(),
        IntType::U64 => value.as_u64()?.to_string(),
    };
    Some(text)
}

impl Transform for ScalarTransform {
    fn read(&self, text: &str) -> Result<Value> {
        match *self {
            ScalarTransform::Bool => match text.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(Error::invalid("bool", text, "expected true or false")),
            },
            ScalarTransform::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(Error::invalid("char", text, "expected exactly one character")),
                }
            }
            ScalarTransform::Int(kind) => {
                read_int(kind, text.trim()).map_err(|e| Error::invalid(kind.name(), text, e))
            }
            ScalarTransform::Float(FloatType::F32) => text
                .trim()
                .parse::<f32>()
                .map(Value::from)
                .map_err(|e| Error::invalid("f32", text, e)),
            ScalarTransform::Float(FloatType::F64) => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| Error::invalid("f64", text, e)),
            ScalarTransform::Text => Ok(Value::Text(text.to_string())),
        }
    }

    fn write(&self, value: &Value) -> Result<String> {
        match (*self, value) {
            (ScalarTransform::Bool, Value::Bool(b)) => Ok(b.to_string()),
            (ScalarTransform::Char, Value::Char(c)) => Ok(c.to_string()),
            (ScalarTransform::Int(kind), Value::Int(_) | Value::UInt(_)) => fits(kind, value)
                .ok_or_else(|| Error::invalid(kind.name(), format!("{value:?}"), "out of range")),
            (ScalarTransform::Float(FloatType::F32), Value::Float(v)) => Ok((*v as f32).to_string()),
            (ScalarTransform::Float(FloatType::F64), Value::Float(v)) => Ok(v.to_string()),
            (ScalarTransform::Text, Value::Text(text)) => Ok(text.clone()),
            (transform, value) => Err(transform.mismatch(value)),
        }
    }
}

/// Matches the built-in scalar classes.
pub struct PrimitiveMatcher;

impl Matcher for PrimitiveMatcher {
    fn matches(&self, class: &ClassRef, _registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
        let transform = match class.repr() {
            Repr::Bool => ScalarTransform::Bool,
            Repr::Char => ScalarTransform::Char,
            Repr::Int(kind) => ScalarTransform::Int(*kind),
            Repr::Float(kind) => ScalarTransform::Float(*kind),
            Repr::Text => ScalarTransform::Text,
            _ => return Ok(None),
        };
        Ok(Some(Arc::new(transform)))
    }
}
