use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat};
use url::Url;

use crate::class::{ClassRef, Family, Repr};
use crate::error::{Error, Result};
use crate::transform::{Matcher, Transform, TransformRegistry};
use crate::value::Value;

/// Canonical text form of a well-known value family.
///
/// Dates use ISO 8601 (`2024-03-01`), date-times RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyTransform(pub Family);

fn parse<T>(family: Family, text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: ToString,
{
    text.trim().parse::<T>().map_err(|e| Error::invalid(family.name(), text, e))
}

impl Transform for FamilyTransform {
    fn read(&self, text: &str) -> Result<Value> {
        let family = self.0;
        Ok(match family {
            Family::Date => Value::Date(parse::<NaiveDate>(family, text)?),
            Family::DateTime => Value::DateTime(
                DateTime::parse_from_rfc3339(text.trim()).map_err(|e| Error::invalid(family.name(), text, e))?,
            ),
            Family::Locale => Value::Locale(parse(family, text)?),
            Family::Url => Value::Url(Url::parse(text.trim()).map_err(|e| Error::invalid(family.name(), text, e))?),
            Family::Uri => Value::Uri(parse(family, text)?),
            Family::Path => Value::Path(PathBuf::from(text)),
            Family::BigInteger => Value::BigInteger(parse(family, text)?),
            Family::BigDecimal => Value::BigDecimal(parse(family, text)?),
            Family::Currency => Value::Currency(parse(family, text)?),
            Family::TimeZone => Value::TimeZone(parse(family, text)?),
        })
    }

    fn write(&self, value: &Value) -> Result<String> {
        let text = match (self.0, value) {
            (Family::Date, Value::Date(date)) => date.format("%Y-%m-%d").to_string(),
            (Family::DateTime, Value::DateTime(time)) => time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            (Family::Locale, Value::Locale(locale)) => locale.to_string(),
            (Family::Url, Value::Url(url)) => url.to_string(),
            (Family::Uri, Value::Uri(uri)) => uri.to_string(),
            (Family::Path, Value::Path(path)) => path
                .to_str()
                .map(str::to_string)
                .ok_or_else(|| Error::invalid("path", path.display().to_string(), "path is not valid UTF-8"))?,
            (Family::BigInteger, Value::BigInteger(n)) => n.to_string(),
            (Family::BigDecimal, Value::BigDecimal(n)) => n.to_string(),
            (Family::Currency, Value::Currency(c)) => c.to_string(),
            (Family::TimeZone, Value::TimeZone(z)) => z.to_string(),
            (family, value) => {
                return Err(Error::invalid(family.name(), format!("{value:?}"), "value has the wrong type"));
            }
        };
        Ok(text)
    }
}

/// Matches the well-known value families by exact class identity.
pub struct FamilyMatcher;

impl Matcher for FamilyMatcher {
    fn matches(&self, class: &ClassRef, _registry: &TransformRegistry) -> Result<Option<Arc<dyn Transform>>> {
        match class.repr() {
            Repr::Family(family) => Ok(Some(Arc::new(FamilyTransform(*family)))),
            _ => Ok(None),
        }
    }
}
