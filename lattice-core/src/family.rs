//! Text-backed value types for the well-known families that have no
//! dedicated crate in the stack.
//!
//! Each type validates its canonical form on parse and displays it back
//! unchanged.

use std::fmt;
use std::str::FromStr;

macro_rules! text_value {
    ($(#[$doc:meta])* $name:ident, $check:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let check: fn(&str) -> Result<String, String> = $check;
                check(text).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

fn digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn split_sign(text: &str) -> &str {
    text.strip_prefix(['-', '+']).unwrap_or(text)
}

text_value!(
    /// An arbitrary-precision integer in decimal notation.
    BigInteger,
    |text| {
        if digits(split_sign(text)) {
            Ok(text.strip_prefix('+').unwrap_or(text).to_string())
        } else {
            Err("expected an integer".to_string())
        }
    }
);

text_value!(
    /// An arbitrary-precision decimal number, optionally with an exponent.
    BigDecimal,
    |text| {
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(at) => (&text[..at], Some(&text[at + 1..])),
            None => (text, None),
        };
        let mantissa = split_sign(mantissa);
        let valid_mantissa = match mantissa.split_once('.') {
            Some((whole, fraction)) => {
                (whole.is_empty() || digits(whole))
                    && (fraction.is_empty() || digits(fraction))
                    && !(whole.is_empty() && fraction.is_empty())
            }
            None => digits(mantissa),
        };
        let valid_exponent = exponent.is_none_or(|e| digits(split_sign(e)));
        if valid_mantissa && valid_exponent {
            Ok(text.to_string())
        } else {
            Err("expected a decimal number".to_string())
        }
    }
);

text_value!(
    /// An ISO 4217 currency code such as `EUR`.
    Currency,
    |text| {
        if text.len() == 3 && text.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(text.to_string())
        } else {
            Err("expected a three-letter currency code".to_string())
        }
    }
);

text_value!(
    /// A locale tag such as `en`, `en_GB` or `pt-BR`.
    Locale,
    |text| {
        let mut parts = text.split(['_', '-']);
        let language = parts.next().unwrap_or_default();
        let valid_language =
            (2..=3).contains(&language.len()) && language.bytes().all(|b| b.is_ascii_alphabetic());
        let valid_rest = parts.all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_alphanumeric()));
        if valid_language && valid_rest {
            Ok(text.to_string())
        } else {
            Err("expected a locale tag".to_string())
        }
    }
);

text_value!(
    /// A time zone identifier such as `Europe/Paris` or `UTC`.
    TimeZone,
    |text| {
        let valid = !text.is_empty()
            && text
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"/_+-:".contains(&b));
        if valid {
            Ok(text.to_string())
        } else {
            Err("expected a time zone identifier".to_string())
        }
    }
);

text_value!(
    /// A URI reference, which unlike a URL may be relative.
    Uri,
    |text| {
        if text.is_empty() || text.chars().any(char::is_whitespace) {
            Err("expected a URI reference".to_string())
        } else {
            Ok(text.to_string())
        }
    }
);
