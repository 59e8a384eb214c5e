//! Numbers stored as exact decimal text.

use crate::error::{Error, Result};
use regex_lite::Regex;
use serde::ser::{self, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Newtype name under which a number's exact text travels through serde.
///
/// The tree codec looks for it on both sides; every other format sees a
/// transparent newtype around a native number.
pub(crate) const TOKEN: &str = "$cfgtree::private::Number";

/// Name serde_json uses for a number's text under `arbitrary_precision`,
/// both as a struct name when serializing and as a map key when deserializing.
pub(crate) const JSON_TOKEN: &str = "$serde_json::private::Number";

static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("valid number pattern")
});

/// Any integer or float, kept as the text it was created from.
///
/// Merge and diff compare the text, so `1.0` and `1` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Number(String);

impl Number {
    /// Wrap decimal text, rejecting anything that is not a JSON-style number.
    pub fn parse(text: &str) -> Result<Self> {
        let number = Self(text.trim().to_string());
        number.check()?;
        Ok(number)
    }

    /// Build from a float. Non-finite values have no decimal form.
    pub fn from_f64(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::unexpected_type("", format!("float {value}"), Some("finite number")))
        }
    }

    /// Build from a single-precision float, using its own shortest text form.
    pub fn from_f32(value: f32) -> Result<Self> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::unexpected_type("", format!("float {value}"), Some("finite number")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.0
            .parse()
            .map_err(|_| Error::unexpected_type("", format!("number {}", self.0), Some("i64")))
    }

    pub fn as_u64(&self) -> Result<u64> {
        self.0
            .parse()
            .map_err(|_| Error::unexpected_type("", format!("number {}", self.0), Some("u64")))
    }

    pub fn as_i128(&self) -> Result<i128> {
        self.0
            .parse()
            .map_err(|_| Error::unexpected_type("", format!("number {}", self.0), Some("i128")))
    }

    pub fn as_u128(&self) -> Result<u128> {
        self.0
            .parse()
            .map_err(|_| Error::unexpected_type("", format!("number {}", self.0), Some("u128")))
    }

    /// Parse as a float. Text beyond the float range is an error, not infinity.
    pub fn as_f64(&self) -> Result<f64> {
        match self.0.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(Error::unexpected_type(
                "",
                format!("number {}", self.0),
                Some("finite f64"),
            )),
        }
    }

    /// True if the text has no fraction or exponent part.
    pub fn is_integer(&self) -> bool {
        !self.0.contains(['.', 'e', 'E'])
    }

    pub(crate) fn check(&self) -> Result<()> {
        if GRAMMAR.is_match(&self.0) {
            Ok(())
        } else {
            Err(Error::unexpected_type("", format!("number {:?}", self.0), Some("decimal text")))
        }
    }

    #[cfg(test)]
    pub(crate) fn from_text_unchecked(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TOKEN, &Native(self))
    }
}

/// The closest native number for human-readable formats, the exact text
/// for the tree codec (which reports itself as not human-readable here).
struct Native<'a>(&'a Number);

impl Serialize for Native<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let number = self.0;
        if !serializer.is_human_readable() {
            return serializer.serialize_str(number.as_str());
        }
        if number.is_integer() {
            if let Ok(v) = number.as_i64() {
                return serializer.serialize_i64(v);
            }
            if let Ok(v) = number.as_u64() {
                return serializer.serialize_u64(v);
            }
            if let Ok(v) = number.as_i128() {
                return serializer.serialize_i128(v);
            }
            if let Ok(v) = number.as_u128() {
                return serializer.serialize_u128(v);
            }
        }
        match number.as_f64() {
            Ok(v) => serializer.serialize_f64(v),
            Err(e) => Err(ser::Error::custom(e)),
        }
    }
}

macro_rules! number_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

number_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
