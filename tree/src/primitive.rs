//! Scalar values carried by tree leaves and their textual token form.
//!
//! [`Primitive`] is the payload of a [`ScalarNode`](crate::ScalarNode) and the
//! element type of a [`PrimitiveArray`](crate::PrimitiveArray). Its kinds are
//! exactly the ones the textual form can tell apart, so a rendered value
//! parses back to the same kind:
//!
//! - every integer type maps to [`Integer`], whatever its signedness
//! - `f32` and `f64` map to `Float`
//! - `char` and strings map to `String`
//!
//! The token rules the renderer relies on:
//!
//! - strings are quoted with JSON escaping
//! - booleans render as `true` / `false`, `Null` as `null`
//! - integers render in decimal
//! - finite floats render in shortest round-trip form and always carry a
//!   `.` or an exponent, so they parse back as floats
//! - non-finite floats render as the quoted tokens `"NaN"`, `"Infinity"`
//!   and `"-Infinity"`; they read back as strings and [`Primitive::as_f64`]
//!   decodes them

use std::fmt::{self, Write as _};

use crate::error::TreeError;

/// Token used for a NaN float.
pub const NAN_TOKEN: &str = "NaN";
/// Token used for positive infinity.
pub const INFINITY_TOKEN: &str = "Infinity";
/// Token used for negative infinity.
pub const NEG_INFINITY_TOKEN: &str = "-Infinity";

// 2^63 and 2^64. Exclusive upper ends; `i64::MAX as f64` rounds up to 2^63.
const I64_END: f64 = 9_223_372_036_854_775_808.0;
const U64_END: f64 = 18_446_744_073_709_551_616.0;

/// An integer anywhere in `i64::MIN..=u64::MAX`.
///
/// Signed and unsigned sources share this one representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(i128);

impl Integer {
    pub fn to_i64(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    pub fn to_u64(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn get(self) -> i128 {
        self.0
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

macro_rules! impl_integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Self {
                    Integer(v as i128)
                }
            }

            impl From<$t> for Primitive {
                fn from(v: $t) -> Self {
                    Primitive::Int(Integer::from(v))
                }
            }
        )*
    };
}

impl_integer_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// A single scalar value.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(Integer),
    Float(f64),
    String(String),
}

/// Discriminant of a [`Primitive`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Null,
    Bool,
    Int,
    Float,
    String,
}

impl PrimitiveKind {
    /// Human-readable kind name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
        }
    }
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Null => PrimitiveKind::Null,
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::Int(_) => PrimitiveKind::Int,
            Primitive::Float(_) => PrimitiveKind::Float,
            Primitive::String(_) => PrimitiveKind::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    /// Append the textual token for this value to `buffer`.
    pub fn write_token(&self, buffer: &mut String) {
        match self {
            Primitive::Null => buffer.push_str("null"),
            Primitive::Bool(true) => buffer.push_str("true"),
            Primitive::Bool(false) => buffer.push_str("false"),
            Primitive::Int(v) => {
                let _ = write!(buffer, "{v}");
            }
            Primitive::Float(v) if v.is_finite() => {
                let _ = write!(buffer, "{v:?}");
            }
            Primitive::Float(v) => write_quoted(buffer, non_finite_token(*v)),
            Primitive::String(s) => write_quoted(buffer, s),
        }
    }

    /// The textual token for this value.
    pub fn to_token(&self) -> String {
        let mut buffer = String::new();
        self.write_token(&mut buffer);
        buffer
    }

    pub fn as_bool(&self) -> Result<bool, TreeError> {
        match self {
            Primitive::Bool(v) => Ok(*v),
            _ => Err(self.conversion_error("bool")),
        }
    }

    /// Integer view. Integral floats are accepted.
    pub fn as_i64(&self) -> Result<i64, TreeError> {
        let converted = match self {
            Primitive::Int(v) => v.to_i64(),
            Primitive::Float(v) => integral_float(*v, -I64_END, I64_END).map(|v| v as i64),
            _ => None,
        };
        converted.ok_or_else(|| self.conversion_error("i64"))
    }

    pub fn as_i32(&self) -> Result<i32, TreeError> {
        let wide = self.as_i64()?;
        i32::try_from(wide).map_err(|_| self.conversion_error("i32"))
    }

    /// Unsigned integer view. Non-negative integral floats are accepted.
    pub fn as_u64(&self) -> Result<u64, TreeError> {
        let converted = match self {
            Primitive::Int(v) => v.to_u64(),
            Primitive::Float(v) => integral_float(*v, 0.0, U64_END).map(|v| v as u64),
            _ => None,
        };
        converted.ok_or_else(|| self.conversion_error("u64"))
    }

    pub fn as_u32(&self) -> Result<u32, TreeError> {
        let wide = self.as_u64()?;
        u32::try_from(wide).map_err(|_| self.conversion_error("u32"))
    }

    /// Float view. Integers widen; the non-finite string tokens are decoded.
    pub fn as_f64(&self) -> Result<f64, TreeError> {
        match self {
            Primitive::Float(v) => Ok(*v),
            Primitive::Int(v) => Ok(v.to_f64()),
            Primitive::String(s) => {
                parse_non_finite(s).ok_or_else(|| self.conversion_error("f64"))
            }
            _ => Err(self.conversion_error("f64")),
        }
    }

    pub fn as_f32(&self) -> Result<f32, TreeError> {
        self.as_f64().map(|v| v as f32)
    }

    /// Char view of a single-character string.
    pub fn as_char(&self) -> Result<char, TreeError> {
        if let Primitive::String(s) = self {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(c);
            }
        }
        Err(self.conversion_error("char"))
    }

    pub fn as_str(&self) -> Result<&str, TreeError> {
        match self {
            Primitive::String(s) => Ok(s),
            _ => Err(self.conversion_error("string")),
        }
    }

    fn conversion_error(&self, target: &'static str) -> TreeError {
        TreeError::Conversion {
            value: self.to_token(),
            target,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

/// Append `value` to `buffer` as a quoted, JSON-escaped string.
///
/// Escaping goes through `serde_json`, the same crate the parser reads with.
pub(crate) fn write_quoted(buffer: &mut String, value: &str) {
    let _ = write!(buffer, "{}", serde_json::Value::from(value));
}

fn non_finite_token(value: f64) -> &'static str {
    if value.is_nan() {
        NAN_TOKEN
    } else if value.is_sign_positive() {
        INFINITY_TOKEN
    } else {
        NEG_INFINITY_TOKEN
    }
}

/// Decode one of the non-finite float tokens.
pub(crate) fn parse_non_finite(token: &str) -> Option<f64> {
    match token {
        NAN_TOKEN => Some(f64::NAN),
        INFINITY_TOKEN => Some(f64::INFINITY),
        NEG_INFINITY_TOKEN => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// `value` if it is integral and in `start..end`.
fn integral_float(value: f64, start: f64, end: f64) -> Option<f64> {
    (value.is_finite() && value.fract() == 0.0 && value >= start && value < end).then_some(value)
}

impl From<f32> for Primitive {
    fn from(v: f32) -> Self {
        Primitive::Float(v as f64)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<Integer> for Primitive {
    fn from(v: Integer) -> Self {
        Primitive::Int(v)
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<char> for Primitive {
    fn from(v: char) -> Self {
        Primitive::String(v.to_string())
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::String(v.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::String(v)
    }
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
    fn from(v: Option<T>) -> Self {
        v.map_or(Primitive::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rules() {
        assert_eq!(Primitive::from("hi").to_token(), "\"hi\"");
        assert_eq!(Primitive::from('x').to_token(), "\"x\"");
        assert_eq!(Primitive::from(true).to_token(), "true");
        assert_eq!(Primitive::from(false).to_token(), "false");
        assert_eq!(Primitive::from(42i32).to_token(), "42");
        assert_eq!(Primitive::from(-7i64).to_token(), "-7");
        assert_eq!(Primitive::from(u64::MAX).to_token(), "18446744073709551615");
        assert_eq!(Primitive::Null.to_token(), "null");
    }

    #[test]
    fn integers_share_one_kind() {
        assert_eq!(Primitive::from(5u64), Primitive::from(5i8));
        assert_eq!(Primitive::from(5usize).kind(), PrimitiveKind::Int);
        assert_eq!(Primitive::from('c'), Primitive::from("c"));
        assert_eq!(Primitive::from(0.5f32), Primitive::from(0.5f64));
    }

    #[test]
    fn floats_keep_a_fraction_marker() {
        assert_eq!(Primitive::from(1.0f64).to_token(), "1.0");
        assert_eq!(Primitive::from(0.5f32).to_token(), "0.5");
        assert_eq!(Primitive::from(1e20f64).to_token(), "1e20");
        assert_eq!(Primitive::from(f64::NAN).to_token(), "\"NaN\"");
        assert_eq!(Primitive::from(f32::INFINITY).to_token(), "\"Infinity\"");
        assert_eq!(Primitive::from(f64::NEG_INFINITY).to_token(), "\"-Infinity\"");
    }

    #[test]
    fn strings_are_escaped() {
        let token = Primitive::from("a \"quoted\"\nline\\").to_token();
        assert_eq!(token, "\"a \\\"quoted\\\"\\nline\\\\\"");
        assert_eq!(Primitive::from("\u{1}").to_token(), "\"\\u0001\"");
        let tricky = "tab\t \u{1f} é \u{7f} 😀";
        let parsed: String = serde_json::from_str(&Primitive::from(tricky).to_token()).unwrap();
        assert_eq!(parsed, tricky);
    }

    #[test]
    fn integer_conversions_check_range() {
        assert_eq!(Primitive::from(5u64).as_i32().unwrap(), 5);
        assert_eq!(Primitive::from(-1i64).as_i64().unwrap(), -1);
        assert!(Primitive::from(-1i64).as_u64().is_err());
        assert!(Primitive::from(u64::MAX).as_i64().is_err());
        assert_eq!(Primitive::from(u64::MAX).as_u64().unwrap(), u64::MAX);
        assert!(Primitive::from(i64::MAX).as_i32().is_err());
        assert_eq!(Primitive::from(3.0f64).as_i64().unwrap(), 3);
        assert!(Primitive::from(3.5f64).as_i64().is_err());
    }

    #[test]
    fn float_to_integer_rejects_the_upper_bound() {
        assert!(Primitive::from(I64_END).as_i64().is_err());
        assert!(Primitive::from(U64_END).as_u64().is_err());
        assert_eq!(Primitive::from(-I64_END).as_i64().unwrap(), i64::MIN);
        assert_eq!(Primitive::from(I64_END).as_u64().unwrap(), 1u64 << 63);
        // largest double below 2^63
        assert_eq!(
            Primitive::from(9_223_372_036_854_774_784.0f64).as_i64().unwrap(),
            9_223_372_036_854_774_784
        );
    }

    #[test]
    fn float_conversions() {
        assert_eq!(Primitive::from(2i64).as_f64().unwrap(), 2.0);
        assert_eq!(Primitive::from(0.25f64).as_f32().unwrap(), 0.25);
        assert_eq!(Primitive::from(0.1f32).as_f32().unwrap(), 0.1f32);
        assert!(Primitive::from("NaN").as_f64().unwrap().is_nan());
        assert_eq!(
            Primitive::from("-Infinity").as_f32().unwrap(),
            f32::NEG_INFINITY
        );
        assert!(Primitive::from("nope").as_f64().is_err());
    }

    #[test]
    fn char_reads_single_char_strings() {
        assert_eq!(Primitive::from("z").as_char().unwrap(), 'z');
        assert_eq!(Primitive::from('q').as_char().unwrap(), 'q');
        assert!(Primitive::from("zz").as_char().is_err());
        assert!(Primitive::from(1).as_char().is_err());
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Primitive::from(None::<i32>), Primitive::Null);
        assert_eq!(Primitive::from(Some(3u8)), Primitive::Int(Integer::from(3)));
    }
}
