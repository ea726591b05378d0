//! Dynamic values exchanged between records, query plans and executors.
//!
//! [`Value`] is the single currency of the mapping layer: record fields are
//! lowered into values, filters carry values, and executors hand rows back
//! as [`Attributes`]. [`FieldType`] connects concrete Rust field types to it.
//!
//! Values that reach an executor are first normalized to a *storage class*
//! for their column ([`Value::to_storage`]): `Null`, `Integer`, `Real`,
//! `Text` or `Blob`. Both executors therefore compare exactly the same
//! representations, which is what keeps them observably equivalent.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::descriptor::{FieldKind, SemanticType};

/// Column name to value mapping, in column order.
pub type Attributes = IndexMap<String, Value>;

/// A dynamically typed column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// Only meaningful as the operand of an `in` lookup.
    List(Vec<Value>),
}

impl Value {
    /// Builds a [`Value::List`] from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Blob(_) => "blob",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Textual form of a scalar, the way SQLite renders it when a text
    /// operand is required (`LIKE`, `LOWER`). `None` for NULL and lists.
    pub fn textual(&self) -> Option<String> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(format_real(*r)),
            Value::Text(s) => Some(s.clone()),
            Value::Boolean(b) => Some(i64::from(*b).to_string()),
            Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Value::Timestamp(t) => Some(format_timestamp(t)),
        }
    }

    /// Normalizes this value to the storage class of a column with the
    /// given semantic type. Returns `None` when the value cannot be
    /// represented in such a column.
    pub fn to_storage(&self, ty: SemanticType) -> Option<Value> {
        if self.is_null() {
            return Some(Value::Null);
        }
        match ty {
            SemanticType::Integer => match self {
                Value::Integer(i) => Some(Value::Integer(*i)),
                Value::Real(r) => real_to_storage(*r),
                Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
                Value::Text(s) => parse_numeric(s),
                _ => None,
            },
            SemanticType::Real => match self {
                Value::Integer(i) => Some(Value::Real(*i as f64)),
                Value::Real(r) if r.is_nan() => Some(Value::Null),
                Value::Real(r) => Some(Value::Real(*r)),
                Value::Text(s) => match parse_numeric(s)? {
                    Value::Integer(i) => Some(Value::Real(i as f64)),
                    other => Some(other),
                },
                _ => None,
            },
            SemanticType::Text => match self {
                Value::Text(s) => Some(Value::Text(s.clone())),
                Value::Integer(_) | Value::Real(_) | Value::Timestamp(_) => {
                    self.textual().map(Value::Text)
                }
                _ => None,
            },
            SemanticType::Boolean => match self {
                Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
                Value::Integer(i @ (0 | 1)) => Some(Value::Integer(*i)),
                Value::Text(s) => parse_bool(s).map(|b| Value::Integer(i64::from(b))),
                _ => None,
            },
            SemanticType::Blob => match self {
                Value::Blob(b) => Some(Value::Blob(b.clone())),
                Value::Text(s) => Some(Value::Blob(s.clone().into_bytes())),
                _ => None,
            },
            SemanticType::Timestamp => match self {
                Value::Timestamp(t) => Some(Value::Text(format_timestamp(t))),
                Value::Text(s) => parse_timestamp(s).map(|t| Value::Text(format_timestamp(&t))),
                _ => None,
            },
        }
    }

    /// Total order over storage classes: NULL < numeric < text < blob.
    /// Numerics compare by value, text and blobs bytewise.
    pub fn storage_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Real(b)) => cmp_f64(*a as f64, *b),
            (Value::Real(a), Value::Integer(b)) => cmp_f64(*a, *b as f64),
            (Value::Real(a), Value::Real(b)) => cmp_f64(*a, *b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => self.class_rank().cmp(&other.class_rank()),
        }
    }

    /// SQL equality: unknown (`None`) when either side is NULL.
    pub fn sql_eq(&self, other: &Value) -> Option<bool> {
        self.sql_cmp(other).map(|o| o == Ordering::Equal)
    }

    /// SQL comparison: unknown (`None`) when either side is NULL.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            None
        } else {
            Some(self.storage_cmp(other))
        }
    }

    fn class_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) | Value::Boolean(_) => 1,
            Value::Text(_) | Value::Timestamp(_) => 2,
            Value::Blob(_) => 3,
            Value::List(_) => 4,
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn real_to_storage(r: f64) -> Option<Value> {
    if r.is_nan() {
        Some(Value::Null)
    } else if r.fract() == 0.0 && r.abs() < 9.0e18 {
        Some(Value::Integer(r as i64))
    } else {
        Some(Value::Real(r))
    }
}

/// Parses a well-formed SQL numeric literal (surrounding spaces allowed).
/// Integral reals collapse to integers.
pub fn parse_numeric(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    s.parse::<f64>().ok().and_then(real_to_storage)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Canonical text form of a timestamp: RFC 3339, UTC, microseconds, `Z`.
/// Fixed width, so text order equals chronological order.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Significant digits SQLite keeps when it renders a real as text.
const REAL_DIGITS: i32 = 15;

/// Renders a real the way SQLite does when it needs text (`%!.15g`).
///
/// Fifteen significant digits with trailing zeros dropped but at least one
/// fractional digit kept. Exponent form outside `[1e-4, 1e15)`, with a
/// signed exponent of at least two digits. Zero of either sign is `0.0`.
pub fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "NaN".to_string();
    }
    if r.is_infinite() {
        return if r < 0.0 { "-Inf" } else { "Inf" }.to_string();
    }
    if r == 0.0 {
        return "0.0".to_string();
    }

    // Rounds to the kept digits first so the exponent reflects any carry.
    let scientific = format!("{:.*e}", (REAL_DIGITS - 1) as usize, r);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= REAL_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (REAL_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{r:.decimals$}"))
    }
}

/// Drops trailing fractional zeros, keeping at least one digit after the
/// point.
fn trim_fraction(digits: &str) -> String {
    match digits.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{digits}.0"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Text(s) => write!(f, "'{s}'"),
            other => write!(f, "{}", other.textual().unwrap_or_default()),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                FieldType::to_value(&v)
            }
        }
    )*};
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that can back a persisted record field.
///
/// `from_value` accepts every storage class the type may come back as
/// (booleans arrive as integers, timestamps as text).
pub trait FieldType: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_integer_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::Integer;

            fn to_value(&self) -> Value {
                i64::try_from(*self).map_or(Value::Real(*self as f64), Value::Integer)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Integer(i) => Self::try_from(i).ok(),
                    Value::Boolean(b) => Some(Self::from(b)),
                    Value::Real(r) => real_to_integer(r).and_then(|i| Self::try_from(i).ok()),
                    Value::Text(s) => s.trim().parse().ok(),
                    _ => None,
                }
            }
        }
    )*};
}

impl_integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// The integer a real denotes exactly, if any. Integers beyond `i64` are
/// stored as reals, so this must not saturate.
fn real_to_integer(r: f64) -> Option<i128> {
    if !r.is_finite() || r.fract() != 0.0 {
        return None;
    }
    let wide = r as i128;
    (wide as f64 == r).then_some(wide)
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Real;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Real(r) => Some(r),
            Value::Integer(i) => Some(i as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Real;

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_value(value: Value) -> Option<Self> {
        f64::from_value(value).map(|r| r as f32)
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(b),
            Value::Integer(i) => Some(i != 0),
            Value::Text(s) => parse_bool(&s),
            _ => None,
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            Value::Blob(b) => String::from_utf8(b).ok(),
            other => other.textual(),
        }
    }
}

impl FieldType for Vec<u8> {
    const KIND: FieldKind = FieldKind::Blob;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.into_bytes()),
            _ => None,
        }
    }
}

impl FieldType for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Timestamp(t) => Some(t),
            Value::Text(s) => parse_timestamp(&s),
            Value::Integer(secs) => DateTime::from_timestamp(secs, 0),
            _ => None,
        }
    }
}

/// Arbitrary JSON, persisted as its text encoding.
impl FieldType for serde_json::Value {
    const KIND: FieldKind = FieldKind::Other;

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => serde_json::from_str(&s).ok(),
            _ => None,
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldType::to_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_integer_column_coercion() {
        let ty = SemanticType::Integer;
        assert_eq!(Value::from(17).to_storage(ty), Some(Value::Integer(17)));
        assert_eq!(Value::from("17").to_storage(ty), Some(Value::Integer(17)));
        assert_eq!(Value::from(" 17 ").to_storage(ty), Some(Value::Integer(17)));
        assert_eq!(Value::from(17.0).to_storage(ty), Some(Value::Integer(17)));
        assert_eq!(Value::from(17.5).to_storage(ty), Some(Value::Real(17.5)));
        assert_eq!(Value::from(true).to_storage(ty), Some(Value::Integer(1)));
        assert_eq!(Value::from("x").to_storage(ty), None);
        assert_eq!(Value::from("inf").to_storage(ty), None);
        assert_eq!(Value::Blob(vec![1]).to_storage(ty), None);
    }

    #[test]
    fn test_text_column_coercion() {
        let ty = SemanticType::Text;
        assert_eq!(Value::from(17).to_storage(ty), Some(Value::from("17")));
        assert_eq!(Value::from(2.0).to_storage(ty), Some(Value::from("2.0")));
        assert_eq!(Value::from(true).to_storage(ty), None);
    }

    #[test]
    fn test_boolean_and_timestamp_coercion() {
        assert_eq!(Value::from(true).to_storage(SemanticType::Boolean), Some(Value::Integer(1)));
        assert_eq!(Value::from("false").to_storage(SemanticType::Boolean), Some(Value::Integer(0)));
        assert_eq!(Value::from(2).to_storage(SemanticType::Boolean), None);

        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let stored = Value::from(t).to_storage(SemanticType::Timestamp).unwrap();
        assert_eq!(stored, Value::from("2024-03-01T12:00:00.000000Z"));
        assert_eq!(
            Value::from("2024-03-01T13:00:00+01:00").to_storage(SemanticType::Timestamp),
            Some(stored)
        );
        assert_eq!(Value::from("yesterday").to_storage(SemanticType::Timestamp), None);
    }

    #[test]
    fn test_null_is_accepted_everywhere() {
        for ty in [
            SemanticType::Text,
            SemanticType::Integer,
            SemanticType::Real,
            SemanticType::Boolean,
            SemanticType::Blob,
            SemanticType::Timestamp,
        ] {
            assert_eq!(Value::Null.to_storage(ty), Some(Value::Null));
        }
    }

    #[test]
    fn test_storage_order() {
        let mut values = vec![
            Value::Blob(vec![0]),
            Value::from("b"),
            Value::from(2.5),
            Value::Null,
            Value::from("a"),
            Value::from(2),
        ];
        values.sort_by(Value::storage_cmp);
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::from(2),
                Value::from(2.5),
                Value::from("a"),
                Value::from("b"),
                Value::Blob(vec![0]),
            ]
        );
    }

    #[test]
    fn test_sql_comparisons_with_null_are_unknown() {
        assert_eq!(Value::Null.sql_eq(&Value::Null), None);
        assert_eq!(Value::from(1).sql_eq(&Value::Null), None);
        assert_eq!(Value::from(1).sql_eq(&Value::from(1.0)), Some(true));
        assert_eq!(Value::from(1).sql_eq(&Value::from("1")), Some(false));
    }

    #[test]
    fn test_field_type_round_trips_storage_classes() {
        assert_eq!(bool::from_value(Value::Integer(1)), Some(true));
        assert_eq!(u32::from_value(Value::Integer(-1)), None);
        assert_eq!(u8::from_value(Value::Integer(255)), Some(255));
        assert_eq!(Option::<i64>::from_value(Value::Null), Some(None));
        assert_eq!(String::from_value(Value::Integer(5)), Some("5".to_string()));

        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let stored = t.to_value().to_storage(SemanticType::Timestamp).unwrap();
        assert_eq!(DateTime::<Utc>::from_value(stored), Some(t));
    }

    #[test]
    fn test_json_field_type() {
        let json = serde_json::json!({"tags": ["a", "b"]});
        let stored = json.to_value();
        assert_eq!(stored, Value::from(r#"{"tags":["a","b"]}"#));
        assert_eq!(serde_json::Value::from_value(stored), Some(json));
    }

    #[test]
    fn test_textual_forms() {
        assert_eq!(Value::from(3.0).textual().as_deref(), Some("3.0"));
        assert_eq!(Value::from(3.25).textual().as_deref(), Some("3.25"));
        assert_eq!(Value::from(true).textual().as_deref(), Some("1"));
        assert_eq!(Value::Null.textual(), None);
    }

    #[test]
    fn test_format_real_matches_sqlite() {
        assert_eq!(format_real(0.1), "0.1");
        assert_eq!(format_real(-2.5), "-2.5");
        assert_eq!(format_real(100.0), "100.0");
        assert_eq!(format_real(1.0e14), "100000000000000.0");
        assert_eq!(format_real(1.0e15), "1.0e+15");
        assert_eq!(format_real(1.0e20), "1.0e+20");
        assert_eq!(format_real(1.5e-7), "1.5e-07");
        assert_eq!(format_real(1.0e-4), "0.0001");
        assert_eq!(format_real(-1.0e-5), "-1.0e-05");
        assert_eq!(format_real(1.0e300), "1.0e+300");
        assert_eq!(format_real(1.0 / 3.0), "0.333333333333333");
        assert_eq!(format_real(-0.0), "0.0");
        assert_eq!(format_real(f64::INFINITY), "Inf");
        assert_eq!(format_real(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_wide_unsigned_round_trip() {
        let high = 1u64 << 63;
        let stored = high.to_value().to_storage(SemanticType::Integer).unwrap();
        assert_eq!(stored, Value::Real(9_223_372_036_854_775_808.0));
        assert_eq!(u64::from_value(stored), Some(high));

        // u64::MAX is not representable as a real; reading it back fails.
        let stored = u64::MAX.to_value();
        assert_eq!(u64::from_value(stored), None);
        assert_eq!(i64::from_value(Value::Real(1.0e19)), None);
        assert_eq!(u32::from_value(Value::Real(-1.0)), None);
        assert_eq!(i64::from_value(Value::Real(f64::INFINITY)), None);
        assert_eq!(i64::from_value(Value::Real(42.0)), Some(42));
    }

    #[test]
    fn test_value_serializes_naturally() {
        let list = Value::list([1, 2]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2]");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::from("a")).unwrap(), "\"a\"");
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        fn arb_storage_value() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<i64>().prop_map(Value::Integer),
                (-1.0e6f64..1.0e6).prop_map(Value::Real),
                "[a-zA-Z0-9 ]{0,8}".prop_map(Value::Text),
                prop::collection::vec(any::<u8>(), 0..4).prop_map(Value::Blob),
            ]
        }

        proptest! {
            #[test]
            fn storage_cmp_is_antisymmetric(a in arb_storage_value(), b in arb_storage_value()) {
                prop_assert_eq!(a.storage_cmp(&b), b.storage_cmp(&a).reverse());
            }

            #[test]
            fn storage_cmp_is_transitive(
                a in arb_storage_value(),
                b in arb_storage_value(),
                c in arb_storage_value(),
            ) {
                let mut sorted = [a, b, c];
                sorted.sort_by(Value::storage_cmp);
                prop_assert_ne!(sorted[0].storage_cmp(&sorted[2]), Ordering::Greater);
            }

            #[test]
            fn integer_text_coerces_back(i in any::<i64>()) {
                let text = Value::Text(i.to_string());
                prop_assert_eq!(text.to_storage(SemanticType::Integer), Some(Value::Integer(i)));
            }
        }
    }
}
