//! Literal values bound into statements and read back from rows.
//!
//! [`Value`] is the single value type that flows through the crate: predicates
//! and payloads carry it towards the driver, and [`Record`](crate::Record)
//! columns carry it back. Structured values (JSON objects and arrays) are
//! rendered with a `::json` cast on their placeholder; every other variant
//! uses a plain placeholder.
//!
//! Binding follows the parameter type the server inferred, not the variant:
//! integers widen to `float4`/`float8`/`numeric`, and text is parsed into
//! numeric, boolean, date/time, uuid, json and enum parameters the way a
//! quoted literal would be.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::{Serialize, Serializer};
use std::error::Error;
use std::fmt;

/// A bound parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    /// Any integer width; narrowed to the parameter type when bound.
    Int(i64),
    Float(f64),
    /// `numeric`
    Decimal(Decimal),
    Text(String),
    /// `bytea`
    Bytes(Vec<u8>),
    /// Structured value (mapping or sequence), bound as `json`.
    Json(serde_json::Value),
    Uuid(uuid::Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    /// Serialize any `serde` value into a structured [`Value::Json`].
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Value::Json)
    }

    /// Whether this value is a mapping/sequence that needs a JSON cast.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Json(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Placeholder text for this value at 1-based position `idx`.
    pub fn placeholder(&self, idx: usize) -> String {
        if self.is_structured() {
            format!("${idx}::json")
        } else {
            format!("${idx}")
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\\x")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "{}", Hex(b)),
            Value::Json(v) => write!(f, "{v}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::TimestampTz(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
        }
    }
}

type ToSqlResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Decimal(d) => decimal_to_sql(*d, ty, out),
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Uuid(u) => u.to_sql_checked(ty, out),
            Value::Timestamp(ts) => ts.to_sql_checked(ty, out),
            Value::TimestampTz(ts) => ts.to_sql_checked(ty, out),
            Value::Date(d) => d.to_sql_checked(ty, out),
            Value::Time(t) => t.to_sql_checked(ty, out),
        }
    }

    // Each variant re-checks its own type in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql_checked(ty, out),
        Type::OID => u32::try_from(i)?.to_sql_checked(ty, out),
        Type::FLOAT4 => (i as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => (i as f64).to_sql_checked(ty, out),
        Type::NUMERIC => Decimal::from(i).to_sql_checked(ty, out),
        _ if is_text(ty) => i.to_string().as_str().to_sql_checked(ty, out),
        _ => i.to_sql_checked(ty, out),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql_checked(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql_checked(ty, out),
        _ if is_text(ty) => v.to_string().as_str().to_sql_checked(ty, out),
        _ => v.to_sql_checked(ty, out),
    }
}

fn decimal_to_sql(d: Decimal, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
    match *ty {
        Type::FLOAT4 | Type::FLOAT8 => {
            let v = d
                .to_f64()
                .ok_or_else(|| format!("numeric {d} out of range for {ty}"))?;
            float_to_sql(v, ty, out)
        }
        Type::INT2 | Type::INT4 | Type::INT8 if d.fract().is_zero() => {
            let i = d
                .to_i64()
                .ok_or_else(|| format!("numeric {d} out of range for {ty}"))?;
            int_to_sql(i, ty, out)
        }
        _ if is_text(ty) => d.to_string().as_str().to_sql_checked(ty, out),
        _ => d.to_sql_checked(ty, out),
    }
}

/// Parse `s` into the parameter's type, as the server would parse a quoted
/// literal in that position.
fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
    if is_text(ty) {
        return s.to_sql_checked(ty, out);
    }
    let t = s.trim();
    match *ty {
        Type::INT2 => t.parse::<i16>()?.to_sql_checked(ty, out),
        Type::INT4 => t.parse::<i32>()?.to_sql_checked(ty, out),
        Type::INT8 => t.parse::<i64>()?.to_sql_checked(ty, out),
        Type::OID => t.parse::<u32>()?.to_sql_checked(ty, out),
        Type::FLOAT4 => t.parse::<f32>()?.to_sql_checked(ty, out),
        Type::FLOAT8 => t.parse::<f64>()?.to_sql_checked(ty, out),
        Type::NUMERIC => t.parse::<Decimal>()?.to_sql_checked(ty, out),
        Type::BOOL => parse_bool(t)?.to_sql_checked(ty, out),
        Type::DATE => t.parse::<NaiveDate>()?.to_sql_checked(ty, out),
        Type::TIME => t.parse::<NaiveTime>()?.to_sql_checked(ty, out),
        Type::TIMESTAMP => parse_timestamp(t)?.to_sql_checked(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(t)?.to_sql_checked(ty, out),
        Type::UUID => t.parse::<uuid::Uuid>()?.to_sql_checked(ty, out),
        Type::JSON | Type::JSONB => {
            serde_json::from_str::<serde_json::Value>(s)?.to_sql_checked(ty, out)
        }
        Type::BYTEA => s.as_bytes().to_sql_checked(ty, out),
        _ => match ty.kind() {
            // Enum labels travel as their text in the binary format too.
            Kind::Enum(_) => {
                out.extend_from_slice(s.as_bytes());
                Ok(IsNull::No)
            }
            _ => s.to_sql_checked(ty, out),
        },
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("invalid input syntax for type boolean: {s:?}")),
    }
}

/// `YYYY-MM-DD[( |T)HH:MM:SS[.f]]`; a bare date means midnight.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|e| {
            s.parse::<NaiveDate>()
                .map(|d| d.and_time(NaiveTime::MIN))
                .map_err(|_| e)
        })
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]+HH[:MM]`, or a timestamp without
/// offset, which is taken as UTC.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|e| parse_timestamp(s).map(|n| n.and_utc()).map_err(|_| e))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Decimal(d) => Serialize::serialize(d, serializer),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.collect_str(&Hex(b)),
            Value::Json(v) => v.serialize(serializer),
            Value::Uuid(u) => u.serialize(serializer),
            Value::Timestamp(ts) => ts.serialize(serializer),
            Value::TimestampTz(ts) => ts.serialize(serializer),
            Value::Date(d) => d.serialize(serializer),
            Value::Time(t) => t.serialize(serializer),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
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
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

/// JSON scalars map onto the matching scalar variant; objects and arrays
/// stay structured.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            structured => Value::Json(structured),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
