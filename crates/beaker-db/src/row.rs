//! Row mapping: driver rows into ordered [`Record`]s.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use crate::types::{EnumLabel, Inet, Interval};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::Row;
use postgres::types::{FromSql, Kind, Type};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One result row: column name to value, in the column order the database
/// returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name is kept as a second entry; lookups
    /// return the first one.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Builder-style [`Record::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode a driver row, column by column.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = decode_column(row, idx, column.name(), column.type_())
                .map_err(|e| DbError::decode(column.name(), e))?;
            record.push(column.name(), value);
        }
        Ok(record)
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, String> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
}

fn decode_column(row: &Row, idx: usize, name: &str, ty: &Type) -> Result<Value, String> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Float),
        Type::NUMERIC => get::<Decimal>(row, idx)?.map(Value::Decimal),
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        Type::UUID => get::<uuid::Uuid>(row, idx)?.map(Value::Uuid),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(Value::TimestampTz),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(Value::Date),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(Value::Time),
        Type::INTERVAL => get::<Interval>(row, idx)?.map(|i| Value::Text(i.to_string())),
        Type::INET | Type::CIDR => get::<Inet>(row, idx)?.map(|i| Value::Text(i.0)),
        _ => match ty.kind() {
            Kind::Array(member) => decode_array(row, idx, name, ty, member)?,
            Kind::Enum(_) => get::<EnumLabel>(row, idx)?.map(|l| Value::Text(l.0)),
            _ if <String as FromSql>::accepts(ty) => get::<String>(row, idx)?.map(Value::Text),
            _ => unsupported(name, ty),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// One-dimensional arrays become a JSON array of their elements.
fn decode_array(
    row: &Row,
    idx: usize,
    name: &str,
    ty: &Type,
    member: &Type,
) -> Result<Option<Value>, String> {
    let items = match *member {
        Type::BOOL => json_array::<bool>(row, idx)?,
        Type::INT2 => json_array::<i16>(row, idx)?,
        Type::INT4 => json_array::<i32>(row, idx)?,
        Type::INT8 => json_array::<i64>(row, idx)?,
        Type::FLOAT4 => json_array::<f32>(row, idx)?,
        Type::FLOAT8 => json_array::<f64>(row, idx)?,
        Type::NUMERIC => json_array::<Decimal>(row, idx)?,
        Type::JSON | Type::JSONB => json_array::<serde_json::Value>(row, idx)?,
        Type::UUID => json_array::<uuid::Uuid>(row, idx)?,
        Type::TIMESTAMP => json_array::<NaiveDateTime>(row, idx)?,
        Type::TIMESTAMPTZ => json_array::<DateTime<Utc>>(row, idx)?,
        Type::DATE => json_array::<NaiveDate>(row, idx)?,
        _ if <String as FromSql>::accepts(member) => json_array::<String>(row, idx)?,
        _ => return Ok(unsupported(name, ty)),
    };
    Ok(items.map(Value::Json))
}

fn json_array<'a, T>(row: &'a Row, idx: usize) -> Result<Option<serde_json::Value>, String>
where
    T: FromSql<'a> + Serialize,
{
    get::<Vec<Option<T>>>(row, idx)?
        .map(|items| serde_json::to_value(items).map_err(|e| e.to_string()))
        .transpose()
}

fn unsupported(name: &str, ty: &Type) -> Option<Value> {
    tracing::warn!(
        target: "beaker_db::sql",
        column = %name,
        pg_type = %ty,
        "unsupported column type, reading as NULL"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_column_order() {
        let record = Record::new().with("id", 1).with("name", "ann").with("age", 30);
        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["id", "name", "age"]);
    }

    #[test]
    fn get_returns_first_match() {
        let record = Record::new().with("id", 1).with("id", 2);
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert_eq!(record.len(), 2);
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn serializes_as_ordered_object() {
        let record: Record = vec![("b", Value::from(1)), ("a", Value::from("x"))]
            .into_iter()
            .collect();
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"b":1,"a":"x"}"#);
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"a": "x", "b": 1}));
    }
}
