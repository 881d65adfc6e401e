pub mod sanitize;

use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::error::TabulaError;
use crate::table::{Column, ColumnType};

/// A normalized cell value, produced by coercing a raw driver value under
/// the guidance of the column's declared SQL type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(PrimitiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce a textual raw value. Parse failures are never fatal: the
    /// database is assumed to deliver well-formed data, but driver quirks
    /// fall back to the verbatim text.
    pub fn from_text(raw: String, column_type: ColumnType) -> Value {
        if column_type.is_integer() {
            return match raw.trim().parse::<i64>() {
                Ok(v) => Value::Int(v),
                Err(_) => Value::Text(raw),
            };
        }

        match column_type {
            ColumnType::Decimal => match raw.trim().parse::<f64>() {
                Ok(v) => Value::Float(v),
                Err(_) => Value::Text(raw),
            },
            ColumnType::Date
            | ColumnType::DateTime
            | ColumnType::Timestamp => match parse_timestamp(&raw) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(raw),
            },
            _ => Value::Text(raw),
        }
    }

    /// Coerce a raw byte value. BIT fields collapse to their first byte,
    /// binary/blob columns stay as bytes, anything else goes through the
    /// textual rules when valid UTF-8.
    pub fn from_bytes(
        raw: Vec<u8>,
        column_type: ColumnType,
    ) -> Result<Value, TabulaError> {
        if column_type == ColumnType::Bit {
            return match raw.first() {
                Some(byte) => Ok(Value::Int(i64::from(*byte))),
                None => Err(TabulaError::RowCoercion(
                    "empty byte sequence for BIT column".to_string(),
                )),
            };
        }

        if column_type.is_blob() || column_type.is_binary() {
            return Ok(Value::Bytes(raw));
        }

        match String::from_utf8(raw) {
            Ok(text) => Ok(Value::from_text(text, column_type)),
            Err(err) => Ok(Value::Bytes(err.into_bytes())),
        }
    }

    /// Textual rendering used by csv/plain/table/xlsx cells. Null renders
    /// as the empty string; DATE columns render date-only.
    pub fn render_text(&self, column: &Column) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::Timestamp(ts) => {
                if column.column_type == ColumnType::Date {
                    format_date(ts)
                } else {
                    format_datetime(ts)
                }
            }
            Value::Bytes(bytes) => {
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }

    /// JSON representation used by the json/yaml renderers.
    pub fn to_json(&self, column: &Column) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::Number((*v).into()),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Timestamp(_) | Value::Bytes(_) => {
                serde_json::Value::String(self.render_text(column))
            }
        }
    }
}

/// Build a timestamp from broken-down calendar parts, as delivered by the
/// MySQL binary protocol. Returns None for out-of-range parts.
pub(crate) fn timestamp_from_parts(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    micro: u32,
) -> Option<PrimitiveDateTime> {
    let month = time::Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(i32::from(year), month, day).ok()?;
    let time = Time::from_hms_micro(hour, minute, second, micro).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

pub(crate) fn format_date(ts: &PrimitiveDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]");
    ts.format(&format).unwrap_or_default()
}

pub(crate) fn format_datetime(ts: &PrimitiveDateTime) -> String {
    let format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.format(&format).unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    let datetime =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, &datetime) {
        return Some(ts);
    }

    let date = format_description!("[year]-[month]-[day]");
    if let Ok(d) = Date::parse(raw, &date) {
        return Some(PrimitiveDateTime::new(d, Time::MIDNIGHT));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn column(name: &str, column_type: ColumnType) -> Column {
        Column::new(name.to_string(), column_type)
    }

    #[test]
    fn test_integer_coercion_with_fallback() {
        assert_eq!(
            Value::from_text("42".to_string(), ColumnType::Int),
            Value::Int(42)
        );
        assert_eq!(
            Value::from_text("-7".to_string(), ColumnType::BigInt),
            Value::Int(-7)
        );
        // driver quirk: not parseable, keep the raw text
        assert_eq!(
            Value::from_text("4x2".to_string(), ColumnType::Int),
            Value::Text("4x2".to_string())
        );
    }

    #[test]
    fn test_decimal_coercion() {
        assert_eq!(
            Value::from_text("3.25".to_string(), ColumnType::Decimal),
            Value::Float(3.25)
        );
        assert_eq!(
            Value::from_text("oops".to_string(), ColumnType::Decimal),
            Value::Text("oops".to_string())
        );
    }

    #[test]
    fn test_bit_first_byte() {
        let value =
            Value::from_bytes(vec![0x01, 0x00], ColumnType::Bit).unwrap();
        assert_eq!(value, Value::Int(1));

        let err = Value::from_bytes(Vec::new(), ColumnType::Bit);
        assert!(matches!(err, Err(TabulaError::RowCoercion(_))));
    }

    #[test]
    fn test_blob_stays_bytes() {
        let raw = vec![0xDE, 0xAD];
        assert_eq!(
            Value::from_bytes(raw.clone(), ColumnType::Blob).unwrap(),
            Value::Bytes(raw)
        );
    }

    #[test]
    fn test_timestamp_parsing_and_rendering() {
        let value = Value::from_text(
            "2023-05-01 10:20:30".to_string(),
            ColumnType::DateTime,
        );
        let col = column("created_at", ColumnType::DateTime);
        assert_eq!(value.render_text(&col), "2023-05-01 10:20:30");

        let value =
            Value::from_text("2023-05-01".to_string(), ColumnType::Date);
        let col = column("day", ColumnType::Date);
        assert_eq!(value.render_text(&col), "2023-05-01");
    }

    #[test]
    fn test_null_renders_empty() {
        let col = column("name", ColumnType::Varchar);
        assert_eq!(Value::Null.render_text(&col), "");
        assert_eq!(Value::Null.to_json(&col), serde_json::Value::Null);
    }

    #[test]
    fn test_float_renders_shortest() {
        let col = column("price", ColumnType::Decimal);
        assert_eq!(Value::Float(2.0).render_text(&col), "2");
        assert_eq!(Value::Float(1.25).render_text(&col), "1.25");
    }
}
