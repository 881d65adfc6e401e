pub mod stream;

pub use stream::{row_channel, RowSender, RowStream};

use serde::Serialize;

use crate::value::Value;

/// Declared SQL column type, read once from cursor metadata (or synthesized
/// as VARCHAR for flat-file columns). Drives value coercion and the
/// format-specific quoting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Decimal,
    Float,
    Double,
    Bit,
    Date,
    DateTime,
    Timestamp,
    Time,
    Char,
    Varchar,
    Binary,
    VarBinary,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Json,
    Other,
}

impl ColumnType {
    /// Parse a textual type declaration, e.g. a SQLite decl type such as
    /// `VARCHAR(30)` or `INTEGER`. Unknown names map to `Other`.
    pub fn from_name(name: &str) -> ColumnType {
        let base = name
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase();
        match base.as_str() {
            "TINYINT" => ColumnType::TinyInt,
            "SMALLINT" => ColumnType::SmallInt,
            "MEDIUMINT" => ColumnType::MediumInt,
            "INT" | "INTEGER" => ColumnType::Int,
            "BIGINT" => ColumnType::BigInt,
            "DECIMAL" | "NUMERIC" => ColumnType::Decimal,
            "FLOAT" => ColumnType::Float,
            "DOUBLE" | "REAL" => ColumnType::Double,
            "BIT" => ColumnType::Bit,
            "DATE" => ColumnType::Date,
            "DATETIME" => ColumnType::DateTime,
            "TIMESTAMP" => ColumnType::Timestamp,
            "TIME" => ColumnType::Time,
            "CHAR" => ColumnType::Char,
            "VARCHAR" | "TEXT" => ColumnType::Varchar,
            "BINARY" => ColumnType::Binary,
            "VARBINARY" => ColumnType::VarBinary,
            "TINYBLOB" => ColumnType::TinyBlob,
            "BLOB" => ColumnType::Blob,
            "MEDIUMBLOB" => ColumnType::MediumBlob,
            "LONGBLOB" => ColumnType::LongBlob,
            "JSON" => ColumnType::Json,
            _ => ColumnType::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::MediumInt => "MEDIUMINT",
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Bit => "BIT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Binary => "BINARY",
            ColumnType::VarBinary => "VARBINARY",
            ColumnType::TinyBlob => "TINYBLOB",
            ColumnType::Blob => "BLOB",
            ColumnType::MediumBlob => "MEDIUMBLOB",
            ColumnType::LongBlob => "LONGBLOB",
            ColumnType::Json => "JSON",
            ColumnType::Other => "OTHER",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt
                | ColumnType::SmallInt
                | ColumnType::MediumInt
                | ColumnType::Int
                | ColumnType::BigInt
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ColumnType::Binary | ColumnType::VarBinary)
    }

    pub fn is_blob(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyBlob
                | ColumnType::Blob
                | ColumnType::MediumBlob
                | ColumnType::LongBlob
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::DateTime | ColumnType::Timestamp
        )
    }
}

/// The native scan kind a declared type resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NativeKind {
    Int64,
    Float64,
    String,
    Time,
    Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub native: NativeKind,
}

impl Column {
    pub fn new(name: String, column_type: ColumnType) -> Column {
        let native = if column_type.is_integer()
            || column_type == ColumnType::Bit
        {
            NativeKind::Int64
        } else if matches!(
            column_type,
            ColumnType::Decimal | ColumnType::Float | ColumnType::Double
        ) {
            NativeKind::Float64
        } else if column_type.is_temporal() {
            NativeKind::Time
        } else if column_type.is_binary() || column_type.is_blob() {
            NativeKind::Bytes
        } else {
            NativeKind::String
        };

        Column {
            name,
            column_type,
            native,
        }
    }

    /// Synthetic all-VARCHAR column for flat-file data, which carries no
    /// type metadata.
    pub fn varchar(name: impl Into<String>) -> Column {
        Column::new(name.into(), ColumnType::Varchar)
    }
}

/// One result row: an ordered name/value list with map-like lookup.
/// Lookup order is irrelevant; rendering always follows the column
/// sequence. A column missing from the row reads as Null.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new(values: Vec<(String, Value)>) -> Row {
        Row { values }
    }

    pub fn with_capacity(capacity: usize) -> Row {
        Row {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: String, value: Value) {
        self.values.push((name, value));
    }

    /// Replace a value in place, or append it when the column is not
    /// present yet.
    pub fn set(&mut self, column_name: &str, value: Value) {
        match self
            .values
            .iter_mut()
            .find(|(name, _)| name == column_name)
        {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column_name.to_string(), value)),
        }
    }

    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column_name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.values.iter()
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_from_name() {
        assert_eq!(ColumnType::from_name("INT"), ColumnType::Int);
        assert_eq!(ColumnType::from_name("integer"), ColumnType::Int);
        assert_eq!(ColumnType::from_name("VARCHAR(30)"), ColumnType::Varchar);
        assert_eq!(ColumnType::from_name("Text"), ColumnType::Varchar);
        assert_eq!(ColumnType::from_name("GEOMETRY"), ColumnType::Other);
    }

    #[test]
    fn test_native_kind_derivation() {
        assert_eq!(
            Column::new("n".to_string(), ColumnType::BigInt).native,
            NativeKind::Int64
        );
        assert_eq!(
            Column::new("n".to_string(), ColumnType::Decimal).native,
            NativeKind::Float64
        );
        assert_eq!(
            Column::new("n".to_string(), ColumnType::DateTime).native,
            NativeKind::Time
        );
        assert_eq!(
            Column::new("n".to_string(), ColumnType::Blob).native,
            NativeKind::Bytes
        );
        assert_eq!(Column::varchar("n").native, NativeKind::String);
    }

    #[test]
    fn test_row_lookup_ignores_order() {
        let row = Row::new(vec![
            ("b".to_string(), Value::Int(2)),
            ("a".to_string(), Value::Int(1)),
        ]);
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
        assert_eq!(row.get("b"), Some(&Value::Int(2)));
        assert_eq!(row.get("missing"), None);
    }
}
