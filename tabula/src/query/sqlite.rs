//! Query execution against a SQLite connection, used by the ephemeral
//! fly database. The database is in-process, so only eager extraction is
//! offered and no query timeout applies.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::error::TabulaError;
use crate::table::{Column, ColumnType, ResultSet, Row};
use crate::value::{format_datetime, Value};

pub struct SqliteSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection) -> SqliteSource<'a> {
        SqliteSource { conn }
    }

    pub fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<ResultSet, TabulaError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| TabulaError::Query(err.to_string()))?;

        let columns: Vec<Column> = stmt
            .columns()
            .iter()
            .map(|col| {
                let column_type = col
                    .decl_type()
                    .map(ColumnType::from_name)
                    .unwrap_or(ColumnType::Other);
                Column::new(col.name().to_string(), column_type)
            })
            .collect();

        let sql_params: Vec<rusqlite::types::Value> =
            params.iter().map(to_sqlite_value).collect();
        let mut result = stmt
            .query(params_from_iter(sql_params))
            .map_err(|err| TabulaError::Query(err.to_string()))?;

        let mut rows = Vec::new();
        loop {
            let sql_row = match result.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => {
                    return Err(TabulaError::Query(err.to_string()))
                }
            };

            let mut row = Row::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let raw = sql_row
                    .get_ref(i)
                    .map_err(|err| TabulaError::Query(err.to_string()))?;
                row.push(column.name.clone(), coerce(raw, column)?);
            }
            rows.push(row);
        }

        Ok(ResultSet { columns, rows })
    }
}

fn coerce(raw: ValueRef, column: &Column) -> Result<Value, TabulaError> {
    match raw {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Int(v)),
        ValueRef::Real(v) => Ok(Value::Float(v)),
        ValueRef::Text(bytes) => Ok(Value::from_text(
            String::from_utf8_lossy(bytes).into_owned(),
            column.column_type,
        )),
        ValueRef::Blob(bytes) => {
            Value::from_bytes(bytes.to_vec(), column.column_type)
        }
    }
}

fn to_sqlite_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int(v) => rusqlite::types::Value::Integer(*v),
        Value::Float(v) => rusqlite::types::Value::Real(*v),
        Value::Text(v) => rusqlite::types::Value::Text(v.clone()),
        Value::Timestamp(ts) => {
            rusqlite::types::Value::Text(format_datetime(ts))
        }
        Value::Bytes(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_with_declared_types() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER, name VARCHAR(30));
             INSERT INTO users VALUES (1, 'Alice'), (2, NULL);",
        )
        .unwrap();

        let source = SqliteSource::new(&conn);
        let result = source
            .query("SELECT id, name FROM users ORDER BY id", &[])
            .unwrap();

        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].column_type, ColumnType::Int);
        assert_eq!(result.columns[1].column_type, ColumnType::Varchar);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(
            result.rows[0].get("name"),
            Some(&Value::Text("Alice".to_string()))
        );
        assert_eq!(result.rows[1].get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_query_with_positional_params() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (n INTEGER);
             INSERT INTO t VALUES (1), (2), (3);",
        )
        .unwrap();

        let source = SqliteSource::new(&conn);
        let result = source
            .query("SELECT n FROM t WHERE n > ?", &[Value::Int(1)])
            .unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_query_error_surface() {
        let conn = Connection::open_in_memory().unwrap();
        let source = SqliteSource::new(&conn);
        assert!(matches!(
            source.query("SELECT * FROM missing", &[]),
            Err(TabulaError::Query(_))
        ));
    }
}
