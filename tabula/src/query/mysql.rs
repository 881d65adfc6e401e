//! Live MySQL execution: eager extraction into a [`ResultSet`] and
//! streaming extraction through a dedicated producer thread feeding a
//! bounded row channel.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mysql::consts::{ColumnFlags, ColumnType as MySqlColumnType};
use mysql::prelude::{Protocol, Queryable};
use mysql::{Conn, Opts, OptsBuilder, Params, QueryResult};

use crate::error::TabulaError;
use crate::table::stream::STREAM_BUFFER;
use crate::table::{Column, ColumnType, ResultSet, Row, RowSender, RowStream};
use crate::value::{format_datetime, timestamp_from_parts, Value};

pub struct MySqlSource {
    url: String,
    connect_timeout: Option<Duration>,
}

impl MySqlSource {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Option<Duration>,
    ) -> MySqlSource {
        MySqlSource {
            url: url.into(),
            connect_timeout,
        }
    }

    /// Open a connection. The connect timeout bounds only the initial
    /// reachability of the server.
    pub fn connect(&self) -> Result<Conn, TabulaError> {
        let opts = Opts::from_url(&self.url).map_err(|err| {
            TabulaError::Config(format!("invalid database url: {}", err))
        })?;
        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(timeout) = self.connect_timeout {
            builder = builder.tcp_connect_timeout(Some(timeout));
        }
        Conn::new(builder).map_err(|err| {
            TabulaError::Connect(format!("database is unreachable: {}", err))
        })
    }

    /// Execute a query and extract the whole result eagerly. The query
    /// timeout is applied as a server-side execution bound.
    pub fn query(
        &self,
        sql: &str,
        params: Vec<Value>,
        query_timeout: Option<Duration>,
    ) -> Result<ResultSet, TabulaError> {
        let mut conn = self.connect()?;

        if let Some(timeout) = query_timeout {
            let guard = format!(
                "SET SESSION max_execution_time={}",
                timeout.as_millis()
            );
            if let Err(err) = conn.query_drop(guard) {
                // older servers do not know the variable
                log::debug!("query timeout guard not applied: {}", err);
            }
        }

        match to_params(params) {
            Params::Empty => {
                let result = conn
                    .query_iter(sql)
                    .map_err(|err| TabulaError::Query(err.to_string()))?;
                extract_result(result)
            }
            params => {
                let result = conn
                    .exec_iter(sql, params)
                    .map_err(|err| TabulaError::Query(err.to_string()))?;
                extract_result(result)
            }
        }
    }

    /// Execute a query and return a row stream backed by a producer
    /// thread. Column metadata is read before this call returns; the
    /// query timeout is deliberately not applied in streaming mode,
    /// which runs until the cursor is exhausted.
    pub fn stream(
        &self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<RowStream, TabulaError> {
        let mut conn = self.connect()?;
        let sql = sql.to_string();
        let params = to_params(params);

        let (meta_tx, meta_rx) =
            crossbeam_channel::bounded::<Result<Vec<Column>, TabulaError>>(1);
        let (row_tx, row_rx) = crossbeam_channel::bounded(STREAM_BUFFER);
        let stop = Arc::new(AtomicBool::new(false));
        let sender = RowSender::new(row_tx, stop.clone());

        thread::spawn(move || match params {
            Params::Empty => match conn.query_iter(&sql) {
                Ok(result) => produce(result, &meta_tx, &sender),
                Err(err) => {
                    let _ = meta_tx
                        .send(Err(TabulaError::Query(err.to_string())));
                }
            },
            params => match conn.exec_iter(&sql, params) {
                Ok(result) => produce(result, &meta_tx, &sender),
                Err(err) => {
                    let _ = meta_tx
                        .send(Err(TabulaError::Query(err.to_string())));
                }
            },
        });

        let columns = meta_rx.recv().map_err(|_| {
            TabulaError::Schema(
                "could not read column metadata from cursor".to_string(),
            )
        })??;

        Ok(RowStream::new(columns, row_rx, stop))
    }
}

/// Producer loop: publish columns once, then coerce and forward rows in
/// cursor order. Faults become stream items instead of thread panics;
/// a vanished consumer stops the loop through the failed send.
fn produce<P>(
    result: QueryResult<'_, '_, '_, P>,
    meta_tx: &crossbeam_channel::Sender<Result<Vec<Column>, TabulaError>>,
    sender: &RowSender,
) where
    P: Protocol,
{
    let columns: Vec<Column> =
        result.columns().as_ref().iter().map(convert_column).collect();
    if meta_tx.send(Ok(columns.clone())).is_err() {
        return;
    }

    for row in result {
        match row {
            Ok(row) => match convert_row(row, &columns) {
                Ok(row) => {
                    if !sender.send(row) {
                        return;
                    }
                }
                Err(err) => {
                    sender.fail(err);
                    return;
                }
            },
            Err(err) => {
                sender.fail(TabulaError::Query(err.to_string()));
                return;
            }
        }
    }
}

fn extract_result<P>(
    result: QueryResult<'_, '_, '_, P>,
) -> Result<ResultSet, TabulaError>
where
    P: Protocol,
{
    let columns: Vec<Column> =
        result.columns().as_ref().iter().map(convert_column).collect();

    let mut rows = Vec::new();
    for row in result {
        let row =
            row.map_err(|err| TabulaError::Query(err.to_string()))?;
        rows.push(convert_row(row, &columns)?);
    }

    Ok(ResultSet { columns, rows })
}

fn convert_row(
    row: mysql::Row,
    columns: &[Column],
) -> Result<Row, TabulaError> {
    let raw_values = row.unwrap();
    let mut out = Row::with_capacity(columns.len());
    for (column, raw) in columns.iter().zip(raw_values) {
        out.push(column.name.clone(), coerce(raw, column)?);
    }
    Ok(out)
}

fn convert_column(column: &mysql::Column) -> Column {
    let binary = column.flags().contains(ColumnFlags::BINARY_FLAG);
    let column_type = match column.column_type() {
        MySqlColumnType::MYSQL_TYPE_TINY => ColumnType::TinyInt,
        MySqlColumnType::MYSQL_TYPE_SHORT => ColumnType::SmallInt,
        MySqlColumnType::MYSQL_TYPE_INT24 => ColumnType::MediumInt,
        MySqlColumnType::MYSQL_TYPE_LONG => ColumnType::Int,
        MySqlColumnType::MYSQL_TYPE_LONGLONG => ColumnType::BigInt,
        MySqlColumnType::MYSQL_TYPE_DECIMAL
        | MySqlColumnType::MYSQL_TYPE_NEWDECIMAL => ColumnType::Decimal,
        MySqlColumnType::MYSQL_TYPE_FLOAT => ColumnType::Float,
        MySqlColumnType::MYSQL_TYPE_DOUBLE => ColumnType::Double,
        MySqlColumnType::MYSQL_TYPE_BIT => ColumnType::Bit,
        MySqlColumnType::MYSQL_TYPE_DATE
        | MySqlColumnType::MYSQL_TYPE_NEWDATE => ColumnType::Date,
        MySqlColumnType::MYSQL_TYPE_DATETIME => ColumnType::DateTime,
        MySqlColumnType::MYSQL_TYPE_TIMESTAMP => ColumnType::Timestamp,
        MySqlColumnType::MYSQL_TYPE_TIME => ColumnType::Time,
        MySqlColumnType::MYSQL_TYPE_JSON => ColumnType::Json,
        MySqlColumnType::MYSQL_TYPE_STRING => {
            if binary {
                ColumnType::Binary
            } else {
                ColumnType::Char
            }
        }
        MySqlColumnType::MYSQL_TYPE_VARCHAR
        | MySqlColumnType::MYSQL_TYPE_VAR_STRING => {
            if binary {
                ColumnType::VarBinary
            } else {
                ColumnType::Varchar
            }
        }
        MySqlColumnType::MYSQL_TYPE_TINY_BLOB => ColumnType::TinyBlob,
        MySqlColumnType::MYSQL_TYPE_MEDIUM_BLOB => ColumnType::MediumBlob,
        MySqlColumnType::MYSQL_TYPE_LONG_BLOB => ColumnType::LongBlob,
        MySqlColumnType::MYSQL_TYPE_BLOB => {
            // TEXT columns arrive as blob types without the binary flag
            if binary {
                ColumnType::Blob
            } else {
                ColumnType::Varchar
            }
        }
        _ => ColumnType::Other,
    };

    Column::new(column.name_str().into_owned(), column_type)
}

fn coerce(raw: mysql::Value, column: &Column) -> Result<Value, TabulaError> {
    match raw {
        mysql::Value::NULL => Ok(Value::Null),
        mysql::Value::Bytes(bytes) => {
            Value::from_bytes(bytes, column.column_type)
        }
        mysql::Value::Int(v) => Ok(Value::Int(v)),
        mysql::Value::UInt(v) => Ok(i64::try_from(v)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(v.to_string()))),
        mysql::Value::Float(v) => Ok(Value::Float(f64::from(v))),
        mysql::Value::Double(v) => Ok(Value::Float(v)),
        mysql::Value::Date(year, month, day, hour, minute, second, micro) => {
            Ok(timestamp_from_parts(
                year, month, day, hour, minute, second, micro,
            )
            .map(Value::Timestamp)
            .unwrap_or_else(|| {
                Value::Text(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ))
            }))
        }
        mysql::Value::Time(negative, days, hours, minutes, seconds, _) => {
            let hours = u32::from(hours) + days * 24;
            Ok(Value::Text(format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                hours,
                minutes,
                seconds
            )))
        }
    }
}

fn to_params(params: Vec<Value>) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Int(v) => mysql::Value::Int(*v),
        Value::Float(v) => mysql::Value::Double(*v),
        Value::Text(v) => mysql::Value::Bytes(v.clone().into_bytes()),
        Value::Timestamp(ts) => {
            mysql::Value::Bytes(format_datetime(ts).into_bytes())
        }
        Value::Bytes(bytes) => mysql::Value::Bytes(bytes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_time_value() {
        let column = Column::new("t".to_string(), ColumnType::Time);
        let value =
            coerce(mysql::Value::Time(false, 1, 2, 3, 4, 0), &column)
                .unwrap();
        assert_eq!(value, Value::Text("26:03:04".to_string()));
    }

    #[test]
    fn test_coerce_unsigned_overflow_falls_back_to_text() {
        let column = Column::new("n".to_string(), ColumnType::BigInt);
        let value = coerce(mysql::Value::UInt(u64::MAX), &column).unwrap();
        assert_eq!(value, Value::Text(u64::MAX.to_string()));
    }

    #[test]
    fn test_text_protocol_bytes_coerce_by_declared_type() {
        let column = Column::new("n".to_string(), ColumnType::Int);
        let value =
            coerce(mysql::Value::Bytes(b"42".to_vec()), &column).unwrap();
        assert_eq!(value, Value::Int(42));
    }
}
