use std::io::Write;

use crate::error::TabulaError;
use crate::table::{Column, ColumnType, Row};
use crate::value::sanitize::{sanitize, sanitize_bytes};
use crate::value::{format_date, format_datetime, Value};

/// Emit one INSERT statement per row against the target table.
pub(crate) fn write_rows<I>(
    output: &mut dyn Write,
    target_table: &str,
    columns: &[Column],
    rows: I,
) -> Result<usize, TabulaError>
where
    I: Iterator<Item = Result<Row, TabulaError>>,
{
    let names: Vec<&str> =
        columns.iter().map(|col| col.name.as_str()).collect();
    let column_list = names.join(",");

    let mut total = 0usize;
    for row in rows {
        let row = row?;
        write!(output, "INSERT INTO {} ({}) VALUES (", target_table, column_list)?;
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                output.write_all(b",")?;
            }
            let value = row.get(&col.name).unwrap_or(&Value::Null);
            output.write_all(&literal(col, value))?;
        }
        output.write_all(b");\n")?;
        total += 1;
    }

    Ok(total)
}

/// Format one value as a SQL literal under its column's declared type:
/// bare NULL, unquoted numerics, quoted dates, sanitized quoted text and
/// `_binary` byte literals for binary/blob columns.
fn literal(column: &Column, value: &Value) -> Vec<u8> {
    match value {
        Value::Null => b"NULL".to_vec(),
        Value::Int(v) => v.to_string().into_bytes(),
        Value::Float(v) => v.to_string().into_bytes(),
        Value::Timestamp(ts) => {
            let text = if column.column_type == ColumnType::Date {
                format_date(ts)
            } else {
                format_datetime(ts)
            };
            format!("'{}'", text).into_bytes()
        }
        Value::Bytes(bytes) => {
            if column.column_type.is_binary() || column.column_type.is_blob()
            {
                let mut out = b"_binary'".to_vec();
                out.extend_from_slice(&sanitize_bytes(bytes));
                out.push(b'\'');
                out
            } else {
                format!("'{}'", sanitize(&String::from_utf8_lossy(bytes)))
                    .into_bytes()
            }
        }
        Value::Text(text) => {
            if column.column_type == ColumnType::Decimal {
                // numeric fallback text stays unquoted like numerics
                text.clone().into_bytes()
            } else {
                format!("'{}'", sanitize(text)).into_bytes()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(
        target: &str,
        columns: &[Column],
        rows: Vec<Row>,
    ) -> String {
        let mut out: Vec<u8> = Vec::new();
        write_rows(&mut out, target, columns, rows.into_iter().map(Ok))
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_insert_statements_with_null() {
        let columns = vec![
            Column::new("id".to_string(), ColumnType::Int),
            Column::varchar("name"),
        ];
        let rows = vec![
            Row::new(vec![
                ("id".to_string(), Value::Int(1)),
                ("name".to_string(), Value::Text("Alice".to_string())),
            ]),
            Row::new(vec![
                ("id".to_string(), Value::Int(2)),
                ("name".to_string(), Value::Null),
            ]),
        ];

        assert_eq!(
            render("users", &columns, rows),
            "INSERT INTO users (id,name) VALUES (1,'Alice');\n\
             INSERT INTO users (id,name) VALUES (2,NULL);\n"
        );
    }

    #[test]
    fn test_quotes_are_sanitized() {
        let columns = vec![Column::varchar("name")];
        let rows = vec![Row::new(vec![(
            "name".to_string(),
            Value::Text("it's".to_string()),
        )])];

        assert_eq!(
            render("t", &columns, rows),
            "INSERT INTO t (name) VALUES ('it\\'s');\n"
        );
    }

    #[test]
    fn test_integer_fidelity_without_quoting() {
        let columns = vec![Column::new("n".to_string(), ColumnType::BigInt)];
        let rows = vec![Row::new(vec![(
            "n".to_string(),
            Value::Int(i64::MAX),
        )])];

        assert_eq!(
            render("t", &columns, rows),
            format!("INSERT INTO t (n) VALUES ({});\n", i64::MAX)
        );
    }

    #[test]
    fn test_decimal_fidelity_without_quoting() {
        let columns =
            vec![Column::new("price".to_string(), ColumnType::Decimal)];
        let rows = vec![Row::new(vec![(
            "price".to_string(),
            Value::Float(12.5),
        )])];

        assert_eq!(
            render("t", &columns, rows),
            "INSERT INTO t (price) VALUES (12.5);\n"
        );
    }

    #[test]
    fn test_date_and_datetime_quoting() {
        let columns = vec![
            Column::new("d".to_string(), ColumnType::Date),
            Column::new("ts".to_string(), ColumnType::DateTime),
        ];
        let ts = crate::value::timestamp_from_parts(2023, 5, 1, 10, 20, 30, 0)
            .unwrap();
        let rows = vec![Row::new(vec![
            ("d".to_string(), Value::Timestamp(ts)),
            ("ts".to_string(), Value::Timestamp(ts)),
        ])];

        assert_eq!(
            render("t", &columns, rows),
            "INSERT INTO t (d,ts) VALUES \
             ('2023-05-01','2023-05-01 10:20:30');\n"
        );
    }

    #[test]
    fn test_blob_binary_literal() {
        let columns = vec![Column::new("b".to_string(), ColumnType::Blob)];
        let rows = vec![Row::new(vec![(
            "b".to_string(),
            Value::Bytes(vec![b'a', b'\'', 0xFF]),
        )])];

        let mut out: Vec<u8> = Vec::new();
        write_rows(&mut out, "t", &columns, rows.into_iter().map(Ok))
            .unwrap();
        assert_eq!(
            out,
            [
                b"INSERT INTO t (b) VALUES (_binary'a\\'".to_vec(),
                vec![0xFF],
                b"');\n".to_vec(),
            ]
            .concat()
        );
    }
}
