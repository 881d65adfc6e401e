use std::io::Write;

use crate::error::TabulaError;
use crate::table::{Column, Row};

/// One row as a JSON object. Keys end up in lexicographic order through
/// the serde_json map, matching the eager/streaming envelope contract.
pub(crate) fn row_to_json(
    columns: &[Column],
    row: &Row,
) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for col in columns {
        let value = row
            .get(&col.name)
            .map(|value| value.to_json(col))
            .unwrap_or(serde_json::Value::Null);
        object.insert(col.name.clone(), value);
    }
    serde_json::Value::Object(object)
}

/// Eager form: a single JSON array of row objects.
pub(crate) fn write_array(
    output: &mut dyn Write,
    columns: &[Column],
    rows: &[Row],
) -> Result<(), TabulaError> {
    let items: Vec<serde_json::Value> =
        rows.iter().map(|row| row_to_json(columns, row)).collect();
    serde_json::to_writer(output, &items)?;
    Ok(())
}

/// Streaming form: newline-delimited row objects (NDJSON). This envelope
/// deliberately differs from the eager array form; consumers of streaming
/// output are expected to parse NDJSON.
pub(crate) fn write_ndjson<I>(
    output: &mut dyn Write,
    columns: &[Column],
    rows: I,
) -> Result<usize, TabulaError>
where
    I: Iterator<Item = Result<Row, TabulaError>>,
{
    let mut total = 0usize;
    for row in rows {
        let row = row?;
        serde_json::to_writer(&mut *output, &row_to_json(columns, &row))?;
        output.write_all(b"\n")?;
        total += 1;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use crate::value::Value;

    fn sample() -> (Vec<Column>, Vec<Row>) {
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
        (columns, rows)
    }

    #[test]
    fn test_eager_array() {
        let (columns, rows) = sample();
        let mut out: Vec<u8> = Vec::new();
        write_array(&mut out, &columns, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"[{"id":1,"name":"Alice"},{"id":2,"name":null}]"#
        );
    }

    #[test]
    fn test_streaming_ndjson_same_rows() {
        let (columns, rows) = sample();
        let mut out: Vec<u8> = Vec::new();
        let total = write_ndjson(
            &mut out,
            &columns,
            rows.into_iter().map(Ok),
        )
        .unwrap();

        assert_eq!(total, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"id":1,"name":"Alice"}"#,
                r#"{"id":2,"name":null}"#
            ]
        );
    }
}
