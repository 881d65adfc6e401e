use std::io::Write;

use crate::error::TabulaError;
use crate::table::{Column, Row};

/// Default line-oriented output: one row per line, `name=value` pairs
/// joined by `, ` (bare values without the header), embedded newlines
/// flattened to a literal `\n` so one row stays one line.
pub(crate) fn write_rows<I>(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: I,
) -> Result<usize, TabulaError>
where
    I: Iterator<Item = Result<Row, TabulaError>>,
{
    let mut total = 0usize;
    for row in rows {
        let row = row?;
        let fields: Vec<String> = columns
            .iter()
            .map(|col| {
                let value = row
                    .get(&col.name)
                    .map(|value| value.render_text(col))
                    .unwrap_or_default();
                let field = if no_header {
                    value
                } else {
                    format!("{}={}", col.name, value)
                };
                field.replace('\n', "\\n")
            })
            .collect();
        writeln!(output, "{}", fields.join(", "))?;
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
    fn test_no_header_lines() {
        let (columns, rows) = sample();
        let mut out: Vec<u8> = Vec::new();
        write_rows(&mut out, true, &columns, rows.into_iter().map(Ok))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1, Alice\n2, \n");
    }

    #[test]
    fn test_named_fields_and_newline_escape() {
        let columns = vec![Column::varchar("note")];
        let rows = vec![Row::new(vec![(
            "note".to_string(),
            Value::Text("line1\nline2".to_string()),
        )])];

        let mut out: Vec<u8> = Vec::new();
        write_rows(&mut out, false, &columns, rows.into_iter().map(Ok))
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "note=line1\\nline2\n"
        );
    }
}
