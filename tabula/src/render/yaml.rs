use std::io::Write;

use crate::error::TabulaError;
use crate::render::json::row_to_json;
use crate::table::{Column, Row};

/// A single YAML document holding the rows as a sequence of maps.
pub(crate) fn write_document(
    output: &mut dyn Write,
    columns: &[Column],
    rows: &[Row],
) -> Result<(), TabulaError> {
    let items: Vec<serde_json::Value> =
        rows.iter().map(|row| row_to_json(columns, row)).collect();
    serde_yaml::to_writer(output, &items)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use crate::value::Value;

    #[test]
    fn test_sequence_of_maps() {
        let columns = vec![
            Column::new("id".to_string(), ColumnType::Int),
            Column::varchar("name"),
        ];
        let rows = vec![Row::new(vec![
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
        ])];

        let mut out: Vec<u8> = Vec::new();
        write_document(&mut out, &columns, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("- id: 1"));
        assert!(text.contains("name: Alice"));
    }
}
