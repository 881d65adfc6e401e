use std::io::Write;

use quick_xml::escape::escape;

use crate::error::TabulaError;
use crate::table::{Column, Row};

pub(crate) fn write_table(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: &[Row],
) -> Result<(), TabulaError> {
    writeln!(output, "<table>")?;

    if !no_header {
        let header: String = columns
            .iter()
            .map(|col| format!("<th>{}</th>", escape(col.name.as_str())))
            .collect();
        writeln!(output, "  <thead><tr>{}</tr></thead>", header)?;
    }

    writeln!(output, "  <tbody>")?;
    for row in rows {
        let cells: String = columns
            .iter()
            .map(|col| {
                let value = row
                    .get(&col.name)
                    .map(|value| value.render_text(col))
                    .unwrap_or_default();
                format!("<td>{}</td>", escape(value.as_str()))
            })
            .collect();
        writeln!(output, "    <tr>{}</tr>", cells)?;
    }
    writeln!(output, "  </tbody>")?;
    writeln!(output, "</table>")?;

    Ok(())
}
