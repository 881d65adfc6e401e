use std::io::Write;

use crate::error::TabulaError;
use crate::table::{Column, Row};

pub(crate) fn write_rows<I>(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: I,
) -> Result<usize, TabulaError>
where
    I: Iterator<Item = Result<Row, TabulaError>>,
{
    // UTF-8 byte order mark
    output.write_all(b"\xEF\xBB\xBF")?;

    let mut writer = csv::Writer::from_writer(output);
    if !no_header {
        writer.write_record(columns.iter().map(|col| col.name.as_str()))?;
    }

    let mut total = 0usize;
    for row in rows {
        let row = row?;
        let record: Vec<String> = columns
            .iter()
            .map(|col| {
                row.get(&col.name)
                    .map(|value| value.render_text(col))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
        total += 1;
    }
    writer.flush()?;

    Ok(total)
}
