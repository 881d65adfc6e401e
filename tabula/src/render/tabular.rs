use std::io::Write;

use comfy_table::{presets, Table};

use crate::error::TabulaError;
use crate::table::{Column, Row};

/// Row count above which the interactive table output gets a summarizing
/// footer row.
const FOOTER_THRESHOLD: usize = 10;

fn build(
    no_header: bool,
    columns: &[Column],
    rows: &[Row],
    preset: &str,
) -> Table {
    let mut table = Table::new();
    table.load_preset(preset);

    if !no_header {
        table.set_header(
            columns
                .iter()
                .map(|col| col.name.clone())
                .collect::<Vec<String>>(),
        );
    }

    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|col| {
                    row.get(&col.name)
                        .map(|value| value.render_text(col))
                        .unwrap_or_default()
                })
                .collect::<Vec<String>>(),
        );
    }

    table
}

pub(crate) fn write_table(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: &[Row],
) -> Result<(), TabulaError> {
    let mut table = build(no_header, columns, rows, presets::ASCII_FULL);

    if rows.len() > FOOTER_THRESHOLD {
        let footer: Vec<String> = if columns.len() > 1 {
            let mut cells = vec!["Total".to_string()];
            cells.resize(columns.len(), rows.len().to_string());
            cells
        } else {
            vec![format!("Total {}", rows.len())]
        };
        table.add_row(footer);
    }

    writeln!(output, "{}", table)?;
    Ok(())
}

pub(crate) fn write_markdown(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: &[Row],
) -> Result<(), TabulaError> {
    let table = build(no_header, columns, rows, presets::ASCII_MARKDOWN);
    writeln!(output, "{}", table)?;
    Ok(())
}
