use std::fs;
use std::io::Write;

use xlsxwriter::Workbook;

use crate::error::TabulaError;
use crate::table::{Column, Row};

/// Write rows into a spreadsheet, rolling over to a fresh sheet whenever
/// the configured per-sheet row ceiling is reached (the ceiling counts the
/// header row). The header row is written to the first sheet only.
///
/// The workbook library needs a real file path, so the sheets are built in
/// a scratch file and the finished bytes are copied into the sink — the
/// sink itself is never assumed seekable.
pub(crate) fn write_workbook<I>(
    output: &mut dyn Write,
    no_header: bool,
    columns: &[Column],
    rows: I,
    max_sheet_rows: usize,
) -> Result<usize, TabulaError>
where
    I: Iterator<Item = Result<Row, TabulaError>>,
{
    let max_sheet_rows = max_sheet_rows.max(1);

    let scratch = tempfile::Builder::new().suffix(".xlsx").tempfile()?;
    let path = scratch
        .path()
        .to_str()
        .ok_or_else(|| {
            TabulaError::Render(
                "temporary workbook path is not valid UTF-8".to_string(),
            )
        })?
        .to_string();

    let workbook = Workbook::new(&path)?;
    let mut sheet_index = 1usize;
    let mut sheet = workbook.add_worksheet(Some("Sheet1"))?;
    let mut row_num: u32 = 0;

    if !no_header {
        for (c, col) in columns.iter().enumerate() {
            sheet.write_string(row_num, c as u16, &col.name, None)?;
        }
        row_num += 1;
    }

    let mut total = 0usize;
    for row in rows {
        let row = row?;
        if row_num as usize >= max_sheet_rows {
            sheet_index += 1;
            let name = format!("Sheet{}", sheet_index);
            sheet = workbook.add_worksheet(Some(name.as_str()))?;
            row_num = 0;
        }

        for (c, col) in columns.iter().enumerate() {
            let text = row
                .get(&col.name)
                .map(|value| value.render_text(col))
                .unwrap_or_default();
            sheet.write_string(row_num, c as u16, &text, None)?;
        }
        row_num += 1;
        total += 1;
    }

    drop(sheet);
    workbook.close()?;

    let bytes = fs::read(scratch.path())?;
    output.write_all(&bytes)?;

    Ok(total)
}
