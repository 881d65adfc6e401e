//! Row-by-row traversal over flat tabular files. A walker dispatches one
//! header callback, then one data callback per row, tagging each row with
//! a positional id used only for diagnostics (`"<row>"` for CSV,
//! `"<sheet>#<row>"` for XLSX).

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::error::TabulaError;

pub type HeaderCallback<'a> =
    dyn FnMut(&str, &[String]) -> Result<(), TabulaError> + 'a;
pub type DataCallback<'a> =
    dyn FnMut(&str, &str, &[String]) -> Result<(), TabulaError> + 'a;

pub enum FileWalker {
    Csv {
        path: PathBuf,
        delimiter: u8,
        only_header: bool,
    },
    Xlsx {
        path: PathBuf,
        only_header: bool,
    },
}

impl FileWalker {
    /// Pick a walker from the file extension. Returns None for formats
    /// that are not supported.
    pub fn for_path(
        path: impl AsRef<Path>,
        delimiter: u8,
        only_header: bool,
    ) -> Option<FileWalker> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Some(FileWalker::Csv {
                path: path.to_path_buf(),
                delimiter,
                only_header,
            }),
            Some("xlsx") => Some(FileWalker::Xlsx {
                path: path.to_path_buf(),
                only_header,
            }),
            _ => None,
        }
    }

    /// Traverse the file. The header callback runs exactly once, before
    /// any data callback; its failure aborts the walk. A data callback
    /// failure is logged and walking continues with the next row.
    pub fn walk(
        &self,
        header_cb: &mut HeaderCallback,
        data_cb: &mut DataCallback,
    ) -> Result<(), TabulaError> {
        match self {
            FileWalker::Csv {
                path,
                delimiter,
                only_header,
            } => walk_csv(path, *delimiter, *only_header, header_cb, data_cb),
            FileWalker::Xlsx { path, only_header } => {
                walk_xlsx(path, *only_header, header_cb, data_cb)
            }
        }
    }
}

/// Run several walkers as one logical stream. Fails fast when a walk
/// itself fails (distinct from per-row failures, which stay row-level).
pub fn walk_all(
    walkers: &[FileWalker],
    header_cb: &mut HeaderCallback,
    data_cb: &mut DataCallback,
) -> Result<(), TabulaError> {
    for walker in walkers {
        walker.walk(&mut *header_cb, &mut *data_cb)?;
    }
    Ok(())
}

fn walk_csv(
    path: &Path,
    delimiter: u8,
    only_header: bool,
    header_cb: &mut HeaderCallback,
    data_cb: &mut DataCallback,
) -> Result<(), TabulaError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let filepath = path.to_string_lossy().into_owned();
    let mut index = 0usize;
    for record in reader.records() {
        index += 1;
        let record = record?;
        let cells: Vec<String> =
            record.iter().map(|cell| cell.to_string()).collect();

        if index == 1 {
            if let Err(err) = header_cb(&filepath, &cells) {
                log::error!(
                    "handle header failed for {}: {}",
                    filepath,
                    err
                );
                return Err(err);
            }
            if only_header {
                break;
            }
            continue;
        }

        if let Err(err) = data_cb(&filepath, &index.to_string(), &cells) {
            log::error!(
                "handle data failed for {} row {}: {}",
                filepath,
                index,
                err
            );
        }
    }

    Ok(())
}

fn walk_xlsx(
    path: &Path,
    only_header: bool,
    header_cb: &mut HeaderCallback,
    data_cb: &mut DataCallback,
) -> Result<(), TabulaError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let filepath = path.to_string_lossy().into_owned();

    let sheet_names = workbook.sheet_names().to_owned();
    if sheet_names.is_empty() {
        return Ok(());
    }
    if sheet_names.len() > 1 {
        log::warn!(
            "file {} has more than one sheet, only the first sheet will \
             be processed",
            filepath
        );
    }

    let sheet = &sheet_names[0];
    let range = workbook.worksheet_range(sheet)?;

    let mut column_count = 0usize;
    for (row_index, row) in range.rows().enumerate() {
        let mut cells: Vec<String> =
            row.iter().map(cell_to_string).collect();

        if row_index == 0 {
            column_count = cells.len();
            if let Err(err) = header_cb(&filepath, &cells) {
                log::error!(
                    "handle header failed for {}: {}",
                    filepath,
                    err
                );
                return Err(err);
            }
            if only_header {
                break;
            }
            continue;
        }

        // data rows are normalized to the header width
        cells.resize(column_count, String::new());

        let id = format!("{}#{}", sheet, row_index + 1);
        if let Err(err) = data_cb(&filepath, &id, &cells) {
            log::error!(
                "handle data failed for {} row {}: {}",
                filepath,
                id,
                err
            );
        }
    }

    Ok(())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}
