//! Serialization of a column/row model into the supported output formats,
//! in either eager (whole result in memory) or streaming (row at a time)
//! mode. Emitted field order always follows the column sequence.

mod html;
mod json;
mod plain;
mod sheet;
mod sql;
mod tabular;
mod text_csv;
mod xml;
mod yaml;

use std::io::Write;

use crate::error::TabulaError;
use crate::table::{Column, Row, RowStream};

/// Hard per-sheet row ceiling of the XLSX format.
pub const MAX_ROWS_PER_SHEET: usize = 1_048_576;

/// The closed set of output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    Yaml,
    Xml,
    Table,
    Html,
    Markdown,
    Xlsx,
    Plain,
    Sql,
}

pub const STANDARD_FORMATS: [Format; 10] = [
    Format::Csv,
    Format::Json,
    Format::Yaml,
    Format::Xml,
    Format::Table,
    Format::Html,
    Format::Markdown,
    Format::Xlsx,
    Format::Plain,
    Format::Sql,
];

pub const STREAMING_FORMATS: [Format; 5] = [
    Format::Csv,
    Format::Json,
    Format::Plain,
    Format::Xlsx,
    Format::Sql,
];

impl Format {
    pub fn from_name(name: &str) -> Result<Format, TabulaError> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            "xml" => Ok(Format::Xml),
            "table" => Ok(Format::Table),
            "html" => Ok(Format::Html),
            "markdown" => Ok(Format::Markdown),
            "xlsx" => Ok(Format::Xlsx),
            "plain" => Ok(Format::Plain),
            "sql" => Ok(Format::Sql),
            other => Err(TabulaError::Config(format!(
                "unsupported format {}, supported formats are {}",
                other,
                format_names(&STANDARD_FORMATS)
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
            Format::Table => "table",
            Format::Html => "html",
            Format::Markdown => "markdown",
            Format::Xlsx => "xlsx",
            Format::Plain => "plain",
            Format::Sql => "sql",
        }
    }

    /// Whether the format can be written incrementally, without the whole
    /// result in memory.
    pub fn streaming_capable(&self) -> bool {
        STREAMING_FORMATS.contains(self)
    }
}

pub fn format_names(formats: &[Format]) -> String {
    formats
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct RenderOptions<'a> {
    pub format: Format,
    pub no_header: bool,
    /// Original SQL text, carried into the XML envelope for audit output.
    pub statement: &'a str,
    /// Destination table name, required by the sql format.
    pub target_table: Option<&'a str>,
    pub max_sheet_rows: usize,
}

impl<'a> RenderOptions<'a> {
    pub fn new(format: Format) -> RenderOptions<'a> {
        RenderOptions {
            format,
            no_header: false,
            statement: "",
            target_table: None,
            max_sheet_rows: MAX_ROWS_PER_SHEET,
        }
    }
}

pub(crate) fn validate(options: &RenderOptions) -> Result<(), TabulaError> {
    if options.format == Format::Sql
        && options.target_table.map_or(true, str::is_empty)
    {
        return Err(TabulaError::Config(
            "when the format is sql, the target table name is required"
                .to_string(),
        ));
    }
    Ok(())
}

/// Render a fully materialized result into a byte buffer.
pub fn render(
    options: &RenderOptions,
    columns: &[Column],
    rows: &[Row],
) -> Result<Vec<u8>, TabulaError> {
    validate(options)?;

    let mut out: Vec<u8> = Vec::new();
    let eager = || rows.iter().cloned().map(Ok);
    match options.format {
        Format::Csv => {
            text_csv::write_rows(
                &mut out,
                options.no_header,
                columns,
                eager(),
            )?;
        }
        Format::Json => json::write_array(&mut out, columns, rows)?,
        Format::Yaml => yaml::write_document(&mut out, columns, rows)?,
        Format::Xml => {
            xml::write_resultset(&mut out, columns, rows, options.statement)?
        }
        Format::Table => {
            tabular::write_table(&mut out, options.no_header, columns, rows)?
        }
        Format::Markdown => tabular::write_markdown(
            &mut out,
            options.no_header,
            columns,
            rows,
        )?,
        Format::Html => {
            html::write_table(&mut out, options.no_header, columns, rows)?
        }
        Format::Xlsx => {
            sheet::write_workbook(
                &mut out,
                options.no_header,
                columns,
                eager(),
                options.max_sheet_rows,
            )?;
        }
        Format::Sql => {
            // validate() guarantees the table name is present
            let target = options.target_table.unwrap_or_default();
            sql::write_rows(&mut out, target, columns, eager())?;
        }
        Format::Plain => {
            plain::write_rows(&mut out, options.no_header, columns, eager())?;
        }
    }

    Ok(out)
}

/// Render a row stream incrementally into the sink, returning the row
/// count. A format that cannot stream is rejected before any I/O.
pub fn streaming_render(
    output: &mut dyn Write,
    options: &RenderOptions,
    stream: RowStream,
) -> Result<usize, TabulaError> {
    if !options.format.streaming_capable() {
        return Err(TabulaError::Config(format!(
            "streaming only supports {}, the current format is {}",
            format_names(&STREAMING_FORMATS),
            options.format.name()
        )));
    }
    validate(options)?;

    let columns = stream.columns().to_vec();
    match options.format {
        Format::Csv => {
            text_csv::write_rows(output, options.no_header, &columns, stream)
        }
        Format::Json => json::write_ndjson(output, &columns, stream),
        Format::Plain => {
            plain::write_rows(output, options.no_header, &columns, stream)
        }
        Format::Xlsx => sheet::write_workbook(
            output,
            options.no_header,
            &columns,
            stream,
            options.max_sheet_rows,
        ),
        Format::Sql => {
            let target = options.target_table.unwrap_or_default();
            sql::write_rows(output, target, &columns, stream)
        }
        _ => unreachable!("checked by streaming_capable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, RowStream};
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
    fn test_format_tokens_round_trip() {
        for format in STANDARD_FORMATS {
            assert_eq!(Format::from_name(format.name()).unwrap(), format);
        }
        assert!(matches!(
            Format::from_name("avro"),
            Err(TabulaError::Config(_))
        ));
    }

    #[test]
    fn test_streaming_rejects_table_format_before_io() {
        let (columns, rows) = sample();
        let stream = RowStream::from_rows(columns, rows);

        let options = RenderOptions::new(Format::Table);
        let mut out: Vec<u8> = Vec::new();
        let err = streaming_render(&mut out, &options, stream);
        assert!(matches!(err, Err(TabulaError::Config(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_sql_format_requires_target_table() {
        let (columns, rows) = sample();
        let options = RenderOptions::new(Format::Sql);
        assert!(matches!(
            render(&options, &columns, &rows),
            Err(TabulaError::Config(_))
        ));
    }

    #[test]
    fn test_eager_and_streaming_csv_agree() {
        let (columns, rows) = sample();

        let options = RenderOptions::new(Format::Csv);
        let eager = render(&options, &columns, &rows).unwrap();

        let stream = RowStream::from_rows(columns, rows);
        let mut streamed: Vec<u8> = Vec::new();
        let total =
            streaming_render(&mut streamed, &options, stream).unwrap();

        assert_eq!(total, 2);
        assert_eq!(eager, streamed);
    }
}
