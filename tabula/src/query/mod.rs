//! Binds a query source, an output format and a sink into row-counting
//! write operations, in either eager (standard) or streaming mode.

mod mysql;
mod sqlite;

pub use mysql::MySqlSource;
pub use sqlite::SqliteSource;

use std::io::Write;
use std::time::Duration;

use crate::error::TabulaError;
use crate::render::{
    render, streaming_render, validate, Format, RenderOptions,
    MAX_ROWS_PER_SHEET,
};
use crate::value::Value;

pub struct QueryWriter<'a> {
    source: &'a MySqlSource,
    target_table: Option<String>,
    query_timeout: Option<Duration>,
    max_sheet_rows: usize,
}

impl<'a> QueryWriter<'a> {
    pub fn new(
        source: &'a MySqlSource,
        target_table: Option<String>,
    ) -> QueryWriter<'a> {
        QueryWriter {
            source,
            target_table,
            query_timeout: None,
            max_sheet_rows: MAX_ROWS_PER_SHEET,
        }
    }

    pub fn with_query_timeout(
        mut self,
        timeout: Option<Duration>,
    ) -> QueryWriter<'a> {
        self.query_timeout = timeout;
        self
    }

    pub fn with_max_sheet_rows(mut self, max: usize) -> QueryWriter<'a> {
        self.max_sheet_rows = max;
        self
    }

    fn options<'b>(
        &'b self,
        format: Format,
        no_header: bool,
        sql: &'b str,
    ) -> RenderOptions<'b> {
        RenderOptions {
            format,
            no_header,
            statement: sql,
            target_table: self.target_table.as_deref(),
            max_sheet_rows: self.max_sheet_rows,
        }
    }

    /// Query eagerly, render the whole result, write it to the sink and
    /// return the row count. Configuration problems surface before the
    /// database is touched; the sink may hold partial output when a later
    /// stage fails.
    pub fn standard_write(
        &self,
        sql: &str,
        params: Vec<Value>,
        format: Format,
        output: &mut dyn Write,
        no_header: bool,
    ) -> Result<usize, TabulaError> {
        let options = self.options(format, no_header, sql);
        validate(&options)?;

        let result = self.source.query(sql, params, self.query_timeout)?;
        let bytes = render(&options, &result.columns, &result.rows)?;
        output.write_all(&bytes)?;

        Ok(result.rows.len())
    }

    /// Streaming counterpart: constant memory, rows rendered as they
    /// arrive from the producer. Formats that cannot stream are rejected
    /// before any connection is opened.
    pub fn streaming_write(
        &self,
        sql: &str,
        params: Vec<Value>,
        format: Format,
        output: &mut dyn Write,
        no_header: bool,
    ) -> Result<usize, TabulaError> {
        let options = self.options(format, no_header, sql);
        if !format.streaming_capable() {
            return Err(TabulaError::Config(format!(
                "streaming only supports {}, the current format is {}",
                crate::render::format_names(&crate::render::STREAMING_FORMATS),
                format.name()
            )));
        }
        validate(&options)?;

        let stream = self.source.stream(sql, params)?;
        streaming_render(output, &options, stream)
    }
}
