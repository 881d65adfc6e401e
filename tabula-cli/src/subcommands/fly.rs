use std::io::Write as _;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tabula::fly;
use tabula::{
    format_names, render, Format, RenderOptions, SqliteSource, TabulaError,
    STANDARD_FORMATS,
};

use super::{
    csv_delimiter, get_flag, get_string, get_strings, init_logging,
    open_output, parse_number, resolve_sql,
};

pub fn fly_subcommand() -> Command {
    Command::new("fly")
        .about(
            "Load CSV/XLSX files into an ephemeral SQLite database and \
             run SQL against them",
        )
        .arg(Arg::new("sql").long("sql").short('s').help(
            "SQL statement (read from STDIN when omitted, terminated \
             by ';')",
        ))
        .arg(
            Arg::new("file")
                .long("file")
                .short('i')
                .visible_alias("input")
                .action(ArgAction::Append)
                .required(true)
                .help(
                    "input csv or xlsx file path, TABLE:FILE picks the \
                     table name; can be specified multiple times",
                ),
        )
        .arg(
            Arg::new("csv-separator")
                .long("csv-separator")
                .default_value(",")
                .help("csv field separator"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .default_value("table")
                .help(format!(
                    "output format, support {}",
                    format_names(&STANDARD_FORMATS)
                )),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .default_value("")
                .help("write output to a file, stdout by default"),
        )
        .arg(
            Arg::new("no-header")
                .long("no-header")
                .short('n')
                .action(ArgAction::SetTrue)
                .help("do not write the table header"),
        )
        .arg(
            Arg::new("xlsx-max-row")
                .long("xlsx-max-row")
                .default_value("1048576")
                .help(
                    "maximum number of rows per sheet in an xlsx file, \
                     header row included",
                ),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .default_value("")
                .help("target table name, required by the sql format"),
        )
        .arg(
            Arg::new("use-column-num")
                .long("use-column-num")
                .action(ArgAction::SetTrue)
                .help(
                    "use positional column names col_1, col_2, ... \
                     instead of the header names",
                ),
        )
        .arg(
            Arg::new("show-tables")
                .long("show-tables")
                .action(ArgAction::SetTrue)
                .help("show the loaded tables and their structure"),
        )
        .arg(
            Arg::new("temp-ds")
                .long("temp-ds")
                .default_value(":memory:")
                .help(
                    "the temporary database uri, e.g. \
                     file:data.db?cache=shared",
                ),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('D')
                .action(ArgAction::SetTrue)
                .help("debug mode"),
        )
}

pub fn handle_fly(matches: &ArgMatches) -> Result<(), TabulaError> {
    init_logging(get_flag(matches, "debug"));

    let show_tables_requested = get_flag(matches, "show-tables");
    let sql = if show_tables_requested {
        get_string(matches, "sql")
    } else {
        resolve_sql(matches)?
    };
    let sql = sql.trim().trim_matches(';').trim().to_string();
    if sql.is_empty() && !show_tables_requested {
        return Err(TabulaError::Config(
            "--sql or -s is required".to_string(),
        ));
    }

    let temp_ds = get_string(matches, "temp-ds");
    let options = fly::FlyOptions {
        input_files: get_strings(matches, "file")
            .into_iter()
            .filter(|file| !file.is_empty())
            .collect(),
        csv_delimiter: csv_delimiter(matches)?,
        temp_ds: temp_ds.clone(),
        use_column_num: get_flag(matches, "use-column-num"),
        headers_only: show_tables_requested && temp_ds == ":memory:",
    };

    let conn = fly::open_database(&temp_ds)?;
    let tables = fly::load_tables(&conn, &options)?;

    if show_tables_requested {
        let mut stdout = std::io::stdout();
        return fly::show_tables(&conn, &tables, &mut stdout);
    }

    let format = Format::from_name(&get_string(matches, "format"))?;
    let target_table = get_string(matches, "table");
    let render_options = RenderOptions {
        format,
        no_header: get_flag(matches, "no-header"),
        statement: &sql,
        target_table: (!target_table.is_empty())
            .then(|| target_table.as_str()),
        max_sheet_rows: parse_number(matches, "xlsx-max-row")? as usize,
    };

    let source = SqliteSource::new(&conn);
    let result = source.query(&sql, &[])?;
    let bytes = render(&render_options, &result.columns, &result.rows)?;

    let output_path = get_string(matches, "output");
    let mut output = open_output(&output_path)?;
    output.write_all(&bytes)?;

    log::debug!("query returned {} records", result.rows.len());
    Ok(())
}
