use std::time::{Duration, Instant};

use clap::{Arg, ArgAction, ArgMatches, Command};
use tabula::{
    format_names, Format, MySqlSource, QueryWriter, TabulaError,
    STANDARD_FORMATS, STREAMING_FORMATS,
};

use super::{
    get_flag, get_string, global_args, init_logging, open_output,
    parse_number, resolve_sql, GlobalOptions,
};

pub fn export_subcommand() -> Command {
    let mut cmd = Command::new("export")
        .about("Execute SQL against MySQL and render the result")
        .arg(Arg::new("sql").long("sql").short('s').help(
            "SQL statement (read from STDIN when omitted, terminated \
             by ';')",
        ))
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .default_value("csv")
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
            Arg::new("streaming")
                .long("streaming")
                .short('S')
                .action(ArgAction::SetTrue)
                .help(format!(
                    "write rows as they arrive instead of waiting for \
                     the whole result; restricts the format to {}",
                    format_names(&STREAMING_FORMATS)
                )),
        )
        .arg(
            Arg::new("no-header")
                .long("no-header")
                .short('n')
                .action(ArgAction::SetTrue)
                .help("do not write the table header"),
        )
        .arg(
            Arg::new("query-timeout")
                .long("query-timeout")
                .default_value("120")
                .help(
                    "query timeout in seconds, ignored in streaming mode",
                ),
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
        );

    for arg in global_args() {
        cmd = cmd.arg(arg);
    }
    cmd
}

pub fn handle_export(matches: &ArgMatches) -> Result<(), TabulaError> {
    let global = GlobalOptions::resolve(matches)?;
    init_logging(global.debug);

    let sql = resolve_sql(matches)?;
    let format = Format::from_name(&get_string(matches, "format"))?;
    let streaming = get_flag(matches, "streaming");
    let no_header = get_flag(matches, "no-header");
    let output_path = get_string(matches, "output");
    let target_table = get_string(matches, "table");
    let query_timeout =
        Duration::from_secs(parse_number(matches, "query-timeout")?);
    let max_sheet_rows = parse_number(matches, "xlsx-max-row")? as usize;

    let source =
        MySqlSource::new(global.dsn(), Some(global.connect_timeout));
    let writer = QueryWriter::new(
        &source,
        (!target_table.is_empty()).then(|| target_table.clone()),
    )
    .with_query_timeout(Some(query_timeout))
    .with_max_sheet_rows(max_sheet_rows);

    let mut output = open_output(&output_path)?;

    let start = Instant::now();
    let total = if streaming {
        writer.streaming_write(
            &sql,
            Vec::new(),
            format,
            output.as_mut(),
            no_header,
        )?
    } else {
        writer.standard_write(
            &sql,
            Vec::new(),
            format,
            output.as_mut(),
            no_header,
        )?
    };

    log::debug!(
        "write to {}, total {} records, {:?} elapsed",
        if output_path.is_empty() {
            "STDOUT"
        } else {
            output_path.as_str()
        },
        total,
        start.elapsed()
    );

    Ok(())
}
