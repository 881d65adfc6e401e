use std::cell::RefCell;
use std::io::Write as _;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tabula::{
    format_names, render, Column, FileWalker, Format, RenderOptions, Row,
    TabulaError, Value, STANDARD_FORMATS,
};

use super::{
    csv_delimiter, get_flag, get_string, get_strings, init_logging,
    open_output, parse_number,
};

pub fn convert_subcommand() -> Command {
    Command::new("convert")
        .about("Re-render one CSV/XLSX file in another output format")
        .arg(
            Arg::new("file")
                .long("file")
                .short('i')
                .visible_alias("input")
                .required(true)
                .help("input csv or xlsx file path"),
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
            Arg::new("include")
                .long("include")
                .short('I')
                .action(ArgAction::Append)
                .help(
                    "only these columns are output, can be specified \
                     multiple times",
                ),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('E')
                .action(ArgAction::Append)
                .help(
                    "these columns are skipped, can be specified \
                     multiple times",
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

pub fn handle_convert(matches: &ArgMatches) -> Result<(), TabulaError> {
    init_logging(get_flag(matches, "debug"));

    let input = get_string(matches, "file");
    let format = Format::from_name(&get_string(matches, "format"))?;
    let target_table = get_string(matches, "table");
    if format == Format::Sql && target_table.is_empty() {
        return Err(TabulaError::Config(
            "when the format is sql, the target table name (--table) is \
             required"
                .to_string(),
        ));
    }

    let includes = get_strings(matches, "include");
    let mut excludes = get_strings(matches, "exclude");
    if !includes.is_empty() && !excludes.is_empty() {
        log::warn!(
            "includes and excludes are both set, excludes will be ignored"
        );
        excludes.clear();
    }

    let walker = FileWalker::for_path(&input, csv_delimiter(matches)?, false)
        .ok_or_else(|| {
            TabulaError::Config(
                "no file available: only csv or xlsx files are supported"
                    .to_string(),
            )
        })?;

    // per header index: the column name kept, or None when filtered out
    let selected: RefCell<Vec<Option<String>>> = RefCell::new(Vec::new());
    let rows: RefCell<Vec<Row>> = RefCell::new(Vec::new());

    let matches_name = |list: &[String], name: &str| {
        list.iter().any(|item| item.eq_ignore_ascii_case(name))
    };

    let mut header_cb =
        |_: &str, headers: &[String]| -> Result<(), TabulaError> {
            *selected.borrow_mut() = headers
                .iter()
                .map(|header| {
                    if !includes.is_empty()
                        && !matches_name(&includes, header)
                    {
                        return None;
                    }
                    if !excludes.is_empty() && matches_name(&excludes, header)
                    {
                        return None;
                    }
                    Some(header.clone())
                })
                .collect();
            Ok(())
        };

    let mut data_cb =
        |_: &str, _: &str, data: &[String]| -> Result<(), TabulaError> {
            let selected = selected.borrow();
            let mut row = Row::with_capacity(selected.len());
            for (i, cell) in data.iter().enumerate() {
                if let Some(Some(name)) = selected.get(i) {
                    row.push(name.clone(), Value::Text(cell.clone()));
                }
            }
            rows.borrow_mut().push(row);
            Ok(())
        };

    walker.walk(&mut header_cb, &mut data_cb)?;

    let columns: Vec<Column> = selected
        .into_inner()
        .into_iter()
        .flatten()
        .map(Column::varchar)
        .collect();
    let rows = rows.into_inner();

    let options = RenderOptions {
        format,
        no_header: get_flag(matches, "no-header"),
        statement: "",
        target_table: (!target_table.is_empty())
            .then(|| target_table.as_str()),
        max_sheet_rows: parse_number(matches, "xlsx-max-row")? as usize,
    };
    let bytes = render(&options, &columns, &rows)?;

    let output_path = get_string(matches, "output");
    let mut output = open_output(&output_path)?;
    output.write_all(&bytes)?;

    log::debug!("converted {} rows from {}", rows.len(), input);
    Ok(())
}
