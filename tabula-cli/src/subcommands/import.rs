use std::collections::HashMap;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tabula::{run_import, ImportOptions, MySqlSource, TabulaError};

use super::{
    csv_delimiter, get_flag, get_string, get_strings, global_args,
    init_logging, GlobalOptions,
};

pub fn import_subcommand() -> Command {
    let mut cmd = Command::new("import")
        .about("Load CSV/XLSX rows into a MySQL table")
        .arg(
            Arg::new("file")
                .long("file")
                .short('i')
                .visible_alias("input")
                .action(ArgAction::Append)
                .required(true)
                .help(
                    "input csv or xlsx file path, can be specified \
                     multiple times to import several files at once",
                ),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .short('t')
                .required(true)
                .help("target table name"),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .short('f')
                .action(ArgAction::Append)
                .help(
                    "field map in the form header:column, can be \
                     specified multiple times",
                ),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .short('I')
                .action(ArgAction::Append)
                .help(
                    "only these destination fields are imported, can be \
                     specified multiple times",
                ),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('E')
                .action(ArgAction::Append)
                .help(
                    "these destination fields are skipped, can be \
                     specified multiple times",
                ),
        )
        .arg(
            Arg::new("csv-separator")
                .long("csv-separator")
                .default_value(",")
                .help("csv field separator"),
        )
        .arg(
            Arg::new("tx")
                .long("tx")
                .short('T')
                .action(ArgAction::SetTrue)
                .help(
                    "import inside a transaction: all rows succeed or \
                     everything is rolled back",
                ),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help(
                    "validate the import inside a transaction and roll \
                     back even on success",
                ),
        )
        .arg(
            Arg::new("create-table")
                .long("create-table")
                .action(ArgAction::SetTrue)
                .help("create the target table when it does not exist"),
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
            Arg::new("with-ts")
                .long("with-ts")
                .action(ArgAction::SetTrue)
                .help("add a created_at column to the created table"),
        );

    for arg in global_args() {
        cmd = cmd.arg(arg);
    }
    cmd
}

pub fn handle_import(matches: &ArgMatches) -> Result<(), TabulaError> {
    let global = GlobalOptions::resolve(matches)?;
    init_logging(global.debug);

    let mut field_map = HashMap::new();
    for field in get_strings(matches, "field") {
        match field.split_once(':') {
            Some((header, column)) => {
                field_map.insert(header.to_string(), column.to_string());
            }
            None => {
                field_map.insert(field.clone(), field);
            }
        }
    }

    let options = ImportOptions {
        input_files: get_strings(matches, "file")
            .into_iter()
            .filter(|file| !file.is_empty())
            .collect(),
        table: get_string(matches, "table"),
        field_map,
        includes: get_strings(matches, "include"),
        excludes: get_strings(matches, "exclude"),
        csv_delimiter: csv_delimiter(matches)?,
        use_tx: get_flag(matches, "tx"),
        dry_run: get_flag(matches, "dry-run"),
        create_table: get_flag(matches, "create-table"),
        use_column_num: get_flag(matches, "use-column-num"),
        with_create_time: get_flag(matches, "with-ts"),
    };

    let source =
        MySqlSource::new(global.dsn(), Some(global.connect_timeout));
    let result = run_import(&source, &options)?;

    log::info!(
        "import finished: success={}, failed={}",
        result.success,
        result.failed
    );

    Ok(())
}
