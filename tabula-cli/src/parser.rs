use clap::Command;

use crate::subcommands::convert::{convert_subcommand, handle_convert};
use crate::subcommands::export::{export_subcommand, handle_export};
use crate::subcommands::fly::{fly_subcommand, handle_fly};
use crate::subcommands::import::{handle_import, import_subcommand};

const PROGRAM_NAME: &str = "tabula";

pub fn run_cli(args: Vec<String>) {
    let app = Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .about(format!(
            "{}: move tabular data between flat files and databases",
            PROGRAM_NAME
        ))
        .subcommand(export_subcommand())
        .subcommand(import_subcommand())
        .subcommand(fly_subcommand())
        .subcommand(convert_subcommand());

    let matches = app.try_get_matches_from(args);

    match matches {
        Ok(matches) => {
            let result = match matches.subcommand() {
                Some(("export", matches)) => handle_export(matches),
                Some(("import", matches)) => handle_import(matches),
                Some(("fly", matches)) => handle_fly(matches),
                Some(("convert", matches)) => handle_convert(matches),
                _ => {
                    // given arg_required_else_help(true), this branch
                    // should never be reached
                    unreachable!("arg_required_else_help(true) not defined")
                }
            };

            if let Err(err) = result {
                log::error!("{}", err);
                std::process::exit(1);
            }
        }
        Err(e) => {
            if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                print!("{}", e);
            } else {
                eprintln!("Error parsing command-line arguments: {}", e);
                eprintln!(
                    "For more detailed help, try running '--help' or \
                     '<subcommand> --help'."
                );
                std::process::exit(1);
            }
        }
    }
}
