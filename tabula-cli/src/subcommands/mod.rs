pub mod convert;
pub mod export;
pub mod fly;
pub mod import;

use std::fs::File;
use std::io::{BufRead, Write};
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches};
use tabula::TabulaError;

/// Database connection flags shared by the export and import commands.
pub fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("host")
            .long("host")
            .short('H')
            .default_value("127.0.0.1")
            .help("MySQL host"),
        Arg::new("port")
            .long("port")
            .short('P')
            .default_value("3306")
            .help("MySQL port"),
        Arg::new("user")
            .long("user")
            .short('u')
            .default_value("root")
            .help("MySQL user"),
        Arg::new("password")
            .long("password")
            .short('p')
            .default_value("")
            .help("MySQL password"),
        Arg::new("database")
            .long("database")
            .short('d')
            .default_value("")
            .help("MySQL database"),
        Arg::new("connect-timeout")
            .long("connect-timeout")
            .default_value("3")
            .help("database connect timeout in seconds"),
        Arg::new("debug")
            .long("debug")
            .short('D')
            .action(ArgAction::SetTrue)
            .help("debug mode"),
    ]
}

pub struct GlobalOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
    pub debug: bool,
}

impl GlobalOptions {
    pub fn resolve(matches: &ArgMatches) -> Result<GlobalOptions, TabulaError> {
        Ok(GlobalOptions {
            host: get_string(matches, "host"),
            port: parse_number(matches, "port")? as u16,
            user: get_string(matches, "user"),
            password: get_string(matches, "password"),
            database: get_string(matches, "database"),
            connect_timeout: Duration::from_secs(parse_number(
                matches,
                "connect-timeout",
            )?),
            debug: get_flag(matches, "debug"),
        })
    }

    pub fn dsn(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

pub fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

pub fn get_string(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

pub fn get_flag(matches: &ArgMatches, name: &str) -> bool {
    *matches.get_one::<bool>(name).unwrap_or(&false)
}

pub fn get_strings(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .get_many::<String>(name)
        .map_or(Vec::new(), |values| values.cloned().collect())
}

pub fn parse_number(
    matches: &ArgMatches,
    name: &str,
) -> Result<u64, TabulaError> {
    let raw = get_string(matches, name);
    raw.parse::<u64>().map_err(|_| {
        TabulaError::Config(format!("{} must be a number, got {}", name, raw))
    })
}

/// A single-character CSV field separator.
pub fn csv_delimiter(matches: &ArgMatches) -> Result<u8, TabulaError> {
    let raw = get_string(matches, "csv-separator");
    match raw.as_bytes() {
        [separator] => Ok(*separator),
        _ => Err(TabulaError::Config(format!(
            "csv-separator must be a single character, got {:?}",
            raw
        ))),
    }
}

/// Output sink: a file when requested, stdout otherwise.
pub fn open_output(path: &str) -> Result<Box<dyn Write>, TabulaError> {
    if path.is_empty() {
        Ok(Box::new(std::io::stdout()))
    } else {
        Ok(Box::new(File::create(path)?))
    }
}

/// Read a SQL statement from stdin, terminated by a line ending in `;`
/// or by end of input.
pub fn read_sql_from_stdin() -> Result<String, TabulaError> {
    let stdin = std::io::stdin();
    let mut result = String::new();
    for line in stdin.lock().lines() {
        let line = line?;
        result.push_str(&line);
        result.push('\n');
        if line.trim_end().ends_with(';') {
            break;
        }
    }
    Ok(result)
}

/// Resolve the SQL statement from the flag or stdin.
pub fn resolve_sql(matches: &ArgMatches) -> Result<String, TabulaError> {
    let sql = get_string(matches, "sql");
    if !sql.is_empty() {
        return Ok(sql);
    }
    read_sql_from_stdin()
}
