use std::error::Error;
use std::{fmt, io};

#[derive(Debug)]
pub enum TabulaError {
    /// Invalid flag or option combination, detected before any I/O.
    Config(String),
    /// Database unreachable within the connect timeout.
    Connect(String),
    /// SQL execution failure.
    Query(String),
    /// Column metadata could not be read from a cursor.
    Schema(String),
    /// Unexpected value shape during per-cell coercion.
    RowCoercion(String),
    /// File walking failed outright (not a single-row failure).
    Walk(String),
    /// Rendering failed for a reason other than a wrapped writer error.
    Render(String),
    Io(io::Error),
    Csv(csv::Error),
    Sqlite(rusqlite::Error),
    MySql(mysql::Error),
    Xlsx(xlsxwriter::XlsxError),
    XlsxRead(calamine::XlsxError),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Xml(quick_xml::Error),
}

impl fmt::Display for TabulaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TabulaError::Config(s) => write!(f, "Config error: {}", s),
            TabulaError::Connect(s) => write!(f, "Connect error: {}", s),
            TabulaError::Query(s) => write!(f, "Query error: {}", s),
            TabulaError::Schema(s) => write!(f, "Schema error: {}", s),
            TabulaError::RowCoercion(s) => {
                write!(f, "Row coercion error: {}", s)
            }
            TabulaError::Walk(s) => write!(f, "Walk error: {}", s),
            TabulaError::Render(s) => write!(f, "Render error: {}", s),
            TabulaError::Io(e) => write!(f, "{}", e),
            TabulaError::Csv(e) => write!(f, "{}", e),
            TabulaError::Sqlite(e) => write!(f, "{}", e),
            TabulaError::MySql(e) => write!(f, "{}", e),
            TabulaError::Xlsx(e) => write!(f, "{}", e),
            TabulaError::XlsxRead(e) => write!(f, "{}", e),
            TabulaError::Json(e) => write!(f, "{}", e),
            TabulaError::Yaml(e) => write!(f, "{}", e),
            TabulaError::Xml(e) => write!(f, "{}", e),
        }
    }
}

impl Error for TabulaError {}

impl From<io::Error> for TabulaError {
    fn from(error: io::Error) -> Self {
        TabulaError::Io(error)
    }
}

impl From<csv::Error> for TabulaError {
    fn from(error: csv::Error) -> Self {
        TabulaError::Csv(error)
    }
}

impl From<rusqlite::Error> for TabulaError {
    fn from(error: rusqlite::Error) -> Self {
        TabulaError::Sqlite(error)
    }
}

impl From<mysql::Error> for TabulaError {
    fn from(error: mysql::Error) -> Self {
        TabulaError::MySql(error)
    }
}

impl From<xlsxwriter::XlsxError> for TabulaError {
    fn from(error: xlsxwriter::XlsxError) -> Self {
        TabulaError::Xlsx(error)
    }
}

impl From<calamine::XlsxError> for TabulaError {
    fn from(error: calamine::XlsxError) -> Self {
        TabulaError::XlsxRead(error)
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(error: serde_json::Error) -> Self {
        TabulaError::Json(error)
    }
}

impl From<serde_yaml::Error> for TabulaError {
    fn from(error: serde_yaml::Error) -> Self {
        TabulaError::Yaml(error)
    }
}

impl From<quick_xml::Error> for TabulaError {
    fn from(error: quick_xml::Error) -> Self {
        TabulaError::Xml(error)
    }
}
