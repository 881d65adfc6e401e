pub mod error;
pub mod fly;
pub mod import;
pub mod query;
pub mod reader;
pub mod render;
pub mod table;
pub mod value;

pub use error::TabulaError;
pub use fly::{load_tables, open_database, show_tables, FlyOptions, FlyTable};
pub use import::{run_import, ImportOptions, ImportResult};
pub use query::{MySqlSource, QueryWriter, SqliteSource};
pub use reader::{walk_all, FileWalker};
pub use render::{
    format_names, render, streaming_render, Format, RenderOptions,
    MAX_ROWS_PER_SHEET, STANDARD_FORMATS, STREAMING_FORMATS,
};
pub use table::{
    Column, ColumnType, NativeKind, ResultSet, Row, RowSender, RowStream,
};
pub use value::Value;
