//! The ephemeral "fly" workspace: loads flat files as tables into a
//! throwaway SQLite database (default `:memory:`) so SQL can be run
//! directly against them. A `meta` table records each loaded file with a
//! content hash, so a file-backed temp database skips reloading files
//! that have not changed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use time::OffsetDateTime;
use time::PrimitiveDateTime;

use crate::error::TabulaError;
use crate::import::fields_from_headers;
use crate::query::SqliteSource;
use crate::reader::{walk_all, FileWalker};
use crate::render::{render, Format, RenderOptions};
use crate::table::{Column, ResultSet};
use crate::value::{format_datetime, Value};

const ROWID_FIELD: &str = "__rowid";

#[derive(Debug, Clone)]
pub struct FlyOptions {
    /// Input specs, either `FILE` or `TABLE:FILE`.
    pub input_files: Vec<String>,
    pub csv_delimiter: u8,
    /// SQLite URI of the scratch database.
    pub temp_ds: String,
    pub use_column_num: bool,
    /// Load headers only (enough to answer show-tables against a fresh
    /// in-memory database).
    pub headers_only: bool,
}

#[derive(Debug, Clone)]
pub struct FlyTable {
    pub name: String,
    pub filename: String,
    pub hash: String,
    pub columns: Vec<String>,
    pub original_columns: Vec<String>,
}

pub fn open_database(temp_ds: &str) -> Result<Connection, TabulaError> {
    Connection::open(temp_ds).map_err(|err| {
        TabulaError::Config(format!(
            "create sqlite database {} failed: {}",
            temp_ds, err
        ))
    })
}

/// Load every input file into its own table, skipping files whose
/// recorded content hash is unchanged. Returns the tables known to the
/// database afterwards.
pub fn load_tables(
    conn: &Connection,
    options: &FlyOptions,
) -> Result<Vec<FlyTable>, TabulaError> {
    init_meta(conn)?;

    let base_id = query_max_meta_id(conn)?;
    let mut pending: Vec<FlyTable> = Vec::new();
    for (i, input) in options.input_files.iter().enumerate() {
        let (name, filename) = match input.split_once(':') {
            Some((table, file)) => (table.to_string(), file.to_string()),
            None => (format!("table_{}", base_id + i as i64), input.clone()),
        };

        let hash = file_hash(&filename)?;
        if let Some(existing) = query_meta(conn, &filename)? {
            if existing.hash == hash {
                log::debug!(
                    "file {} is unchanged, keep table {}",
                    filename,
                    existing.name
                );
                continue;
            }
        }

        pending.push(FlyTable {
            name,
            filename,
            hash,
            columns: Vec::new(),
            original_columns: Vec::new(),
        });
    }

    if !pending.is_empty() {
        load_pending(conn, options, &pending)?;
    }

    let mut tables = query_metas(conn)?;
    let mut seen = std::collections::HashSet::new();
    tables.retain(|table| seen.insert(table.name.clone()));
    Ok(tables)
}

fn load_pending(
    conn: &Connection,
    options: &FlyOptions,
    pending: &[FlyTable],
) -> Result<(), TabulaError> {
    let mut walkers: Vec<FileWalker> = Vec::new();
    for table in pending {
        match FileWalker::for_path(
            &table.filename,
            options.csv_delimiter,
            options.headers_only,
        ) {
            Some(walker) => walkers.push(walker),
            None => {
                return Err(TabulaError::Config(
                    "no file available: only csv or xlsx files are \
                     supported"
                        .to_string(),
                ))
            }
        }
    }

    let by_file: HashMap<&str, &FlyTable> = pending
        .iter()
        .map(|table| (table.filename.as_str(), table))
        .collect();

    struct LoadState {
        table_name: String,
        fields: Vec<String>,
        record_index: i64,
    }
    let state = RefCell::new(LoadState {
        table_name: String::new(),
        fields: Vec::new(),
        record_index: 1,
    });

    let mut header_cb = |filepath: &str,
                         headers: &[String]|
     -> Result<(), TabulaError> {
        let table = by_file.get(filepath).ok_or_else(|| {
            TabulaError::Walk(format!("unknown input file {}", filepath))
        })?;

        let fields: Vec<String> =
            fields_from_headers(headers, options.use_column_num)
                .into_iter()
                .map(|field| field.field)
                .collect();

        conn.execute(
            &format!("DROP TABLE IF EXISTS {}", table.name),
            [],
        )
        .map_err(|err| {
            TabulaError::Query(format!(
                "drop table {} failed: {}",
                table.name, err
            ))
        })?;
        conn.execute(
            &format!(
                "CREATE TABLE {} ({} int PRIMARY KEY NOT NULL, {})",
                table.name,
                ROWID_FIELD,
                fields.join(",")
            ),
            [],
        )
        .map_err(|err| {
            TabulaError::Query(format!(
                "create table {} failed: {}",
                table.name, err
            ))
        })?;

        let mut all_fields = vec![ROWID_FIELD.to_string()];
        all_fields.extend(fields);
        add_table_meta(conn, table, &all_fields, headers)?;

        let mut state = state.borrow_mut();
        state.table_name = table.name.clone();
        state.fields = all_fields;
        state.record_index = 1;
        Ok(())
    };

    let mut data_cb = |_filepath: &str,
                       _id: &str,
                       data: &[String]|
     -> Result<(), TabulaError> {
        if options.headers_only {
            return Ok(());
        }

        let mut state = state.borrow_mut();
        if state.fields.is_empty() {
            return Err(TabulaError::Walk(
                "data row received before header".to_string(),
            ));
        }
        let cell_count = data.len().min(state.fields.len() - 1);

        let placeholders = vec!["?"; cell_count + 1].join(",");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            state.table_name,
            state.fields[0..cell_count + 1].join(","),
            placeholders
        );

        let mut values: Vec<rusqlite::types::Value> =
            vec![rusqlite::types::Value::Integer(state.record_index)];
        values.extend(
            data[0..cell_count]
                .iter()
                .map(|cell| rusqlite::types::Value::Text(cell.clone())),
        );

        conn.execute(&sql, params_from_iter(values)).map_err(|err| {
            TabulaError::Query(format!("insert data failed: {}", err))
        })?;

        state.record_index += 1;
        Ok(())
    };

    walk_all(&walkers, &mut header_cb, &mut data_cb)
}

/// Render the meta table plus each loaded table's structure to the sink.
pub fn show_tables(
    conn: &Connection,
    tables: &[FlyTable],
    output: &mut dyn Write,
) -> Result<(), TabulaError> {
    let source = SqliteSource::new(conn);
    let options = RenderOptions::new(Format::Table);

    let meta = source.query(
        "SELECT filename file, name 'table', created_at FROM meta",
        &[],
    )?;
    let bytes = render(&options, &meta.columns, &meta.rows)?;
    output.write_all(&bytes)?;

    for table in tables {
        writeln!(output, "\nTable: {} <- {}", table.name, table.filename)?;

        let info = source.query(
            &format!("PRAGMA table_info({})", table.name),
            &[],
        )?;
        let info = decorate_table_info(info, table);
        let bytes = render(&options, &info.columns, &info.rows)?;
        output.write_all(&bytes)?;
    }

    Ok(())
}

/// Massage `PRAGMA table_info` output for display: drop the default-value
/// column, flag pk/notnull as Y/N and carry the original file header next
/// to each generated column name.
fn decorate_table_info(mut result: ResultSet, table: &FlyTable) -> ResultSet {
    let mut columns: Vec<Column> = Vec::new();
    for (i, col) in result.columns.iter().enumerate() {
        if col.name.eq_ignore_ascii_case("dflt_value") {
            continue;
        }
        columns.push(col.clone());
        if i == 0 {
            columns.push(Column::varchar("original"));
        }
    }

    for (i, row) in result.rows.iter_mut().enumerate() {
        for flag in ["pk", "notnull"] {
            let yes = matches!(row.get(flag), Some(Value::Int(v)) if *v > 0);
            row.set(
                flag,
                Value::Text(if yes { "Y" } else { "N" }.to_string()),
            );
        }

        // row 0 is the synthetic rowid column and has no original header
        if i > 0 {
            if let Some(original) = table.original_columns.get(i - 1) {
                row.set("original", Value::Text(original.clone()));
            }
        }
    }

    result.columns = columns;
    result
}

fn init_meta(conn: &Connection) -> Result<(), TabulaError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (id int PRIMARY KEY NOT NULL, \
         filename, hash, name, columns, original_columns, created_at)",
        [],
    )
    .map_err(|err| {
        TabulaError::Query(format!("create meta table failed: {}", err))
    })?;
    Ok(())
}

fn query_max_meta_id(conn: &Connection) -> Result<i64, TabulaError> {
    let max: Option<i64> = conn
        .query_row("SELECT MAX(id) FROM meta", [], |row| row.get(0))
        .map_err(|err| {
            TabulaError::Query(format!("query max meta id failed: {}", err))
        })?;
    Ok(max.unwrap_or(0))
}

fn query_meta(
    conn: &Connection,
    filename: &str,
) -> Result<Option<FlyTable>, TabulaError> {
    conn.query_row(
        "SELECT filename, hash, name, columns, original_columns FROM meta \
         WHERE filename = ?",
        params![filename],
        |row| {
            let columns: String = row.get(3)?;
            let original_columns: String = row.get(4)?;
            Ok(FlyTable {
                filename: row.get(0)?,
                hash: row.get(1)?,
                name: row.get(2)?,
                columns: split_list(&columns),
                original_columns: split_list(&original_columns),
            })
        },
    )
    .optional()
    .map_err(|err| {
        TabulaError::Query(format!("query meta failed: {}", err))
    })
}

fn query_metas(conn: &Connection) -> Result<Vec<FlyTable>, TabulaError> {
    let mut stmt = conn
        .prepare(
            "SELECT filename, hash, name, columns, original_columns FROM \
             meta ORDER BY id",
        )
        .map_err(|err| {
            TabulaError::Query(format!("query metas failed: {}", err))
        })?;

    let tables = stmt
        .query_map([], |row| {
            let columns: String = row.get(3)?;
            let original_columns: String = row.get(4)?;
            Ok(FlyTable {
                filename: row.get(0)?,
                hash: row.get(1)?,
                name: row.get(2)?,
                columns: split_list(&columns),
                original_columns: split_list(&original_columns),
            })
        })
        .map_err(|err| {
            TabulaError::Query(format!("query metas failed: {}", err))
        })?
        .collect::<Result<Vec<FlyTable>, rusqlite::Error>>()
        .map_err(|err| {
            TabulaError::Query(format!("scan meta failed: {}", err))
        })?;

    Ok(tables)
}

fn add_table_meta(
    conn: &Connection,
    table: &FlyTable,
    fields: &[String],
    headers: &[String],
) -> Result<(), TabulaError> {
    conn.execute(
        "DELETE FROM meta WHERE filename = ?",
        params![table.filename],
    )
    .map_err(|err| {
        TabulaError::Query(format!(
            "delete meta for {} failed: {}",
            table.name, err
        ))
    })?;

    let now = OffsetDateTime::now_utc();
    let created_at =
        format_datetime(&PrimitiveDateTime::new(now.date(), now.time()));

    conn.execute(
        "INSERT INTO meta (id, filename, hash, name, columns, \
         original_columns, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            query_max_meta_id(conn)? + 1,
            table.filename,
            table.hash,
            table.name,
            fields.join(","),
            headers.join(","),
            created_at,
        ],
    )
    .map_err(|err| {
        TabulaError::Query(format!(
            "insert meta for {} failed: {}",
            table.name, err
        ))
    })?;

    Ok(())
}

fn split_list(joined: &str) -> Vec<String> {
    joined.split(',').map(|part| part.to_string()).collect()
}

fn file_hash(path: &str) -> Result<String, TabulaError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes);
    Ok(format!("{:08x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn csv_fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn options_for(file: &tempfile::NamedTempFile) -> FlyOptions {
        FlyOptions {
            input_files: vec![format!(
                "people:{}",
                file.path().to_string_lossy()
            )],
            csv_delimiter: b',',
            temp_ds: ":memory:".to_string(),
            use_column_num: false,
            headers_only: false,
        }
    }

    #[test]
    fn test_load_and_query_table() {
        let file = csv_fixture("id,name\n1,Alice\n2,Bob\n");
        let conn = open_database(":memory:").unwrap();

        let tables = load_tables(&conn, &options_for(&file)).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "people");
        assert_eq!(tables[0].original_columns, vec!["id", "name"]);

        let source = SqliteSource::new(&conn);
        let result = source
            .query("SELECT COUNT(*) total FROM people", &[])
            .unwrap();
        assert_eq!(result.rows[0].get("total"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_rowid_column_is_added() {
        let file = csv_fixture("a\nx\ny\n");
        let conn = open_database(":memory:").unwrap();
        let options = FlyOptions {
            input_files: vec![format!(
                "t:{}",
                file.path().to_string_lossy()
            )],
            ..options_for(&file)
        };

        load_tables(&conn, &options).unwrap();

        let source = SqliteSource::new(&conn);
        let result = source
            .query("SELECT __rowid, a FROM t ORDER BY __rowid", &[])
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("__rowid"), Some(&Value::Int(1)));
        assert_eq!(result.rows[1].get("__rowid"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_generated_table_names() {
        let file = csv_fixture("a\n1\n");
        let conn = open_database(":memory:").unwrap();
        let options = FlyOptions {
            input_files: vec![file.path().to_string_lossy().into_owned()],
            csv_delimiter: b',',
            temp_ds: ":memory:".to_string(),
            use_column_num: false,
            headers_only: false,
        };

        let tables = load_tables(&conn, &options).unwrap();
        assert_eq!(tables.len(), 1);
        assert!(tables[0].name.starts_with("table_"));
    }

    #[test]
    fn test_show_tables_renders_meta() {
        let file = csv_fixture("id,name\n1,Alice\n");
        let conn = open_database(":memory:").unwrap();
        let tables = load_tables(&conn, &options_for(&file)).unwrap();

        let mut out: Vec<u8> = Vec::new();
        show_tables(&conn, &tables, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("people"));
        assert!(text.contains("original"));
        assert!(text.contains("__rowid"));
    }
}
