//! File-to-database import: walks CSV/XLSX rows into a MySQL table with
//! field mapping, include/exclude filtering, optional table creation and
//! transactional / dry-run / best-effort modes.

use std::cell::RefCell;
use std::collections::HashMap;

use mysql::prelude::Queryable;
use mysql::{Params, TxOpts};
use serde::Serialize;

use crate::error::TabulaError;
use crate::query::MySqlSource;
use crate::reader::{walk_all, FileWalker};
use crate::value::sanitize::sanitize;

const MAX_COLUMN_NAME_LENGTH: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub input_files: Vec<String>,
    pub table: String,
    /// header name -> destination column name
    pub field_map: HashMap<String, String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub csv_delimiter: u8,
    pub use_tx: bool,
    pub dry_run: bool,
    pub create_table: bool,
    pub use_column_num: bool,
    pub with_create_time: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub success: usize,
    pub failed: usize,
}

/// A destination column derived from a file header: `name` is the header
/// text, `field` the database column it maps to.
#[derive(Debug, Clone)]
pub struct DatabaseField {
    pub index: usize,
    pub field: String,
    pub name: String,
}

pub fn fields_from_headers(
    headers: &[String],
    use_column_num: bool,
) -> Vec<DatabaseField> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let positional = format!("col_{}", i + 1);
            if use_column_num {
                return DatabaseField {
                    index: i,
                    field: positional,
                    name: header.clone(),
                };
            }

            let slug = slugify_column_name(header);
            let field = if slug.is_empty()
                || slug.len() > MAX_COLUMN_NAME_LENGTH
            {
                log::warn!(
                    "column name [{}] is invalid (empty or too long), use \
                     {} instead",
                    sanitize(header),
                    positional
                );
                positional
            } else if !slug
                .chars()
                .next()
                .map_or(false, |ch| ch.is_ascii_alphabetic())
            {
                log::warn!(
                    "column name [{}] is invalid, use {} instead",
                    sanitize(header),
                    positional
                );
                positional
            } else {
                slug
            };

            DatabaseField {
                index: i,
                field,
                name: header.clone(),
            }
        })
        .collect()
}

fn slugify_column_name(name: &str) -> String {
    name.chars()
        .filter_map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                Some(ch)
            } else if ch == ' ' {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

/// Apply the include/exclude allow-list. When both lists are supplied the
/// includes win: a warning is logged and the excludes are dropped.
pub fn resolve_allow_fields(
    fields: Vec<DatabaseField>,
    includes: &[String],
    excludes: &[String],
) -> Vec<DatabaseField> {
    let excludes: &[String] =
        if !includes.is_empty() && !excludes.is_empty() {
            log::warn!(
                "includes and excludes are both set, excludes will be \
                 ignored"
            );
            &[]
        } else {
            excludes
        };

    fields
        .into_iter()
        .filter(|field| {
            if !includes.is_empty() {
                includes.contains(&field.field)
            } else if !excludes.is_empty() {
                !excludes.contains(&field.field)
            } else {
                true
            }
        })
        .collect()
}

fn resolve_field_indexes(
    headers: &[String],
    allow_fields: &[DatabaseField],
) -> Vec<(String, usize)> {
    let mut indexes: Vec<(String, usize)> = Vec::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        if let Some(field) =
            allow_fields.iter().find(|field| &field.name == header)
        {
            if !indexes.iter().any(|(name, _)| name == &field.field) {
                indexes.push((field.field.clone(), i));
            }
        }
    }
    indexes
}

fn insert_template(table: &str, field_indexes: &[(String, usize)]) -> String {
    let fields: Vec<&str> =
        field_indexes.iter().map(|(name, _)| name.as_str()).collect();
    let placeholders = vec!["?"; fields.len()].join(",");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        fields.join(", "),
        placeholders
    )
}

pub fn run_import(
    source: &MySqlSource,
    options: &ImportOptions,
) -> Result<ImportResult, TabulaError> {
    let walkers: Vec<FileWalker> = options
        .input_files
        .iter()
        .filter_map(|file| {
            FileWalker::for_path(file, options.csv_delimiter, false)
        })
        .collect();
    if walkers.is_empty() {
        return Err(TabulaError::Config(
            "no file available: only csv or xlsx files are supported"
                .to_string(),
        ));
    }

    let mut conn = source.connect()?;

    if options.use_tx || options.dry_run {
        log::debug!("importing inside a transaction");
        let mut tx = conn.start_transaction(TxOpts::default())?;
        match import_into(&mut tx, options, &walkers, true) {
            Ok(result) => {
                if options.dry_run {
                    tx.rollback()?;
                    log::debug!(
                        "dry run finished, all changes have been rolled back"
                    );
                } else {
                    tx.commit()?;
                }
                Ok(result)
            }
            Err(err) => {
                log::error!(
                    "import failed, all changes have been rolled back: {}",
                    err
                );
                tx.rollback()?;
                Err(err)
            }
        }
    } else {
        import_into(&mut conn, options, &walkers, false)
    }
}

#[derive(Default)]
struct ImportState {
    field_indexes: Vec<(String, usize)>,
    template: String,
    result: ImportResult,
    abort: Option<String>,
}

fn import_into<Q: Queryable>(
    tx: &mut Q,
    options: &ImportOptions,
    walkers: &[FileWalker],
    transactional: bool,
) -> Result<ImportResult, TabulaError> {
    let state = RefCell::new(ImportState::default());
    let tx = RefCell::new(tx);

    let mut header_cb = |filepath: &str,
                         headers: &[String]|
     -> Result<(), TabulaError> {
        let fields = fields_from_headers(headers, options.use_column_num)
            .into_iter()
            .map(|mut field| {
                if let Some(mapped) = options.field_map.get(&field.name) {
                    field.field = mapped.clone();
                }
                field
            })
            .collect();
        let allow_fields = resolve_allow_fields(
            fields,
            &options.includes,
            &options.excludes,
        );

        if options.create_table {
            let mut field_lines: Vec<String> = allow_fields
                .iter()
                .map(|field| {
                    format!(
                        "{} TEXT NULL DEFAULT NULL COMMENT '{}'",
                        field.field,
                        sanitize(&field.name)
                    )
                })
                .collect();
            if options.with_create_time {
                field_lines.push(
                    "created_at TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP"
                        .to_string(),
                );
            }
            let create_sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (id int PRIMARY KEY \
                 AUTO_INCREMENT, {})",
                options.table,
                field_lines.join(",")
            );
            if let Err(err) = tx.borrow_mut().query_drop(create_sql.as_str())
            {
                return Err(TabulaError::Query(format!(
                    "create table {} failed: {}",
                    options.table, err
                )));
            }
        }

        let field_indexes = resolve_field_indexes(headers, &allow_fields);
        if field_indexes.is_empty() {
            return Err(TabulaError::Config(format!(
                "no field matched for {}, headers: {:?}",
                filepath, headers
            )));
        }

        let mut state = state.borrow_mut();
        state.template = insert_template(&options.table, &field_indexes);
        state.field_indexes = field_indexes;
        Ok(())
    };

    let mut data_cb = |filepath: &str,
                       id: &str,
                       row: &[String]|
     -> Result<(), TabulaError> {
        if state.borrow().abort.is_some() {
            return Ok(());
        }

        let args: Vec<mysql::Value> = state
            .borrow()
            .field_indexes
            .iter()
            .map(|(_, index)| match row.get(*index) {
                Some(cell) if !cell.trim().is_empty() => {
                    mysql::Value::Bytes(
                        cell.trim().to_string().into_bytes(),
                    )
                }
                _ => mysql::Value::NULL,
            })
            .collect();

        if args.iter().all(|arg| matches!(arg, mysql::Value::NULL)) {
            log::warn!("skip empty row {} in {}", id, filepath);
            return Ok(());
        }

        let template = state.borrow().template.clone();
        if let Err(err) = tx
            .borrow_mut()
            .exec_drop(template.as_str(), Params::Positional(args))
        {
            let mut state = state.borrow_mut();
            state.result.failed += 1;
            let message =
                format!("insert failed for row {}: {}", id, err);
            if transactional {
                state.abort = Some(message.clone());
            }
            return Err(TabulaError::Query(message));
        }

        let mut state = state.borrow_mut();
        state.result.success += 1;
        log::debug!("insert success for row {} in {}", id, filepath);
        Ok(())
    };

    walk_all(walkers, &mut header_cb, &mut data_cb)?;

    let state = state.into_inner();
    if let Some(message) = state.abort {
        return Err(TabulaError::Query(message));
    }
    Ok(state.result)
}
