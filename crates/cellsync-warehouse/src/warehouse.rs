use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use cellsync::{LoadBatch, NormalizedRecord, TrafficTable};
use chrono::NaiveDate;
use rusqlite::types::Value;

use crate::schema;

/// Rows per multi-row INSERT statement.
const INSERT_CHUNK_ROWS: usize = 150;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A SQLite-backed warehouse holding the traffic and change-event tables.
pub struct Warehouse {
    conn: rusqlite::Connection,
}

impl Warehouse {
    /// Open a warehouse backed by a file on disk, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut warehouse = Self { conn };
        warehouse.migrate()?;
        Ok(warehouse)
    }

    /// Open an in-memory warehouse (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut warehouse = Self { conn };
        warehouse.migrate()?;
        Ok(warehouse)
    }

    fn migrate(&mut self) -> Result<(), StoreError> {
        schema::migrations()
            .to_latest(&mut self.conn)
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    /// Raw connection, for ad-hoc queries and test fixtures.
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Append a deduplicated batch to `table` in a single transaction.
    ///
    /// Either every row is committed or none is.
    pub fn insert_batch(&mut self, table: &TrafficTable, batch: &LoadBatch) -> Result<usize, LoadError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let columns = table.columns();
        let tx = self.conn.transaction().map_err(database)?;

        for chunk in batch.records().chunks(INSERT_CHUNK_ROWS) {
            let sql = insert_statement(table.name, &columns[..], chunk.len());
            let values = chunk.iter().flat_map(record_values);
            tx.execute(&sql, rusqlite::params_from_iter(values))
                .map_err(database)?;
        }

        tx.commit().map_err(database)?;

        tracing::debug!(table = table.name, rows = batch.len(), "inserted batch");
        Ok(batch.len())
    }

    /// Bulk-load a delimited file whose header names the target columns.
    ///
    /// The header must name every column of `table` exactly once, in any
    /// order. Empty fields load as NULL. The load runs in one transaction.
    pub fn copy_csv<R: Read>(&mut self, table: &str, source: R) -> Result<usize, LoadError> {
        if !is_identifier(table) {
            return Err(LoadError::InvalidTableName(table.to_owned()));
        }

        let table_columns = self.table_columns(table)?;
        if table_columns.is_empty() {
            return Err(LoadError::UnknownTable(table.to_owned()));
        }

        let mut reader = csv::ReaderBuilder::new().from_reader(source);
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| LoadError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
            .collect();

        check_header(table, &table_columns, &header)?;

        // Dates are stored as text, so MAX(date) only orders correctly in ISO form.
        let date_column = header.iter().position(|h| h == "date");

        let sql = insert_statement(table, header.as_slice(), 1);
        let tx = self.conn.transaction().map_err(database)?;
        let mut rows = 0usize;
        {
            let mut stmt = tx.prepare(&sql).map_err(database)?;
            for row in reader.records() {
                let row = row.map_err(|e| LoadError::Csv(e.to_string()))?;
                if let Some(value) = date_column.and_then(|idx| row.get(idx)) {
                    if NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() {
                        return Err(LoadError::InvalidDate {
                            table: table.to_owned(),
                            row: rows + 1,
                            value: value.to_owned(),
                        });
                    }
                }
                let values = row.iter().map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else {
                        Value::Text(field.to_owned())
                    }
                });
                stmt.execute(rusqlite::params_from_iter(values))
                    .map_err(database)?;
                rows += 1;
            }
        }
        tx.commit().map_err(database)?;

        tracing::info!(table, rows, "copied delimited file");
        Ok(rows)
    }

    /// Column names of `table` in declaration order; empty if it does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, LoadError> {
        if !is_identifier(table) {
            return Err(LoadError::InvalidTableName(table.to_owned()));
        }

        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .map_err(database)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(database)?;
        Ok(columns)
    }

    /// Most recent date present in a traffic table, if any rows exist.
    ///
    /// Usable as the watermark for the next run.
    pub fn latest_date(&self, table: &TrafficTable) -> Result<Option<NaiveDate>, StoreError> {
        let latest: Option<String> = self
            .conn
            .query_row(&format!("SELECT MAX(date) FROM {}", table.name), [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        latest
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map_err(|e| StoreError::Database(format!("bad date {raw:?} in {table}: {e}")))
            })
            .transpose()
    }

    pub fn row_count(&self, table: &str) -> Result<usize, LoadError> {
        if !is_identifier(table) {
            return Err(LoadError::InvalidTableName(table.to_owned()));
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(database)?;
        Ok(count.max(0) as usize)
    }
}

fn record_values(record: &NormalizedRecord) -> [Value; 5] {
    [
        Value::Text(record.date.format(DATE_FORMAT).to_string()),
        Value::Text(record.aggregation_id.clone()),
        Value::Text(record.cell_id.clone()),
        record.traffic_value.map(Value::Real).unwrap_or(Value::Null),
        Value::Text(record.vendor.as_str().to_owned()),
    ]
}

/// `INSERT INTO t (a, b) VALUES (?, ?), (?, ?), ...` for `rows` rows.
fn insert_statement<S: AsRef<str>>(table: &str, columns: &[S], rows: usize) -> String {
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    let placeholders = format!("({})", vec!["?"; names.len()].join(", "));
    let tuples = vec![placeholders.as_str(); rows].join(", ");

    format!(
        "INSERT INTO {table} (\"{}\") VALUES {tuples}",
        names.join("\", \"")
    )
}

fn check_header(table: &str, table_columns: &[String], header: &[String]) -> Result<(), LoadError> {
    let expected: BTreeSet<&str> = table_columns.iter().map(String::as_str).collect();
    let mut found = BTreeSet::new();
    let mut duplicated = Vec::new();
    for name in header {
        if !found.insert(name.as_str()) {
            duplicated.push(name.clone());
        }
    }

    let missing: Vec<String> = expected.difference(&found).map(|s| (*s).to_owned()).collect();
    let mut unexpected: Vec<String> = found.difference(&expected).map(|s| (*s).to_owned()).collect();
    unexpected.extend(duplicated);

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(LoadError::HeaderMismatch {
            table: table.to_owned(),
            missing,
            unexpected,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn database(err: rusqlite::Error) -> LoadError {
    LoadError::Database(err.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),
}

/// A failed load. Nothing from the failing call was committed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("no such table: {0}")]
    UnknownTable(String),

    #[error("header does not match {table}: missing {missing:?}, unexpected {unexpected:?}")]
    HeaderMismatch {
        table: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("malformed delimited input: {0}")]
    Csv(String),

    #[error("row {row} of {table}: date {value:?} is not YYYY-MM-DD")]
    InvalidDate {
        table: String,
        row: usize,
        value: String,
    },

    #[error("database error: {0}")]
    Database(String),
}
