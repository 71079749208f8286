use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use cellsync_warehouse::Warehouse;

/// Bulk-copy a header-matched CSV file into `table`.
pub fn run(warehouse: &mut Warehouse, file: &Path, table: &str) -> Result<usize> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("failed to open {}", file.display()))?,
    );

    let rows = warehouse
        .copy_csv(table, reader)
        .with_context(|| format!("failed to load {} into {table}", file.display()))?;

    println!("Loaded {rows} rows from {} into {table}.", file.display());
    Ok(rows)
}
