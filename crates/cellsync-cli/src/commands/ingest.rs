use anyhow::{Context, Result};
use cellsync::{TrafficTable, Vendor, Watermark};
use cellsync_archive::ArchiveExtractor;
use cellsync_warehouse::{IngestJob, IngestReport, Warehouse};
use chrono::NaiveDate;

use crate::commands::format::print_ingest_report;
use crate::config::{AppConfig, IngestEntry};

/// Run every configured ingest job, or only the one for `table`.
pub fn run(config: &AppConfig, warehouse: &mut Warehouse, table: Option<&str>) -> Result<Vec<IngestReport>> {
    let entries: Vec<&IngestEntry> = config
        .ingest
        .iter()
        .filter(|entry| table.is_none_or(|t| entry.table == t))
        .collect();

    if entries.is_empty() {
        anyhow::bail!("no ingest job configured for table {}", table.unwrap_or("<any>"));
    }

    let mut reports = Vec::with_capacity(entries.len());
    for entry in entries {
        let (job, extractor) = build_job(entry, config, warehouse)?;
        println!(
            "Loading {} from {} (after {})...",
            job.table,
            job.input_dir.display(),
            job.watermark.last_date()
        );

        let report = cellsync_warehouse::ingest(warehouse, &extractor, &job);
        print_ingest_report(&report);
        reports.push(report);
    }

    Ok(reports)
}

/// Resolve a configured entry into a job and its extractor.
///
/// Without an explicit `last_date` the watermark is the newest date already
/// in the table, or the earliest representable date for an empty table.
pub fn build_job(
    entry: &IngestEntry,
    config: &AppConfig,
    warehouse: &Warehouse,
) -> Result<(IngestJob, ArchiveExtractor)> {
    let table = TrafficTable::by_name(&entry.table)
        .with_context(|| format!("unknown traffic table {:?}", entry.table))?;

    let vendors = if entry.vendors.is_empty() {
        table.default_vendors()
    } else {
        entry.vendors.iter().map(Vendor::new).collect()
    };

    let last_date = match entry.last_date {
        Some(date) => date,
        None => warehouse
            .latest_date(&table)
            .with_context(|| format!("failed to read latest date of {table}"))?
            .unwrap_or(NaiveDate::MIN),
    };

    let extractor = entry
        .columns
        .iter()
        .fold(ArchiveExtractor::new(table.technology), |extractor, (vendor, mapping)| {
            extractor.with_mapping(Vendor::new(vendor), mapping.clone())
        });

    let job = IngestJob {
        table,
        input_dir: config.resolve(&entry.input_path),
        vendors,
        watermark: Watermark::new(last_date),
    };
    Ok((job, extractor))
}
