use std::fmt;
use std::path::{Path, PathBuf};

use cellsync::{TrafficTable, Vendor, Watermark, dedupe, filter};
use cellsync_archive::{ArchiveExtractor, ArchiveFormat};

use crate::warehouse::Warehouse;

/// One table's worth of vendor archives to load.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub table: TrafficTable,
    /// Holds one subdirectory per vendor.
    pub input_dir: PathBuf,
    pub vendors: Vec<Vendor>,
    pub watermark: Watermark,
}

/// Terminal state of one archive.
#[derive(Debug, Clone, PartialEq)]
pub enum FileState {
    Loaded { rows: usize },
    FailedExtract(String),
    FailedLoad(String),
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { rows } => write!(f, "loaded {rows} rows"),
            Self::FailedExtract(reason) => write!(f, "extract failed: {reason}"),
            Self::FailedLoad(reason) => write!(f, "load failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub vendor: Vendor,
    pub path: PathBuf,
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// Rows left after the watermark filter.
    pub rows_new: usize,
    /// Rows left after dedup, i.e. the batch handed to the loader.
    pub rows_deduped: usize,
    pub state: FileState,
}

impl FileOutcome {
    fn new(vendor: &Vendor, path: &Path) -> Self {
        Self {
            vendor: vendor.clone(),
            path: path.to_owned(),
            rows_read: 0,
            rows_dropped: 0,
            rows_new: 0,
            rows_deduped: 0,
            state: FileState::Loaded { rows: 0 },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, FileState::Loaded { .. })
    }
}

/// Per-file results of one ingest job.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub table: TrafficTable,
    pub files: Vec<FileOutcome>,
}

impl IngestReport {
    pub fn rows_loaded(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.state {
                FileState::Loaded { rows } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn loaded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.is_loaded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_loaded())
    }
}

/// Run extract, filter, dedupe and load over every archive of a job.
///
/// Failures are contained per file: each archive is committed in its own
/// transaction, and a failed extract or load is recorded in the report
/// before moving on to the next file.
pub fn ingest(warehouse: &mut Warehouse, extractor: &ArchiveExtractor, job: &IngestJob) -> IngestReport {
    let mut files = Vec::new();

    for vendor in &job.vendors {
        let vendor_dir = job.input_dir.join(vendor.as_str());
        let archives = match list_archives(&vendor_dir) {
            Ok(archives) => archives,
            Err(e) => {
                tracing::warn!(%vendor, dir = %vendor_dir.display(), error = %e, "skipping vendor, directory unreadable");
                continue;
            }
        };

        for path in archives {
            let outcome = ingest_file(warehouse, extractor, job, vendor, &path);
            match &outcome.state {
                FileState::Loaded { rows } => {
                    tracing::info!(table = job.table.name, %vendor, file = %path.display(), rows, "loaded");
                }
                state => {
                    tracing::warn!(table = job.table.name, %vendor, file = %path.display(), %state, "file failed");
                }
            }
            files.push(outcome);
        }
    }

    IngestReport {
        table: job.table,
        files,
    }
}

fn ingest_file(
    warehouse: &mut Warehouse,
    extractor: &ArchiveExtractor,
    job: &IngestJob,
    vendor: &Vendor,
    path: &Path,
) -> FileOutcome {
    let mut outcome = FileOutcome::new(vendor, path);

    let mut archive = match extractor.open(path, vendor) {
        Ok(archive) => archive,
        Err(e) => {
            outcome.state = FileState::FailedExtract(e.to_string());
            return outcome;
        }
    };
    let mut stream = match archive.records() {
        Ok(stream) => stream,
        Err(e) => {
            outcome.state = FileState::FailedExtract(e.to_string());
            return outcome;
        }
    };

    let fresh: Vec<_> = filter(stream.by_ref(), job.watermark).collect();
    let stats = stream.stats().clone();
    outcome.rows_read = stats.rows_read;
    outcome.rows_dropped = stats.rows_dropped;
    outcome.rows_new = fresh.len();

    tracing::info!(
        file = %path.display(),
        rows_read = stats.rows_read,
        rows_kept = stats.rows_kept(),
        rows_new = fresh.len(),
        "extracted"
    );

    if let Some(error) = stats.read_error {
        outcome.state = FileState::FailedExtract(error);
        return outcome;
    }

    let batch = dedupe(fresh);
    outcome.rows_deduped = batch.len();

    outcome.state = match warehouse.insert_batch(&job.table, &batch) {
        Ok(rows) => FileState::Loaded { rows },
        Err(e) => FileState::FailedLoad(e.to_string()),
    };
    outcome
}

/// Archive files directly under `dir`, sorted by file name.
fn list_archives(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && ArchiveFormat::from_path(&path).is_some() {
            archives.push(path);
        } else {
            tracing::debug!(path = %path.display(), "ignoring non-archive entry");
        }
    }
    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(archives)
}
