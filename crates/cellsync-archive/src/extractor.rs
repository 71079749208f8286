use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use cellsync::{ColumnMapping, NormalizedRecord, Technology, Vendor};
use flate2::read::GzDecoder;

use crate::format::ArchiveFormat;
use crate::parse::{parse_date, parse_traffic};

/// Errors that make an archive unusable. Recoverable at file granularity.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("corrupt archive {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("archive {0} has no payload entry")]
    EmptyArchive(PathBuf),

    #[error("archive {path} has {count} payload entries, expected exactly one")]
    MultipleEntries { path: PathBuf, count: usize },

    #[error("payload in {path} has no column {column:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("failed to read CSV header in {path}: {message}")]
    Header { path: PathBuf, message: String },
}

/// Opens vendor archives and maps their payload onto [`NormalizedRecord`].
pub struct ArchiveExtractor {
    default_mapping: ColumnMapping,
    overrides: HashMap<Vendor, ColumnMapping>,
}

impl ArchiveExtractor {
    pub fn new(technology: Technology) -> Self {
        Self {
            default_mapping: ColumnMapping::for_technology(technology),
            overrides: HashMap::new(),
        }
    }

    /// Use a different column layout for one vendor.
    pub fn with_mapping(mut self, vendor: Vendor, mapping: ColumnMapping) -> Self {
        self.overrides.insert(vendor, mapping);
        self
    }

    pub fn mapping_for(&self, vendor: &Vendor) -> &ColumnMapping {
        self.overrides.get(vendor).unwrap_or(&self.default_mapping)
    }

    /// Open an archive and check that it holds exactly one payload entry.
    ///
    /// Entry order inside an archive is not guaranteed, so an archive with
    /// several entries is rejected rather than read from an arbitrary one.
    /// Call [`OpenArchive::records`] to stream the payload.
    pub fn open(&self, path: &Path, vendor: &Vendor) -> Result<OpenArchive, ExtractError> {
        let format = ArchiveFormat::from_path(path)
            .ok_or_else(|| ExtractError::UnsupportedFormat(path.to_owned()))?;

        let (payload, entry_name) = match format {
            ArchiveFormat::Zip => open_zip(path)?,
            ArchiveFormat::Tar | ArchiveFormat::TarGz => open_tar(path, format)?,
        };

        tracing::debug!(archive = %path.display(), entry = %entry_name, %vendor, "opened archive");

        Ok(OpenArchive {
            path: path.to_owned(),
            vendor: vendor.clone(),
            mapping: self.mapping_for(vendor).clone(),
            entry_name,
            payload,
        })
    }
}

enum Payload {
    Zip {
        archive: zip::ZipArchive<File>,
        entry: String,
    },
    Tar(tar::Archive<Box<dyn Read>>),
}

/// An archive whose single payload entry has been located.
pub struct OpenArchive {
    path: PathBuf,
    vendor: Vendor,
    mapping: ColumnMapping,
    entry_name: String,
    payload: Payload,
}

impl OpenArchive {
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Lazily stream the payload as normalized records.
    ///
    /// Tar payloads are read sequentially, so a second call on the same
    /// archive fails.
    pub fn records(&mut self) -> Result<RecordStream<'_>, ExtractError> {
        let path = self.path.clone();
        let reader: Box<dyn Read + '_> = match &mut self.payload {
            Payload::Zip { archive, entry } => {
                let file = archive
                    .by_name(entry)
                    .map_err(|e| corrupt(&path, e))?;
                Box::new(file)
            }
            Payload::Tar(archive) => first_tar_file(archive, &path)?,
        };

        RecordStream::new(reader, path, &self.mapping, self.vendor.clone())
    }
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> ExtractError {
    ExtractError::Corrupt {
        path: path.to_owned(),
        message: err.to_string(),
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_owned(),
        message: err.to_string(),
    }
}

fn single_entry(path: &Path, mut names: Vec<String>) -> Result<String, ExtractError> {
    match names.len() {
        0 => Err(ExtractError::EmptyArchive(path.to_owned())),
        1 => Ok(names.remove(0)),
        count => Err(ExtractError::MultipleEntries {
            path: path.to_owned(),
            count,
        }),
    }
}

fn open_zip(path: &Path) -> Result<(Payload, String), ExtractError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let archive = zip::ZipArchive::new(file).map_err(|e| corrupt(path, e))?;

    // Directory entries carry no data.
    let names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_owned)
        .collect();
    let entry = single_entry(path, names)?;

    Ok((
        Payload::Zip {
            archive,
            entry: entry.clone(),
        },
        entry,
    ))
}

fn tar_reader(path: &Path, format: ArchiveFormat) -> Result<Box<dyn Read>, ExtractError> {
    let file = BufReader::new(File::open(path).map_err(|e| io_error(path, e))?);
    Ok(match format {
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    })
}

fn open_tar(path: &Path, format: ArchiveFormat) -> Result<(Payload, String), ExtractError> {
    // A tar stream can only be walked once: count entries on one pass and
    // keep a fresh reader for the payload.
    let mut scan = tar::Archive::new(tar_reader(path, format)?);
    let mut names = Vec::new();
    for entry in scan.entries().map_err(|e| corrupt(path, e))? {
        let entry = entry.map_err(|e| corrupt(path, e))?;
        if entry.header().entry_type().is_file() {
            let name = entry
                .path()
                .map_err(|e| corrupt(path, e))?
                .to_string_lossy()
                .into_owned();
            names.push(name);
        }
    }
    let entry = single_entry(path, names)?;

    Ok((Payload::Tar(tar::Archive::new(tar_reader(path, format)?)), entry))
}

fn first_tar_file<'a>(
    archive: &'a mut tar::Archive<Box<dyn Read>>,
    path: &Path,
) -> Result<Box<dyn Read + 'a>, ExtractError> {
    for entry in archive.entries().map_err(|e| corrupt(path, e))? {
        let entry = entry.map_err(|e| corrupt(path, e))?;
        if entry.header().entry_type().is_file() {
            return Ok(Box::new(entry));
        }
    }
    Err(ExtractError::EmptyArchive(path.to_owned()))
}

/// Row counters for one payload, available once the stream is drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub rows_read: usize,
    /// Rows without a parseable date, or malformed CSV rows.
    pub rows_dropped: usize,
    /// Set when the payload could not be read to the end.
    pub read_error: Option<String>,
}

impl RecordStats {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.rows_dropped
    }
}

struct ColumnIndexes {
    date: usize,
    aggregation: usize,
    cell: usize,
    traffic: usize,
}

/// Finite, single-pass stream of normalized records from one payload.
pub struct RecordStream<'a> {
    rows: csv::StringRecordsIntoIter<Box<dyn Read + 'a>>,
    columns: ColumnIndexes,
    vendor: Vendor,
    stats: RecordStats,
    finished: bool,
}

impl<'a> RecordStream<'a> {
    fn new(
        reader: Box<dyn Read + 'a>,
        path: PathBuf,
        mapping: &ColumnMapping,
        vendor: Vendor,
    ) -> Result<Self, ExtractError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| ExtractError::Header {
                path: path.clone(),
                message: e.to_string(),
            })?
            .iter()
            .map(clean_header)
            .collect();

        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ExtractError::MissingColumn {
                    path: path.clone(),
                    column: column.to_owned(),
                })
        };

        let columns = ColumnIndexes {
            date: find(&mapping.date)?,
            aggregation: find(&mapping.aggregation)?,
            cell: find(&mapping.cell)?,
            traffic: find(&mapping.traffic)?,
        };

        Ok(Self {
            rows: csv_reader.into_records(),
            columns,
            vendor,
            stats: RecordStats::default(),
            finished: false,
        })
    }

    pub fn stats(&self) -> &RecordStats {
        &self.stats
    }

    fn normalize(&self, row: &csv::StringRecord) -> Option<NormalizedRecord> {
        let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or_default();

        let date = parse_date(field(self.columns.date))?;

        Some(NormalizedRecord {
            date,
            cell_id: field(self.columns.cell).to_owned(),
            aggregation_id: field(self.columns.aggregation).to_owned(),
            traffic_value: parse_traffic(field(self.columns.traffic)),
            vendor: self.vendor.clone(),
        })
    }
}

impl Iterator for RecordStream<'_> {
    type Item = NormalizedRecord;

    fn next(&mut self) -> Option<NormalizedRecord> {
        while !self.finished {
            let Some(row) = self.rows.next() else {
                self.finished = true;
                break;
            };
            self.stats.rows_read += 1;

            match row {
                Ok(row) => match self.normalize(&row) {
                    Some(record) => return Some(record),
                    None => self.stats.rows_dropped += 1,
                },
                Err(e) if e.is_io_error() => {
                    self.stats.rows_read -= 1;
                    self.stats.read_error = Some(e.to_string());
                    self.finished = true;
                }
                Err(_) => self.stats.rows_dropped += 1,
            }
        }
        None
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .to_owned()
}
