use std::fmt;
use std::path::PathBuf;

use crate::target::SyncMode;

/// What the sync engine decided for a single remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncState {
    Downloaded,
    SkippedExcluded,
    SkippedUnsupportedType,
    SkippedAlreadyLocal,
    /// Remote title is not a plain file name and was never written to disk.
    SkippedInvalidName,
}

impl fmt::Display for FileSyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded => write!(f, "downloaded"),
            Self::SkippedExcluded => write!(f, "skipped (explicitly excluded)"),
            Self::SkippedUnsupportedType => write!(f, "skipped (unsupported file type)"),
            Self::SkippedAlreadyLocal => write!(f, "skipped (already local)"),
            Self::SkippedInvalidName => write!(f, "skipped (invalid file name)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSyncOutcome {
    pub file_name: String,
    pub state: FileSyncState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Synced,
    /// The named subfolder was not among the root folder's children.
    SubfolderNotFound(String),
}

/// Result of syncing one target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub local_path: PathBuf,
    pub mode: SyncMode,
    pub status: TargetStatus,
    /// Local file removed by the delta freshness rule before listing.
    pub pruned: Option<String>,
    pub files: Vec<FileSyncOutcome>,
}

impl TargetOutcome {
    pub fn count(&self, state: FileSyncState) -> usize {
        self.files.iter().filter(|f| f.state == state).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(FileSyncState::Downloaded)
    }

    pub fn skipped(&self) -> usize {
        self.files.len() - self.downloaded()
    }
}

/// Summary of a sync run, one entry per target in configuration order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub targets: Vec<TargetOutcome>,
}

impl SyncReport {
    pub fn downloaded(&self) -> usize {
        self.targets.iter().map(TargetOutcome::downloaded).sum()
    }

    pub fn skipped_targets(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.status, TargetStatus::SubfolderNotFound(_)))
            .count()
    }
}
