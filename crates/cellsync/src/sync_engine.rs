use std::path::{Path, PathBuf};

use crate::remote::{RemoteError, RemoteFile, RemoteStore};
use crate::report::{FileSyncOutcome, FileSyncState, SyncReport, TargetOutcome, TargetStatus};
use crate::target::{ConfigError, SyncMode, SyncTarget, SyncTargetConfig};

/// Errors that abort a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl SyncError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            message: err.to_string(),
        }
    }
}

/// Mirrors remote folders into local staging directories.
pub struct RemoteSyncEngine {
    root: PathBuf,
}

impl RemoteSyncEngine {
    /// `root` is the directory relative target paths resolve against.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sync every target in order.
    ///
    /// All targets are validated before any I/O, so a bad mode anywhere in
    /// the list fails the run without touching disk or network. A missing
    /// subfolder only skips its own target; remote and filesystem failures
    /// abort the run.
    pub async fn sync(
        &self,
        remote: &dyn RemoteStore,
        targets: &[SyncTargetConfig],
    ) -> Result<SyncReport, SyncError> {
        let targets = targets
            .iter()
            .map(|config| SyncTarget::from_config(config, &self.root))
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = SyncReport::default();
        for target in &targets {
            report.targets.push(self.sync_target(remote, target).await?);
        }

        tracing::info!(
            remote = remote.label(),
            targets = report.targets.len(),
            downloaded = report.downloaded(),
            "sync finished"
        );
        Ok(report)
    }

    pub async fn sync_target(
        &self,
        remote: &dyn RemoteStore,
        target: &SyncTarget,
    ) -> Result<TargetOutcome, SyncError> {
        let dir = &target.local_path;
        std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

        let mut outcome = TargetOutcome {
            local_path: dir.clone(),
            mode: target.mode,
            status: TargetStatus::Synced,
            pruned: None,
            files: Vec::new(),
        };

        let folder_id = match &target.subfolder_name {
            Some(name) => match find_subfolder(remote, &target.remote_folder_id, name).await? {
                Some(folder) => folder.id,
                None => {
                    tracing::warn!(
                        subfolder = %name,
                        parent = %target.remote_folder_id,
                        "subfolder not found, skipping target"
                    );
                    outcome.status = TargetStatus::SubfolderNotFound(name.clone());
                    return Ok(outcome);
                }
            },
            None => target.remote_folder_id.clone(),
        };

        tracing::info!(
            local = %dir.display(),
            folder = %folder_id,
            mode = %target.mode,
            "syncing target"
        );

        if target.mode == SyncMode::Delta {
            outcome.pruned = prune_latest_local(dir)?;
        }

        for file in remote.list_children(&folder_id).await? {
            let state = decide(target, &file);
            if state == FileSyncState::Downloaded {
                let destination = dir.join(&file.title);
                tracing::info!(file = %file.title, "downloading");
                remote.download(&file.id, &destination).await?;
            } else {
                tracing::debug!(file = %file.title, %state, "not downloading");
            }

            outcome.files.push(FileSyncOutcome {
                file_name: file.title,
                state,
            });
        }

        tracing::info!(
            local = %dir.display(),
            downloaded = outcome.downloaded(),
            skipped = outcome.skipped(),
            "target done"
        );
        Ok(outcome)
    }
}

/// Classify a remote file against the target's policy. Downloads nothing.
fn decide(target: &SyncTarget, file: &RemoteFile) -> FileSyncState {
    if target.is_excluded(&file.title) {
        return FileSyncState::SkippedExcluded;
    }

    if file.is_folder || !target.has_allowed_extension(&file.title) {
        return FileSyncState::SkippedUnsupportedType;
    }

    if !is_plain_file_name(&file.title) {
        return FileSyncState::SkippedInvalidName;
    }

    if target.mode == SyncMode::Delta && target.local_path.join(&file.title).exists() {
        return FileSyncState::SkippedAlreadyLocal;
    }

    FileSyncState::Downloaded
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

async fn find_subfolder(
    remote: &dyn RemoteStore,
    parent_id: &str,
    name: &str,
) -> Result<Option<RemoteFile>, RemoteError> {
    let children = remote.list_children(parent_id).await?;
    Ok(children
        .into_iter()
        .find(|child| child.is_folder && child.title == name))
}

/// Delete the local file whose name sorts last.
///
/// The most recently acquired export may have been cut short by the previous
/// run, so it is always fetched again. Returns the removed name, if any.
fn prune_latest_local(dir: &Path) -> Result<Option<String>, SyncError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| SyncError::io(&entry.path(), e))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    names.sort();
    let Some(latest) = names.pop() else {
        return Ok(None);
    };

    let path = dir.join(&latest);
    std::fs::remove_file(&path).map_err(|e| SyncError::io(&path, e))?;
    tracing::info!(file = %latest, "removed latest local file for re-fetch");
    Ok(Some(latest))
}
