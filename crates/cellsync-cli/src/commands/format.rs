use cellsync::{SyncReport, TargetStatus};
use cellsync_warehouse::{FileState, IngestReport};

/// Longest file name shown before truncation.
const MAX_NAME_WIDTH: usize = 40;

pub fn print_sync_report(report: &SyncReport) {
    print!("{}", sync_summary(report));
}

pub fn print_ingest_report(report: &IngestReport) {
    print!("{}", ingest_summary(report));
}

pub fn sync_summary(report: &SyncReport) -> String {
    let mut out = String::new();

    for target in &report.targets {
        out.push_str(&format!("{} ({})\n", target.local_path.display(), target.mode));

        if let TargetStatus::SubfolderNotFound(name) = &target.status {
            out.push_str(&format!("  skipped: subfolder {name:?} not found\n"));
            continue;
        }

        if let Some(pruned) = &target.pruned {
            out.push_str(&format!("  pruned {pruned} for re-fetch\n"));
        }

        for file in &target.files {
            out.push_str(&format!(
                "  {:<width$}  {}\n",
                truncate(&file.file_name, MAX_NAME_WIDTH),
                file.state,
                width = MAX_NAME_WIDTH
            ));
        }
        out.push_str(&format!(
            "  {} downloaded, {} skipped\n",
            target.downloaded(),
            target.skipped()
        ));
    }

    out.push_str(&format!(
        "\n{} files downloaded across {} targets ({} targets skipped)\n",
        report.downloaded(),
        report.targets.len(),
        report.skipped_targets()
    ));
    out
}

pub fn ingest_summary(report: &IngestReport) -> String {
    let mut out = format!("{}\n", report.table);

    for file in &report.files {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let detail = match &file.state {
            FileState::Loaded { .. } => format!(
                "{state} (read {}, dropped {}, new {}, unique {})",
                file.rows_read,
                file.rows_dropped,
                file.rows_new,
                file.rows_deduped,
                state = file.state
            ),
            _ => file.state.to_string(),
        };

        out.push_str(&format!(
            "  {:<8} {:<width$}  {detail}\n",
            file.vendor.as_str(),
            truncate(&name, MAX_NAME_WIDTH),
            width = MAX_NAME_WIDTH
        ));
    }

    let failed = report.failed().count();
    out.push_str(&format!(
        "  {} rows loaded from {} files",
        report.rows_loaded(),
        report.files.len()
    ));
    if failed > 0 {
        out.push_str(&format!(" ({failed} failed)"));
    }
    out.push('\n');
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
