//! Year-level aggregation of raw Fahrzeiten exports into one delay CSV.
//!
//! Each year directory holds the raw weekly exports downloaded earlier. The
//! aggregation pass filters every matching file down to regular tram service,
//! derives the delay column, and appends the projection to the per-year
//! output file. Re-running appends duplicate rows; there is no deduplication.

pub mod filter;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::output::append_records;
use types::DropCounts;

/// Aggregation result for one input file.
#[derive(Debug)]
pub struct FileSummary {
    pub file: PathBuf,
    pub kept: usize,
    pub dropped: DropCounts,
}

/// Lists regular files directly under `year_dir` whose name contains
/// `filter`, sorted by name. No filter keeps every file.
pub fn files_in_year(year_dir: &Path, filter: Option<&str>) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(year_dir)
        .with_context(|| format!("Failed to list {}", year_dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if filter.is_none_or(|f| name.contains(f)) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Reads one raw export, filters it, and appends the qualifying rows to
/// `output`. Rows that do not deserialize are counted as malformed and
/// skipped, not errored.
pub fn aggregate_file(file: &Path, output: &Path) -> Result<FileSummary> {
    let mut reader =
        csv::Reader::from_path(file).with_context(|| format!("Failed to open {}", file.display()))?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;

    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(file = %file.display(), error = %e, "Skipping unparseable row");
                malformed += 1;
            }
        }
    }

    let mut outcome = filter::filter_records(rows);
    outcome.dropped.malformed = malformed;

    append_records(output, &outcome.kept)?;

    Ok(FileSummary {
        file: file.to_path_buf(),
        kept: outcome.kept.len(),
        dropped: outcome.dropped,
    })
}

/// Aggregates every matching file of one year into `output`, in name order.
pub fn aggregate_year(
    year_dir: &Path,
    name_filter: Option<&str>,
    output: &Path,
) -> Result<Vec<FileSummary>> {
    let files = files_in_year(year_dir, name_filter)?;

    let mut summaries = Vec::with_capacity(files.len());
    for file in &files {
        let summary = aggregate_file(file, output)?;
        info!(
            file = %file.display(),
            kept = summary.kept,
            dropped = summary.dropped.total(),
            "File aggregated"
        );
        summaries.push(summary);
    }

    Ok(summaries)
}
