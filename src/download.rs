//! Bulk download of resolved resource URLs into per-year directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tracing::{error, info, warn};

use crate::catalog::YearResources;
use crate::fetch::{HttpClient, fetch_bytes};

/// What to do when a year directory is already present from an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverwritePolicy {
    /// Abort the whole run. The default; protects partial state.
    Fail,
    /// Leave the existing directory alone and continue with the next year.
    Skip,
    /// Download into the existing directory, replacing same-named files.
    Overwrite,
}

/// Outcome of one download run. Failed URLs are collected rather than
/// aborting the batch; the caller decides what to report.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub saved: usize,
    pub skipped_years: Vec<String>,
    pub failed_urls: Vec<String>,
}

/// Downloads every resource of every year in `url_map` into
/// `destination_root/{year}/`, data bucket first, then metadata.
pub async fn download_all<C: HttpClient>(
    client: &C,
    url_map: &BTreeMap<String, YearResources>,
    destination_root: &Path,
    policy: OverwritePolicy,
) -> Result<DownloadSummary> {
    let mut summary = DownloadSummary::default();

    for (year, resources) in url_map {
        let year_dir = destination_root.join(year);

        if year_dir.exists() {
            match policy {
                OverwritePolicy::Fail => bail!(
                    "download directory {} already exists; remove it or pass --on-existing skip",
                    year_dir.display()
                ),
                OverwritePolicy::Skip => {
                    info!(%year, "Year directory already exists, skipping");
                    summary.skipped_years.push(year.clone());
                    continue;
                }
                OverwritePolicy::Overwrite => {
                    warn!(%year, "Year directory already exists, overwriting files");
                }
            }
        } else {
            fs::create_dir_all(&year_dir)
                .with_context(|| format!("Failed to create {}", year_dir.display()))?;
        }

        for url in resources.data.iter().chain(&resources.metadata) {
            match download_one(client, url, &year_dir).await {
                Ok(path) => {
                    summary.saved += 1;
                    info!(%url, path = %path.display(), "Resource saved");
                }
                Err(e) => {
                    error!(%url, error = %e, "Resource download failed");
                    summary.failed_urls.push(url.clone());
                }
            }
        }
    }

    Ok(summary)
}

/// Fetches one URL, retrying once, and writes the body verbatim under `dir`.
async fn download_one<C: HttpClient>(client: &C, url: &str, dir: &Path) -> Result<PathBuf> {
    let bytes = match fetch_bytes(client, url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url, error = %e, "Fetch failed, retrying once");
            fetch_bytes(client, url).await?
        }
    };

    let file_name =
        file_name_from_url(url).with_context(|| format!("URL {} has no usable file name", url))?;
    let path = dir.join(file_name);

    fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Last path segment of the URL, with any query string or fragment stripped.
fn file_name_from_url(url: &str) -> Option<&str> {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let name = trimmed.rsplit('/').next()?;
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://data.example/2022/Fahrzeiten_SOLL_IST_20220101.csv"),
            Some("Fahrzeiten_SOLL_IST_20220101.csv")
        );
        assert_eq!(
            file_name_from_url("https://data.example/Haltestelle_2022.csv?token=abc"),
            Some("Haltestelle_2022.csv")
        );
        assert_eq!(file_name_from_url("https://data.example/dir/"), None);
    }
}
