//! Run configuration shared by the download and aggregate stages.

use std::path::PathBuf;

/// Everything a pipeline run needs to know. Populated from CLI arguments;
/// there are no process-wide globals or hard-coded paths.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// CKAN action API root, e.g. `https://ckan.opendata.swiss/api/3/action/`.
    pub api_base_url: String,
    /// Title filter for `package_search`.
    pub dataset_filter: String,
    /// Root directory holding one subdirectory per year.
    pub data_root: PathBuf,
    /// Years to download or aggregate. Empty means "all resolved years".
    pub years: Vec<String>,
    /// Substring a raw file name must contain to be aggregated.
    pub file_filter: Option<String>,
}

impl PipelineConfig {
    pub fn year_dir(&self, year: &str) -> PathBuf {
        self.data_root.join(year)
    }

    pub fn aggregated_file(&self, year: &str) -> PathBuf {
        self.data_root
            .join("aggregated_data")
            .join(format!("{year}_aggregated.csv"))
    }
}
