//! CLI entry point for the VBZ delay pipeline.
//!
//! Provides subcommands for resolving the opendata.swiss catalog, downloading
//! the yearly raw exports, and aggregating them into per-year delay files.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use vbz_delays::aggregate;
use vbz_delays::catalog::{CkanClient, select_years};
use vbz_delays::config::PipelineConfig;
use vbz_delays::download::{OverwritePolicy, download_all};
use vbz_delays::fetch::BasicClient;

const DEFAULT_API: &str = "https://ckan.opendata.swiss/api/3/action/";

#[derive(Parser)]
#[command(name = "vbz_delays")]
#[command(about = "Download and aggregate VBZ Fahrzeiten delay data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the catalog and print the year -> resource URL map
    Resolve {
        /// CKAN action API root
        #[arg(long, default_value = DEFAULT_API)]
        api_base_url: String,

        /// Dataset title filter for package_search
        #[arg(short, long, default_value = "Fahrzeiten")]
        filter: String,
    },
    /// Download the raw exports for the selected years
    Download {
        /// CKAN action API root
        #[arg(long, default_value = DEFAULT_API)]
        api_base_url: String,

        /// Dataset title filter for package_search
        #[arg(short, long, default_value = "Fahrzeiten")]
        filter: String,

        /// Root directory to store one subdirectory per year
        #[arg(short, long, default_value = "data")]
        data_root: PathBuf,

        /// Years to download (all resolved years when omitted)
        #[arg(short, long, value_delimiter = ',')]
        years: Vec<String>,

        /// What to do when a year directory already exists
        #[arg(long, value_enum, default_value = "fail")]
        on_existing: OverwritePolicy,
    },
    /// Aggregate downloaded exports into per-year delay files
    Aggregate {
        /// Root directory holding the per-year raw data
        #[arg(short, long, default_value = "data")]
        data_root: PathBuf,

        /// Years to aggregate
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_values = ["2016", "2017", "2018", "2019", "2020", "2021", "2022"]
        )]
        years: Vec<String>,

        /// Substring a raw file name must contain to be aggregated
        #[arg(long, default_value = "Fahrzeiten_SOLL_IST")]
        file_filter: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vbz_delays.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vbz_delays.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            api_base_url,
            filter,
        } => {
            let catalog = CkanClient::new(&api_base_url)?;
            let url_map = catalog.resolve(&filter).await?;

            info!(years = url_map.len(), "Catalog resolved");
            for (year, resources) in &url_map {
                info!(
                    %year,
                    data = resources.data.len(),
                    metadata = resources.metadata.len(),
                    "Year resolved"
                );
                for url in resources.data.iter().chain(&resources.metadata) {
                    println!("{year}\t{url}");
                }
            }
        }
        Commands::Download {
            api_base_url,
            filter,
            data_root,
            years,
            on_existing,
        } => {
            let config = PipelineConfig {
                api_base_url,
                dataset_filter: filter,
                data_root,
                years,
                file_filter: None,
            };

            let catalog = CkanClient::new(&config.api_base_url)?;
            let mut url_map = catalog.resolve(&config.dataset_filter).await?;
            if !config.years.is_empty() {
                url_map = select_years(url_map, &config.years)?;
            }

            let client = BasicClient::new()?;
            let summary = download_all(&client, &url_map, &config.data_root, on_existing).await?;

            for url in &summary.failed_urls {
                warn!(%url, "Resource was not downloaded");
            }
            info!(
                saved = summary.saved,
                failed = summary.failed_urls.len(),
                skipped_years = ?summary.skipped_years,
                "Download complete"
            );
        }
        Commands::Aggregate {
            data_root,
            years,
            file_filter,
        } => {
            let config = PipelineConfig {
                api_base_url: DEFAULT_API.to_string(),
                dataset_filter: String::new(),
                data_root,
                years,
                file_filter: Some(file_filter),
            };

            for year in &config.years {
                let year_dir = config.year_dir(year);
                let output = config.aggregated_file(year);

                let summaries =
                    aggregate::aggregate_year(&year_dir, config.file_filter.as_deref(), &output)?;

                let kept: usize = summaries.iter().map(|s| s.kept).sum();
                let dropped: usize = summaries.iter().map(|s| s.dropped.total()).sum();
                info!(
                    %year,
                    files = summaries.len(),
                    kept,
                    dropped,
                    output = %output.display(),
                    "Year aggregated"
                );
            }
        }
    }

    Ok(())
}
