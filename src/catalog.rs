//! Client for the opendata.swiss CKAN catalog.
//!
//! Resolves the yearly Fahrzeiten datasets via `package_search` and splits
//! each dataset's downloadable resources into data and stop-metadata buckets.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::debug;

/// Download URLs for one dataset year, split by resource kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct YearResources {
    /// Raw vehicle timing exports.
    pub data: Vec<String>,
    /// Stop and station reference exports (Haltepunkt / Haltestelle).
    pub metadata: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    success: bool,
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    results: Vec<Dataset>,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    name: String,
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    download_url: Option<String>,
}

pub struct CkanClient {
    base_url: String,
    client: reqwest::Client,
}

impl CkanClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Resolves every year-named dataset whose title matches `filter` into
    /// its resource buckets, keyed and ordered by ascending year.
    pub async fn resolve(&self, filter: &str) -> Result<BTreeMap<String, YearResources>> {
        let response = self.package_search(filter).await?;
        resolve_years(&response.result.results)
    }

    async fn package_search(&self, filter: &str) -> Result<SearchResponse> {
        let url = format!("{}package_search?q=title:{}", self.base_url, filter);
        debug!(%url, "Querying catalog");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send catalog request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Catalog returned status {}: {}", status, body);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            bail!("Catalog response is empty");
        }

        let decoded: SearchResponse =
            serde_json::from_str(&body).context("Failed to decode catalog JSON")?;

        if !decoded.success {
            bail!("Catalog did not return a successful response");
        }

        Ok(decoded)
    }
}

/// Restricts a resolved map to the requested years. A year missing from the
/// catalog is a configuration error, not a silent skip.
pub fn select_years(
    map: BTreeMap<String, YearResources>,
    years: &[String],
) -> Result<BTreeMap<String, YearResources>> {
    let mut selected = BTreeMap::new();
    for year in years {
        let resources = map
            .get(year)
            .cloned()
            .ok_or_else(|| anyhow!("year {} not found in catalog", year))?;
        selected.insert(year.clone(), resources);
    }
    Ok(selected)
}

fn resolve_years(datasets: &[Dataset]) -> Result<BTreeMap<String, YearResources>> {
    let mut years = BTreeMap::new();

    for dataset in datasets {
        let year = extract_year(&dataset.name).with_context(|| {
            format!("dataset name '{}' contains no four-digit year", dataset.name)
        })?;

        let matched = datasets
            .iter()
            .find(|d| d.name.contains(&year))
            .ok_or_else(|| anyhow!("year {} not found in catalog", year))?;

        years.insert(year, classify_resources(matched));
    }

    Ok(years)
}

/// Stop reference files are routed to `metadata`, everything else is raw
/// timing data. Resources without a download URL are dropped.
fn classify_resources(dataset: &Dataset) -> YearResources {
    let mut buckets = YearResources::default();

    for resource in &dataset.resources {
        let Some(url) = &resource.download_url else {
            debug!(dataset = %dataset.name, "Resource without download URL, skipping");
            continue;
        };

        if url.contains("Haltepunkt") || url.contains("Haltestelle") {
            buckets.metadata.push(url.clone());
        } else {
            buckets.data.push(url.clone());
        }
    }

    buckets
}

/// First run of four consecutive ASCII digits in `name`, if any.
fn extract_year(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut run = 0;

    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return Some(name[i - 3..=i].to_string());
            }
        } else {
            run = 0;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(name: &str, urls: &[&str]) -> Dataset {
        Dataset {
            name: name.to_string(),
            resources: urls
                .iter()
                .map(|u| Resource {
                    download_url: Some(u.to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("fahrzeiten-der-vbz-im-soll-ist-vergleich-2022"), Some("2022".to_string()));
        assert_eq!(extract_year("2016-fahrzeiten"), Some("2016".to_string()));
        assert_eq!(extract_year("fahrzeiten-ohne-jahr"), None);
        // Only the first four digits of a longer run count
        assert_eq!(extract_year("export-20221"), Some("2022".to_string()));
    }

    #[test]
    fn test_classify_resources_routes_stop_files_to_metadata() {
        let d = dataset(
            "fahrzeiten-2022",
            &[
                "https://data.example/Fahrzeiten_SOLL_IST_20220101.csv",
                "https://data.example/Haltestelle_2022.csv",
                "https://data.example/Haltepunkt_2022.csv",
            ],
        );

        let buckets = classify_resources(&d);

        assert_eq!(buckets.data, vec!["https://data.example/Fahrzeiten_SOLL_IST_20220101.csv"]);
        assert_eq!(buckets.metadata.len(), 2);
    }

    #[test]
    fn test_classify_resources_skips_missing_url() {
        let d = Dataset {
            name: "fahrzeiten-2022".to_string(),
            resources: vec![Resource { download_url: None }],
        };

        let buckets = classify_resources(&d);
        assert!(buckets.data.is_empty());
        assert!(buckets.metadata.is_empty());
    }

    #[test]
    fn test_resolve_years_sorted_ascending() {
        let datasets = vec![
            dataset("fahrzeiten-2018", &["https://data.example/f_2018.csv"]),
            dataset("fahrzeiten-2016", &["https://data.example/f_2016.csv"]),
            dataset("fahrzeiten-2017", &["https://data.example/f_2017.csv"]),
        ];

        let years = resolve_years(&datasets).unwrap();
        let keys: Vec<_> = years.keys().cloned().collect();
        assert_eq!(keys, vec!["2016", "2017", "2018"]);
    }

    #[test]
    fn test_resolve_years_fails_on_yearless_dataset() {
        let datasets = vec![dataset("fahrzeiten-ohne-jahr", &[])];
        assert!(resolve_years(&datasets).is_err());
    }

    #[test]
    fn test_select_years_missing_year_is_an_error() {
        let mut map = BTreeMap::new();
        map.insert("2016".to_string(), YearResources::default());

        let err = select_years(map, &["2017".to_string()]).unwrap_err();
        assert!(err.to_string().contains("2017"));
    }

    #[test]
    fn test_decode_package_search_body() {
        let body = r#"{
            "success": true,
            "result": {
                "results": [
                    {
                        "name": "fahrzeiten-der-vbz-2022",
                        "resources": [
                            {"download_url": "https://data.example/Fahrzeiten_SOLL_IST_20220101.csv"},
                            {"download_url": "https://data.example/Haltestelle_2022.csv"}
                        ]
                    }
                ]
            }
        }"#;

        let decoded: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(decoded.success);

        let years = resolve_years(&decoded.result.results).unwrap();
        let buckets = &years["2022"];
        assert_eq!(buckets.data.len(), 1);
        assert_eq!(buckets.metadata.len(), 1);
    }
}
