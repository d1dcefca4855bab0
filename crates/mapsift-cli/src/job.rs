use std::path::PathBuf;

use mapsift_chrome::ChromeConfig;
use mapsift_crawler::{CrawlTarget, CrawlerConfig, Proxy, Selectors};
use mapsift_sheets::CsvWriterConfig;
use serde::{Deserialize, Serialize};

/// Everything a crawl needs, as read from the YAML job file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Column names, the thirteen default ones when unset
    #[serde(default)]
    pub headers: Option<Vec<String>>,

    #[serde(default)]
    pub proxies: Vec<Proxy>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub selectors: Selectors,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub browser: ChromeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StoreConfig {
    /// Google Sheets, with an OAuth access token
    Sheets {
        #[serde(default)]
        token: Option<String>,
    },
    /// One CSV file per sheet, under `dir/<spreadsheetId>/`
    Csv {
        dir: PathBuf,
        #[serde(default)]
        csv: CsvWriterConfig,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sheets { token: None }
    }
}

/// Escapes a location into a checkpoint and sheet name.
pub fn batch_key(location: &str) -> String {
    location
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Every category in every location, location by location.
pub fn cross_targets(locations: &[String], categories: &[String]) -> Vec<CrawlTarget> {
    locations
        .iter()
        .flat_map(|location| {
            categories
                .iter()
                .map(move |category| CrawlTarget::new(category, location, batch_key(location)))
        })
        .collect()
}

/// Targets listed in a sheet of `(category, location)` rows under a header row.
pub fn sheet_targets(rows: &[Vec<String>]) -> Vec<CrawlTarget> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let category = row.first()?.trim();
            let location = row.get(1)?.trim();
            if category.is_empty() || location.is_empty() {
                log::warn!("Skipping incomplete target row {row:?}");
                return None;
            }
            Some(CrawlTarget::new(category, location, batch_key(location)))
        })
        .collect()
}
