use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_SOURCE_URL: &str = "https://www.rosminzdrav.ru/ministry/covid19";
const DEFAULT_DB_PATH: &str = "data/covid_ru.sqlite";
const DEFAULT_README_URL: &str = "https://apify.com/krakorj/covid-russia";

/// Runtime settings. Every field can be overridden with a `COVID_<FIELD>`
/// environment variable, e.g. `COVID_SOURCE_UTC_OFFSET_MINUTES=180`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub source_url: String,
    pub db_path: PathBuf,
    /// Key-value namespace holding the LATEST record.
    pub store_name: String,
    pub history_dataset: String,
    /// Key-value namespace holding the OUTPUT snapshot.
    pub default_store: String,
    /// Dataset receiving every run's candidate.
    pub feed_dataset: String,
    pub readme_url: String,
    /// Offset of the wall clock the source page writes its dates in.
    /// Zero reads them as UTC.
    pub source_utc_offset_minutes: i32,
    pub max_request_retries: u32,
    pub page_timeout_secs: u64,
}

/// Store and dataset names used by one crawl.
#[derive(Debug, Clone)]
pub struct StoreNames {
    pub default_store: String,
    pub feed_dataset: String,
    pub latest_store: String,
    pub history_dataset: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("source_url", DEFAULT_SOURCE_URL)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("store_name", "COVID-19-RUSSIA")?
            .set_default("history_dataset", "COVID-19-RUSSIA-HISTORY")?
            .set_default("default_store", "default")?
            .set_default("feed_dataset", "default")?
            .set_default("readme_url", DEFAULT_README_URL)?
            .set_default("source_utc_offset_minutes", 0)?
            .set_default("max_request_retries", 1)?
            .set_default("page_timeout_secs", 60)?
            .add_source(Environment::with_prefix("COVID"))
            .build()
            .context("failed to build settings")?;

        let settings: Settings = settings
            .try_deserialize()
            .context("failed to load settings from environment")?;
        settings.source_offset()?;
        Ok(settings)
    }

    pub fn source_offset(&self) -> Result<FixedOffset> {
        self.source_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| {
                format!(
                    "source_utc_offset_minutes out of range: {}",
                    self.source_utc_offset_minutes
                )
            })
    }

    pub fn store_names(&self) -> StoreNames {
        StoreNames {
            default_store: self.default_store.clone(),
            feed_dataset: self.feed_dataset.clone(),
            latest_store: self.store_name.clone(),
            history_dataset: self.history_dataset.clone(),
        }
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests() -> Self {
        Settings {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            db_path: PathBuf::from(":memory:"),
            store_name: "COVID-19-RUSSIA".to_string(),
            history_dataset: "COVID-19-RUSSIA-HISTORY".to_string(),
            default_store: "default".to_string(),
            feed_dataset: "default".to_string(),
            readme_url: DEFAULT_README_URL.to_string(),
            source_utc_offset_minutes: 0,
            max_request_retries: 1,
            page_timeout_secs: 60,
        }
    }
}
