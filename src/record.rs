use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deaths count used when the text never mentions deaths.
pub const NO_DEATHS: &str = "0";

/// One fetch's extraction output. Counts are decimal strings; absent
/// optionals are omitted from the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub source_url: String,
    #[serde(rename = "lastUpdatedAtApify")]
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub read_me: String,
    #[serde(default)]
    pub source_title: String,
    #[serde(
        rename = "lastUpdatedAtSource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_cases_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infected_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_total: Option<String>,
    #[serde(default = "no_deaths")]
    pub deaths_total: String,
}

fn no_deaths() -> String {
    NO_DEATHS.to_string()
}

impl CandidateRecord {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
