pub mod counts;
pub mod timestamp;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, warn};

use super::page::PageText;
use crate::record::{CandidateRecord, NO_DEATHS};
use counts::{DEATHS, INFECTED, RECOVERED, TESTED_CASES};
use timestamp::parse_source_timestamp;

/// Builds candidate records from article text. Holds only settings, so
/// output depends on nothing but its inputs.
#[derive(Debug, Clone)]
pub struct Extractor {
    source_offset: FixedOffset,
    read_me: String,
}

impl Extractor {
    pub fn new(source_offset: FixedOffset, read_me: impl Into<String>) -> Self {
        Extractor {
            source_offset,
            read_me: read_me.into(),
        }
    }

    pub fn extract(
        &self,
        raw_text: &str,
        source_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> CandidateRecord {
        let source_timestamp = parse_source_timestamp(raw_text, self.source_offset);
        if source_timestamp.is_none() {
            warn!(%source_url, "no update timestamp found in source text");
        }

        let record = CandidateRecord {
            source_url: source_url.to_string(),
            fetched_at,
            read_me: self.read_me.clone(),
            source_title: String::new(),
            source_timestamp,
            tested_cases_total: TESTED_CASES.evaluate(raw_text),
            infected_total: INFECTED.evaluate(raw_text),
            recovered_total: RECOVERED.evaluate(raw_text),
            deaths_total: DEATHS
                .evaluate(raw_text)
                .unwrap_or_else(|| NO_DEATHS.to_string()),
        };
        debug!(?record, "extracted candidate");
        record
    }

    pub fn extract_page(
        &self,
        page: &PageText,
        source_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> CandidateRecord {
        CandidateRecord {
            source_title: page.title.clone(),
            ..self.extract(&page.body, source_url, fetched_at)
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(Utc.fix(), "")
    }
}
