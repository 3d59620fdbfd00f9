pub mod extract;
pub mod page;
pub mod rules;

use chrono::{DateTime, Utc};

use crate::record::CandidateRecord;
use extract::Extractor;

/// Two-step pipeline: html → page text → candidate record.
pub fn process_page(
    extractor: &Extractor,
    html: &str,
    source_url: &str,
    fetched_at: DateTime<Utc>,
) -> CandidateRecord {
    let page = page::parse_page(html);
    if page.body.is_empty() {
        tracing::warn!(%source_url, "article text not found on page");
    }
    extractor.extract_page(&page, source_url, fetched_at)
}
