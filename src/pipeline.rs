use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::settings::StoreNames;
use crate::db::{AppendLog, Dataset, KeyValue, KeyValueStore};
use crate::error::StoreError;
use crate::history::HistoryWriter;
use crate::novelty::Novelty;
use crate::parser::{self, extract::Extractor};
use crate::record::CandidateRecord;

/// Debug snapshot of the most recent candidate; never read back.
pub const OUTPUT_KEY: &str = "OUTPUT";

pub struct RunReport {
    pub record: CandidateRecord,
    pub novelty: Novelty,
    pub history_len: usize,
}

/// One crawl's work after the page body is in hand: extract, write the raw
/// feed and OUTPUT, then update LATEST and history.
pub fn handle_page(
    extractor: &Extractor,
    html: &str,
    source_url: &str,
    fetched_at: DateTime<Utc>,
    conn: &Connection,
    names: &StoreNames,
) -> Result<RunReport, StoreError> {
    let record = parser::process_page(extractor, html, source_url, fetched_at);
    let value = record.to_json()?;

    Dataset::open(conn, &names.feed_dataset).push_data(&value)?;
    KeyValueStore::open(conn, &names.default_store).set_value(OUTPUT_KEY, &value)?;

    let latest = KeyValueStore::open(conn, &names.latest_store);
    let history = Dataset::open(conn, &names.history_dataset);
    let novelty = HistoryWriter::new(&latest, &history).record(&record)?;
    let history_len = history.len()?;

    info!(?novelty, history_len, "run recorded");
    Ok(RunReport {
        record,
        novelty,
        history_len,
    })
}
