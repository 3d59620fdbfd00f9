use tracing::info;

use crate::db::{AppendLog, KeyValue};
use crate::error::StoreError;
use crate::novelty::{classify, Novelty};
use crate::record::CandidateRecord;

/// Key of the LATEST record. Written on the first successful run, read then
/// rewritten on every later run, never deleted.
pub const LATEST_KEY: &str = "LATEST";

/// Owns the LATEST pointer and the history log for one crawl target.
pub struct HistoryWriter<'a, L, H> {
    latest: &'a L,
    history: &'a H,
}

impl<'a, L: KeyValue, H: AppendLog> HistoryWriter<'a, L, H> {
    pub fn new(latest: &'a L, history: &'a H) -> Self {
        HistoryWriter { latest, history }
    }

    pub fn latest(&self) -> Result<Option<CandidateRecord>, StoreError> {
        let Some(value) = self.latest.get_value(LATEST_KEY)? else {
            return Ok(None);
        };
        CandidateRecord::from_json(value)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: LATEST_KEY.to_string(),
                source,
            })
    }

    /// One LATEST write per call; one history append when novel.
    pub fn record(&self, candidate: &CandidateRecord) -> Result<Novelty, StoreError> {
        let latest = self.latest()?;
        let novelty = classify(candidate, latest.as_ref());
        let value = candidate.to_json()?;

        if novelty.is_novel() {
            self.history.push_data(&value)?;
            info!(
                ?novelty,
                source_timestamp = ?candidate.source_timestamp,
                "appended to history"
            );
        } else {
            info!(
                source_timestamp = ?candidate.source_timestamp,
                "source unchanged, history not extended"
            );
        }

        self.latest.set_value(LATEST_KEY, &value)?;
        Ok(novelty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory, Dataset, KeyValueStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::Value;

    fn candidate(ts: Option<DateTime<Utc>>, fetched_at: DateTime<Utc>) -> CandidateRecord {
        CandidateRecord {
            source_url: "https://www.rosminzdrav.ru/ministry/covid19".into(),
            fetched_at,
            read_me: String::new(),
            source_title: String::new(),
            source_timestamp: ts,
            tested_cases_total: Some("1234".into()),
            infected_total: Some("199".into()),
            recovered_total: None,
            deaths_total: "0".into(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 20, 10, 30, 0).unwrap()
    }

    #[test]
    fn first_run_bootstraps() {
        let conn = memory();
        let latest = KeyValueStore::open(&conn, "COVID-19-RUSSIA");
        let history = Dataset::open(&conn, "COVID-19-RUSSIA-HISTORY");
        let writer = HistoryWriter::new(&latest, &history);

        let c = candidate(Some(t0()), t0());
        assert_eq!(writer.record(&c).unwrap(), Novelty::Bootstrap);
        assert_eq!(history.len().unwrap(), 1);
        assert_eq!(writer.latest().unwrap(), Some(c));
    }

    #[test]
    fn repeated_timestamp_appends_once_and_refreshes_latest() {
        let conn = memory();
        let latest = KeyValueStore::open(&conn, "COVID-19-RUSSIA");
        let history = Dataset::open(&conn, "COVID-19-RUSSIA-HISTORY");
        let writer = HistoryWriter::new(&latest, &history);

        let first = candidate(Some(t0()), t0() + Duration::minutes(5));
        let mut second = candidate(Some(t0()), t0() + Duration::hours(1));
        second.recovered_total = Some("9".into());

        writer.record(&first).unwrap();
        assert_eq!(writer.record(&second).unwrap(), Novelty::Unchanged);

        assert_eq!(history.len().unwrap(), 1);
        let stored = writer.latest().unwrap().unwrap();
        assert_eq!(stored.fetched_at, second.fetched_at);
        assert_eq!(stored.recovered_total.as_deref(), Some("9"));
    }

    #[test]
    fn history_grows_by_at_most_one_per_run() {
        let conn = memory();
        let latest = KeyValueStore::open(&conn, "COVID-19-RUSSIA");
        let history = Dataset::open(&conn, "COVID-19-RUSSIA-HISTORY");
        let writer = HistoryWriter::new(&latest, &history);

        let stamps = [Some(t0()), Some(t0()), None, None, Some(t0() + Duration::days(1))];
        let mut prev = 0;
        for (i, ts) in stamps.into_iter().enumerate() {
            writer
                .record(&candidate(ts, t0() + Duration::hours(i as i64)))
                .unwrap();
            let len = history.len().unwrap();
            assert!(len >= prev && len <= prev + 1);
            prev = len;
        }
        // t0, undated, t0+1d
        assert_eq!(prev, 3);

        let items = history.items(None).unwrap();
        let dated: Vec<Option<&Value>> = items.iter().map(|v| v.get("lastUpdatedAtSource")).collect();
        assert!(dated[0].is_some());
        assert!(dated[1].is_none());
        assert!(dated[2].is_some());
    }

    #[test]
    fn malformed_latest_is_an_error() {
        let conn = memory();
        let latest = KeyValueStore::open(&conn, "COVID-19-RUSSIA");
        let history = Dataset::open(&conn, "COVID-19-RUSSIA-HISTORY");
        latest
            .set_value(LATEST_KEY, &serde_json::json!({ "unexpected": true }))
            .unwrap();

        let writer = HistoryWriter::new(&latest, &history);
        let err = writer.record(&candidate(Some(t0()), t0())).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert_eq!(history.len().unwrap(), 0);
    }

    struct BrokenLog;

    impl AppendLog for BrokenLog {
        fn push_data(&self, _: &Value) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn failed_append_propagates_before_latest_moves() {
        let conn = memory();
        let latest = KeyValueStore::open(&conn, "COVID-19-RUSSIA");
        let writer = HistoryWriter::new(&latest, &BrokenLog);

        assert!(writer.record(&candidate(Some(t0()), t0())).is_err());
        assert!(latest.get_value(LATEST_KEY).unwrap().is_none());
    }
}
