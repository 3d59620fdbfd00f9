use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;

// DD.MM.YYYY, any byline text, then HH:MM.
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<day>\d{1,2})\.(?P<month>\d{1,2})\.(?P<year>\d{4}).*?(?P<hour>\d{1,2}):(?P<minute>\d{2})",
    )
    .unwrap()
});

/// Absolute instant of the first valid `DD.MM.YYYY … HH:MM` fragment, read as
/// wall-clock time at `offset`.
pub fn parse_source_timestamp(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    DATE_TIME_RE
        .captures_iter(text)
        .find_map(|caps| to_instant(&caps, offset))
}

fn to_instant(caps: &Captures<'_>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let field = |name: &str| caps.name(name)?.as_str().parse::<u32>().ok();
    let year = caps.name("year")?.as_str().parse::<i32>().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field("month")?, field("day")?)?
        .and_hms_opt(field("hour")?, field("minute")?, 0)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn byline_as_utc() {
        let ts = parse_source_timestamp("01.02.2021 в 10:30", utc());
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2021, 2, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn byline_with_source_offset() {
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        let ts = parse_source_timestamp("01.02.2021 в 10:30", moscow);
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2021, 2, 1, 7, 30, 0).unwrap()));
    }

    #[test]
    fn text_between_date_and_time() {
        let text = "Информация на 20.03.2020, опубликовано\nв 9:05 по московскому времени";
        let ts = parse_source_timestamp(text, utc());
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2020, 3, 20, 9, 5, 0).unwrap()));
    }

    #[test]
    fn no_fragment() {
        assert_eq!(parse_source_timestamp("зарегистрировано 199 случаев", utc()), None);
        assert_eq!(parse_source_timestamp("01.02.2021 без времени", utc()), None);
    }

    #[test]
    fn skips_impossible_dates() {
        let text = "31.02.2021 в 10:30; обновлено 01.03.2021 в 11:00";
        let ts = parse_source_timestamp(text, utc());
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2021, 3, 1, 11, 0, 0).unwrap()));
    }

    #[test]
    fn out_of_range_time() {
        assert_eq!(parse_source_timestamp("01.02.2021 в 25:30", utc()), None);
    }
}
