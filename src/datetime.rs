use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

/// `YYYY-MM`形式の月をパースし、その月の1日を返す。
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    let target_date = s.to_string() + "-01";
    NaiveDate::parse_from_str(&target_date, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse month: {}", s))
}

/// `tz`での日付の00:00:00をUTCで返す。
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let datetime = tz
        .from_local_datetime(&naive_datetime)
        .earliest()
        .with_context(|| format!("No local midnight on {}", date))?;

    Ok(datetime.with_timezone(&Utc))
}

/// `tz`での1日の範囲を返す。日付が指定されていない場合は現在の日付を利用する。
pub fn day_range<Tz: TimeZone>(
    date: Option<NaiveDate>,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let date = date.unwrap_or_else(|| now().with_timezone(tz).date_naive());
    let next = date + Duration::days(1);

    Ok((start_of_day(date, tz)?, start_of_day(next, tz)?))
}

/// `tz`での1ヶ月の範囲を返す。月が指定されていない場合は現在の月を利用する。
pub fn month_range<Tz: TimeZone>(
    month: Option<NaiveDate>,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let date = month.unwrap_or_else(|| now().with_timezone(tz).date_naive());
    let first = date.with_day(1).context("Failed to set day")?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .context("Failed to compute next month")?;

    Ok((start_of_day(first, tz)?, start_of_day(next, tz)?))
}

/// ローカルタイムゾーンでの日時を`HH:MM`形式にする。
pub fn local_hm(datetime: &DateTime<Utc>) -> String {
    datetime.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
    use rstest::rstest;

    use super::{day_range, mock_datetime, month_range, parse_date, parse_month};

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
        mock_datetime::clear_mock_time();
    }

    #[rstest]
    #[case("2024-01-15", Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))]
    #[case("2024-13-01", None)]
    #[case("15.01.2024", None)]
    fn test_parse_date(#[case] input: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(input).ok(), expected);
    }

    #[rstest]
    #[case("2024-02", Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()))]
    #[case("2024", None)]
    fn test_parse_month(#[case] input: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_month(input).ok(), expected);
    }

    #[test]
    fn test_day_range_in_offset_zone() {
        let tz = FixedOffset::east_opt(3600).unwrap();

        let (start, end) = day_range(NaiveDate::from_ymd_opt(2024, 1, 15), &tz).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 14, 23, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_day_range_defaults_to_today() {
        mock_datetime::set_mock_time(Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap());

        let (start, _) = day_range(None, &Utc).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        mock_datetime::clear_mock_time();
    }

    /// 12月の翌月は翌年の1月になる。
    #[rstest]
    #[case(NaiveDate::from_ymd_opt(2023, 12, 20).unwrap(), (2023, 12), (2024, 1))]
    #[case(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), (2024, 2), (2024, 3))]
    fn test_month_range(
        #[case] month: NaiveDate,
        #[case] from: (i32, u32),
        #[case] to: (i32, u32),
    ) {
        let (start, end) = month_range(Some(month), &Utc).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(from.0, from.1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(to.0, to.1, 1, 0, 0, 0).unwrap());
    }
}
