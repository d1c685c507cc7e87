use chrono::{DateTime, TimeZone};
use log::warn;
use thiserror::Error;

/// `HH:MM:SS`形式の文字列が不正な場合のエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// `:`区切りの要素数が3つではない。
    #[error("expected HH:MM:SS but got {0:?}")]
    SegmentCount(String),
    /// 数値として解釈できない要素がある。
    #[error("non-numeric segment in duration {0:?}")]
    InvalidSegment(String),
    /// 秒数に変換すると`u64`に収まらない。
    #[error("duration {0:?} is too large")]
    Overflow(String),
}

/// 開始から終了までの経過時間を`HH:MM:SS`形式で返す。
///
/// 休憩時間(分)を差し引いた結果が負になる場合は`None`を返す。
///
/// # Arguments
///
/// * `start` - 開始日時
/// * `end` - 終了日時
/// * `break_minutes` - 休憩時間(分)
pub fn compute_duration<Tz: TimeZone>(
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
    break_minutes: Option<u32>,
) -> Option<String> {
    let break_millis = i64::from(break_minutes.unwrap_or(0)) * 60_000;
    let millis = (end.clone() - start.clone())
        .num_milliseconds()
        .checked_sub(break_millis)?;
    if millis < 0 {
        return None;
    }

    // 1秒未満は切り捨てる
    Some(format_hms((millis / 1000) as u64))
}

/// 秒数を`HH:MM:SS`形式にする。時間は2桁以上で、99時間を超えてもそのまま表示する。
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// `HH:MM:SS`形式の文字列を秒数として厳密に解釈する。
pub fn parse_duration(s: &str) -> Result<u64, DurationError> {
    let segments: Vec<&str> = s.trim().split(':').collect();
    if segments.len() != 3 {
        return Err(DurationError::SegmentCount(s.to_string()));
    }

    let values = segments
        .iter()
        .map(|segment| segment.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| DurationError::InvalidSegment(s.to_string()))?;

    values[0]
        .checked_mul(3600)
        .zip(values[1].checked_mul(60))
        .and_then(|(hours, minutes)| hours.checked_add(minutes))
        .and_then(|total| total.checked_add(values[2]))
        .ok_or_else(|| DurationError::Overflow(s.to_string()))
}

/// `HH:MM:SS`形式の文字列を寛容に解釈する。
///
/// 欠けている要素、数値でない要素、秒数にすると桁あふれする要素は0として扱う。
fn parse_duration_lenient(s: &str) -> u64 {
    let mut segments = s.trim().split(':');
    let mut next = |unit: u64| {
        let segment = segments.next().unwrap_or("");
        match segment.parse::<u64>().ok().and_then(|value| value.checked_mul(unit)) {
            Some(seconds) => seconds,
            None => {
                warn!("Treating malformed duration segment {:?} in {:?} as 0", segment, s);
                0
            }
        }
    };

    next(3600)
        .saturating_add(next(60))
        .saturating_add(next(1))
}

/// `HH:MM:SS`形式の文字列を合計する。
///
/// 空の場合は`00:00:00`を返す。
pub fn sum_durations<I, S>(durations: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let total = durations
        .into_iter()
        .map(|duration| parse_duration_lenient(duration.as_ref()))
        .fold(0u64, u64::saturating_add);

    format_hms(total)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::{compute_duration, format_hms, parse_duration, sum_durations, DurationError};

    #[rstest]
    #[case::zero(0, 0, None, Some("00:00:00"))]
    #[case::one_second(0, 1, None, Some("00:00:01"))]
    #[case::working_day(0, 8 * 3600 + 30 * 60, Some(30), Some("08:00:00"))]
    #[case::break_equals_span(0, 1800, Some(30), Some("00:00:00"))]
    #[case::break_exceeds_span(0, 1799, Some(30), None)]
    #[case::end_before_start(10, 0, None, None)]
    #[case::end_before_start_with_break(10, 0, Some(0), None)]
    #[case::over_a_hundred_hours(0, 123 * 3600 + 4 * 60 + 5, None, Some("123:04:05"))]
    fn test_compute_duration(
        #[case] start_offset: i64,
        #[case] end_offset: i64,
        #[case] break_minutes: Option<u32>,
        #[case] expected: Option<&str>,
    ) {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let start = base + Duration::seconds(start_offset);
        let end = base + Duration::seconds(end_offset);

        assert_eq!(
            compute_duration(&start, &end, break_minutes).as_deref(),
            expected
        );
    }

    /// 1秒未満の差も符号の判定に含め、表示では切り捨てる。
    #[rstest]
    #[case::end_earlier_within_second(900, 100, None)]
    #[case::less_than_a_second(900, 1_100, Some("00:00:00"))]
    #[case::just_under_two_seconds(100, 2_050, Some("00:00:01"))]
    fn test_compute_duration_sub_second(
        #[case] start_millis: i64,
        #[case] end_millis: i64,
        #[case] expected: Option<&str>,
    ) {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let start = base + Duration::milliseconds(start_millis);
        let end = base + Duration::milliseconds(end_millis);

        assert_eq!(compute_duration(&start, &end, None).as_deref(), expected);
        assert_eq!(compute_duration(&start, &end, Some(0)).as_deref(), expected);
    }

    /// 開始が終了以前であれば、休憩なしの結果は壁時計の差と一致する。
    #[test]
    fn test_compute_duration_matches_wall_clock() {
        let start = Utc.with_ymd_and_hms(2024, 2, 28, 22, 15, 10).unwrap();
        for seconds in [0, 59, 3600, 86_399, 86_400 * 2 + 7] {
            let end = start + Duration::seconds(seconds);
            assert_eq!(
                compute_duration(&start, &end, Some(0)),
                Some(format_hms(seconds as u64))
            );
        }
    }

    #[rstest]
    #[case::empty(&[], "00:00:00")]
    #[case::single(&["01:00:00"], "01:00:00")]
    #[case::pair(&["01:00:00", "00:30:00"], "01:30:00")]
    #[case::carry(&["00:59:59", "00:00:01"], "01:00:00")]
    #[case::unnormalized_single(&["00:90:75"], "01:31:15")]
    #[case::malformed_segment(&["01:xx:10", "00:01:00"], "01:01:10")]
    #[case::missing_segments(&["2"], "02:00:00")]
    #[case::garbage(&["abc"], "00:00:00")]
    #[case::hours_overflow(&["6000000000000000000:00:00", "00:00:05"], "00:00:05")]
    #[case::saturated_total(
        &["5000000000000000:00:00", "5000000000000000:00:00"],
        "5124095576030431:00:15",
    )]
    fn test_sum_durations(#[case] input: &[&str], #[case] expected: &str) {
        assert_eq!(sum_durations(input), expected);
    }

    #[rstest]
    #[case("08:00:00", Ok(28_800))]
    #[case(" 00:01:05 ", Ok(65))]
    #[case("08:00", Err(DurationError::SegmentCount("08:00".to_string())))]
    #[case("08:x:00", Err(DurationError::InvalidSegment("08:x:00".to_string())))]
    #[case(
        "6000000000000000000:00:00",
        Err(DurationError::Overflow("6000000000000000000:00:00".to_string())),
    )]
    #[case(
        "5124095576030431:00:16",
        Err(DurationError::Overflow("5124095576030431:00:16".to_string())),
    )]
    fn test_parse_duration(#[case] input: &str, #[case] expected: Result<u64, DurationError>) {
        assert_eq!(parse_duration(input), expected);
    }

    #[test]
    fn test_duration_error_message() {
        let err = parse_duration("1:2").unwrap_err();

        assert_eq!(err.to_string(), r#"expected HH:MM:SS but got "1:2""#);
    }
}
