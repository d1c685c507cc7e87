use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Month, NaiveDate, TimeZone};

use crate::time_entry::TimeEntry;

const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// 月名の表示言語。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    German,
}

/// 月毎の集計キー。年、月の順で並ぶ。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1始まりの月。
    pub month: u32,
}

impl MonthKey {
    /// 日付が属する月のキーを返す。
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"<year> <MonthName>"`形式のラベルを返す。
    ///
    /// 月が1から12の範囲外の場合は月名の代わりに数値を使う。
    pub fn label(&self, language: Language) -> String {
        let names = match language {
            Language::English => &ENGLISH_MONTHS,
            Language::German => &GERMAN_MONTHS,
        };
        let month = u8::try_from(self.month)
            .ok()
            .and_then(|month| Month::try_from(month).ok());
        match month {
            Some(month) => format!("{} {}", self.year, names[month.number_from_month() as usize - 1]),
            None => format!("{} {}", self.year, self.month),
        }
    }

    /// `YYYY-MM`形式の文字列を返す。
    pub fn year_month(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label(Language::English))
    }
}

/// time entryを開始日時の属する月毎にまとめる。
///
/// 月は`tz`での暦月で判定し、終了日時は考慮しない。各月の中の順序は入力順を保つ。
pub fn bucket_by_month<Tz: TimeZone>(
    entries: &[TimeEntry],
    tz: &Tz,
) -> BTreeMap<MonthKey, Vec<TimeEntry>> {
    entries.iter().fold(BTreeMap::new(), |mut acc, entry| {
        let key = MonthKey::of(&entry.start.with_timezone(tz));
        acc.entry(key).or_insert_with(Vec::new).push(entry.clone());
        acc
    })
}

/// time entryを開始日時の`tz`での日付毎にまとめる。
pub fn bucket_by_day<Tz: TimeZone>(
    entries: &[TimeEntry],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<TimeEntry>> {
    entries.iter().fold(BTreeMap::new(), |mut acc, entry| {
        let day = entry.start.with_timezone(tz).date_naive();
        acc.entry(day).or_insert_with(Vec::new).push(entry.clone());
        acc
    })
}
