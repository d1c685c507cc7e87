use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeZone;
use log::{debug, info};

use crate::bucket::{bucket_by_day, Language, MonthKey};
use crate::duration::sum_durations;
use crate::time_entry::TimeEntry;

const DELIMITER: char = ';';

/// CSV出力の設定。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// 先頭に日付列を追加する。
    pub include_date_column: bool,
    /// プロジェクト列を追加する。
    pub include_project_column: bool,
    /// 日付毎に見出し行を入れる。
    pub group_by_date: bool,
    /// 出力全体のウムラウトをASCIIに置き換える。
    pub transliterate: bool,
}

/// 1行分のフィールドを組み立てる。
struct Row<'a> {
    options: &'a CsvOptions,
    date: String,
    start: String,
    end: String,
    break_minutes: String,
    time: String,
    project: String,
    notes: String,
}

impl<'a> Row<'a> {
    fn empty(options: &'a CsvOptions) -> Self {
        Self {
            options,
            date: String::new(),
            start: String::new(),
            end: String::new(),
            break_minutes: String::new(),
            time: String::new(),
            project: String::new(),
            notes: String::new(),
        }
    }

    /// 先頭フィールドに値を入れる。日付列の有無で位置が変わる。
    fn with_first(mut self, value: &str) -> Self {
        if self.options.include_date_column {
            self.date = value.to_string();
        } else {
            self.start = value.to_string();
        }
        self
    }

    fn render(&self) -> String {
        let mut fields: Vec<&str> = Vec::with_capacity(7);
        if self.options.include_date_column {
            fields.push(&self.date);
        }
        fields.extend([
            self.start.as_str(),
            self.end.as_str(),
            self.break_minutes.as_str(),
            self.time.as_str(),
        ]);
        if self.options.include_project_column {
            fields.push(&self.project);
        }
        fields.push(&self.notes);

        fields
            .into_iter()
            .map(escape_field)
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string())
    }
}

/// 区切り文字、引用符、改行を含むフィールドを引用符で囲む。
fn escape_field(field: &str) -> String {
    if field.contains(|c: char| c == DELIMITER || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn header(options: &CsvOptions) -> String {
    let mut row = Row::empty(options);
    row.date = "Date".to_string();
    row.start = "Start".to_string();
    row.end = "End".to_string();
    row.break_minutes = "Break".to_string();
    row.time = "Time".to_string();
    row.project = "Project".to_string();
    row.notes = "Notes".to_string();
    row.render()
}

/// ドイツ語のウムラウトとßをASCIIに置き換える。
pub fn transliterate_umlauts(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'Ä' => out.push_str("Ae"),
            'Ö' => out.push_str("Oe"),
            'Ü' => out.push_str("Ue"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}

/// time entryをセミコロン区切りのCSVにする。
///
/// 終了していないentry、経過時間が負になるentryは出力しない。最終行は合計行。
///
/// # Arguments
///
/// * `entries` - 出力するtime entry
/// * `options` - 出力する列などの設定
/// * `tz` - 日時を表示するタイムゾーン
pub fn serialize_csv<Tz: TimeZone>(entries: &[TimeEntry], options: &CsvOptions, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![header(options)];
    let mut durations = Vec::new();

    let mut push_entry = |lines: &mut Vec<String>, entry: &TimeEntry| {
        let (Some(end), Some(time)) = (entry.end, entry.elapsed()) else {
            debug!("Skipping entry {} without a valid end", entry.id);
            return;
        };
        let start = entry.start.with_timezone(tz);
        let row = Row {
            options,
            date: start.format("%d.%m.%Y").to_string(),
            start: start.format("%Y-%m-%d %H:%M:%S").to_string(),
            end: end.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
            break_minutes: entry.break_minutes.to_string(),
            time: time.clone(),
            project: entry.project_name().to_string(),
            notes: entry.notes.clone(),
        };
        lines.push(row.render());
        durations.push(time);
    };

    if options.group_by_date {
        for (day, day_entries) in bucket_by_day(entries, tz) {
            if !day_entries.iter().any(|entry| entry.elapsed().is_some()) {
                continue;
            }
            lines.push(
                Row::empty(options)
                    .with_first(&day.format("%d.%m.%Y").to_string())
                    .render(),
            );
            day_entries
                .iter()
                .for_each(|entry| push_entry(&mut lines, entry));
        }
    } else {
        entries.iter().for_each(|entry| push_entry(&mut lines, entry));
    }

    let mut total = Row::empty(options).with_first("Total");
    total.time = sum_durations(&durations);
    lines.push(total.render());

    let mut csv = lines.join("\n");
    csv.push('\n');
    if options.transliterate {
        csv = transliterate_umlauts(&csv);
    }
    csv
}

/// エクスポートファイル名`Time <yearMonth>.csv`を返す。ファイル名は常にASCIIに置き換える。
pub fn export_file_name(key: &MonthKey, language: Language) -> String {
    transliterate_umlauts(&format!("Time {}.csv", key.label(language)))
}

/// 1ヶ月分のCSVをディレクトリに書き出し、書き出したパスを返す。
pub fn write_export<Tz: TimeZone>(
    dir: &Path,
    key: &MonthKey,
    entries: &[TimeEntry],
    options: &CsvOptions,
    language: Language,
    tz: &Tz,
) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
    let path = dir.join(export_file_name(key, language));
    let csv = serialize_csv(entries, options, tz);
    fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported {} entries of {} to {}", entries.len(), key.year_month(), path.display());

    Ok(path)
}
