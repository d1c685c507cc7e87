use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use log::{debug, info, warn};

use crate::bucket::bucket_by_month;
use crate::client::WorkTimeRepository;
use crate::console::MonthlySummary;
use crate::datetime::{month_range, parse_month};
use crate::duration::{parse_duration, sum_durations};
use crate::time_entry::TimeEntry;

/// `monthly`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct MonthlyArgs {
    #[clap(
        short = 'm',
        long = "month",
        help = "Sets a custom month in the format YYYY-MM",
        parse(try_from_str = parse_month),
    )]
    pub month: Option<NaiveDate>,

    #[clap(long = "projects", help = "Show totals by project")]
    pub projects: bool,
}

pub struct MonthlyCommand<'a, T: WorkTimeRepository> {
    repository: &'a T,
}

impl<'a, T: WorkTimeRepository> MonthlyCommand<'a, T> {
    /// 新しい`MonthlyCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `monthly`サブコマンドの処理を行う。
    ///
    /// Localタイムゾーンで指定された月のtime entryを集計する。
    /// 月が指定されていない場合は、Localタイムゾーンで現在の月を利用する。
    pub async fn run(&self, monthly: MonthlyArgs) -> Result<Vec<MonthlySummary>> {
        let (start_at, end_at) = month_range(monthly.month, &Local)?;
        info!("Start at: {}, End at: {}", start_at, end_at);

        let time_entries = self
            .repository
            .read_time_entries(&start_at, &end_at, None)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");

        Ok(summarize(&time_entries, monthly.projects, &Local))
    }
}

/// 月毎に合計時間を集計する。
///
/// 終了していないtime entry、経過時間が負になるtime entryは集計対象外とする。
pub fn summarize<Tz: TimeZone>(
    time_entries: &[TimeEntry],
    by_project: bool,
    tz: &Tz,
) -> Vec<MonthlySummary> {
    bucket_by_month(time_entries, tz)
        .into_iter()
        .map(|(month, entries)| {
            let (valid, skipped): (Vec<_>, Vec<_>) = entries
                .iter()
                .map(|entry| (entry, entry.elapsed()))
                .partition(|(_, elapsed)| elapsed.is_some());
            if !skipped.is_empty() {
                warn!("{} entries in {} are running or invalid", skipped.len(), month);
            }
            valid
                .iter()
                .for_each(|(entry, elapsed)| check_stored_time(entry, elapsed.as_deref()));

            let projects = if by_project {
                valid
                    .iter()
                    .fold(BTreeMap::<String, Vec<String>>::new(), |mut acc, (entry, elapsed)| {
                        acc.entry(entry.project_name().to_string())
                            .or_default()
                            .extend(elapsed.clone());
                        acc
                    })
                    .into_iter()
                    .map(|(project, durations)| (project, sum_durations(durations)))
                    .collect()
            } else {
                vec![]
            };

            MonthlySummary {
                month,
                total: sum_durations(valid.iter().filter_map(|(_, elapsed)| elapsed.as_deref())),
                projects,
                skipped: skipped.len(),
            }
        })
        .collect()
}

/// サーバーに保存されている経過時間と再計算した経過時間を比較し、食い違いをログに残す。
fn check_stored_time(entry: &TimeEntry, elapsed: Option<&str>) {
    let Some(stored) = entry.time.as_deref() else {
        return;
    };
    match parse_duration(stored) {
        Err(err) => warn!("Entry {} has a malformed stored time: {}", entry.id, err),
        Ok(_) if Some(stored) != elapsed => debug!(
            "Entry {} stores {} but its interval gives {:?}",
            entry.id, stored, elapsed
        ),
        Ok(_) => {}
    }
}
