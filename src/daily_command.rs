use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::info;

use crate::client::WorkTimeRepository;
use crate::datetime::{day_range, parse_date};
use crate::time_entry::TimeEntry;

/// 日毎の情報を出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DailyArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,
}

pub struct DailyCommand<'a, T: WorkTimeRepository> {
    repository: &'a T,
}

impl<'a, T: WorkTimeRepository> DailyCommand<'a, T> {
    /// 新しい`DailyCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - 作業時間アプリのデータにアクセスするためのリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `daily`サブコマンドの処理を行う。
    ///
    /// Localタイムゾーンで指定された日付の00:00:00から始まる1日のタイムエントリーを取得する。
    /// 日付が指定されていない場合は、Localタイムゾーンで現在の日付を利用する。
    ///
    /// # Arguments
    ///
    /// * `daily` - `daily`サブコマンドの引数
    pub async fn run(&self, daily: DailyArgs) -> Result<Vec<TimeEntry>> {
        let (start_at, end_at) = day_range(daily.date, &Local)?;
        info!("Start at: {}, End at: {}", start_at, end_at);

        let time_entries = self
            .repository
            .read_time_entries(&start_at, &end_at, None)
            .await
            .context("Failed to retrieve time entries")?;

        info!("Time entries retrieved successfully.");

        Ok(time_entries)
    }
}
