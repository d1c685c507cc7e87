use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use log::info;

use crate::access::can_view_entries;
use crate::bucket::{bucket_by_month, Language};
use crate::client::WorkTimeRepository;
use crate::csv_export::{write_export, CsvOptions};
use crate::datetime::{month_range, parse_month};

/// `export`サブコマンドの引数を表す構造体。
#[derive(Debug, Default, clap::Args)]
pub struct ExportArgs {
    #[clap(
        short = 'm',
        long = "month",
        help = "Sets a custom month in the format YYYY-MM",
        parse(try_from_str = parse_month),
    )]
    pub month: Option<NaiveDate>,

    #[clap(long = "date-column", help = "Add a leading date column")]
    pub date_column: bool,

    #[clap(long = "project-column", help = "Add a project column")]
    pub project_column: bool,

    #[clap(long = "group-by-date", help = "Insert a sub-header row for each day")]
    pub group_by_date: bool,

    #[clap(long = "transliterate", help = "Replace umlauts in the whole file, not only in the file name")]
    pub transliterate: bool,

    #[clap(long = "german", help = "Use German month names in file names")]
    pub german: bool,

    #[clap(long = "user", help = "Export the entries of another user (admins only)")]
    pub user: Option<i64>,

    #[clap(
        short = 'o',
        long = "output",
        help = "Directory to write to (defaults to the download directory)",
        parse(from_os_str)
    )]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    fn options(&self) -> CsvOptions {
        CsvOptions {
            include_date_column: self.date_column,
            include_project_column: self.project_column,
            group_by_date: self.group_by_date,
            transliterate: self.transliterate,
        }
    }

    fn language(&self) -> Language {
        if self.german {
            Language::German
        } else {
            Language::English
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub struct ExportCommand<'a, T: WorkTimeRepository> {
    repository: &'a T,
}

impl<'a, T: WorkTimeRepository> ExportCommand<'a, T> {
    /// 新しい`ExportCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `export`サブコマンドの処理を行い、書き出したファイルのパスを返す。
    ///
    /// 他のユーザーを指定した場合は、ログイン中のユーザーに閲覧権限があるかを確認する。
    pub async fn run(&self, export: ExportArgs) -> Result<Vec<PathBuf>> {
        if let Some(user_id) = export.user {
            let viewer = self
                .repository
                .current_user()
                .await
                .context("Failed to retrieve current user")?;
            if !can_view_entries(&viewer, user_id) {
                bail!("{} is not allowed to export entries of user {}", viewer.tag, user_id);
            }
        }

        let (start_at, end_at) = month_range(export.month, &Local)?;
        info!("Start at: {}, End at: {}", start_at, end_at);
        let time_entries = self
            .repository
            .read_time_entries(&start_at, &end_at, export.user)
            .await
            .context("Failed to retrieve time entries")?;

        let dir = export.output_dir();
        let options = export.options();
        bucket_by_month(&time_entries, &Local)
            .iter()
            .map(|(key, entries)| {
                write_export(&dir, key, entries, &options, export.language(), &Local)
                    .with_context(|| format!("Failed to export {}", key))
            })
            .collect()
    }
}
