use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

mod access;
mod bucket;
mod client;
mod console;
mod csv_export;
mod daily_command;
mod datetime;
mod duration;
mod export_command;
mod monthly_command;
mod ticket;
mod tickets_command;
mod time_entry;

use client::{ApiClient, JsonFileRepository, WorkTimeRepository};
use console::{ConsoleMarkdownList, ConsolePresenter};
use daily_command::{DailyArgs, DailyCommand};
use export_command::{ExportArgs, ExportCommand};
use monthly_command::{MonthlyArgs, MonthlyCommand};
use tickets_command::{TicketsArgs, TicketsCommand};

/// 作業時間アプリのtime entryを集計、エクスポートするためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- daily
/// $ cargo run -- monthly --projects
/// $ cargo run -- export -m 2024-03 --german --project-column
/// $ cargo run -- --file backup.json tickets
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "file",
        global = true,
        help = "Read from an exported JSON file instead of the API",
        parse(from_os_str)
    )]
    file: Option<PathBuf>,

    #[clap(short = 'v', long = "verbose", global = true, parse(from_occurrences), help = "Show debug logs")]
    verbose: u8,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Show the entries of a day
    Daily(DailyArgs),
    /// Show monthly totals
    Monthly(MonthlyArgs),
    /// Write monthly CSV exports
    Export(ExportArgs),
    /// List and update tickets
    Tickets(TicketsArgs),
}

/// ログの出力を設定する。標準出力を汚さないよう、ログは標準エラー出力に書く。
fn setup_logger(verbose: u8) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);
    let level = if verbose > 0 {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Info)
        .level_for("reqwest", LevelFilter::Info)
        .chain(io::stderr())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}

/// サブコマンドを実行し、結果を標準出力に表示する。
async fn run<T: WorkTimeRepository>(repository: &T, subcommand: SubCommands) -> Result<()> {
    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);

    match subcommand {
        SubCommands::Daily(daily) => {
            let time_entries = DailyCommand::new(repository).run(daily).await?;
            presenter.show_time_entries(&time_entries)?;
        }
        SubCommands::Monthly(monthly) => {
            let summaries = MonthlyCommand::new(repository).run(monthly).await?;
            presenter.show_monthly_summaries(&summaries)?;
        }
        SubCommands::Export(export) => {
            let paths = ExportCommand::new(repository).run(export).await?;
            if paths.is_empty() {
                log::warn!("No time entries to export.");
            }
            for path in paths {
                println!("{}", path.display());
            }
        }
        SubCommands::Tickets(tickets) => {
            let tickets = TicketsCommand::new(repository).run(tickets).await?;
            presenter.show_tickets(&tickets)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose)?;

    match args.file {
        Some(path) => {
            let repository = JsonFileRepository::open(&path)?;
            run(&repository, args.subcommand).await
        }
        None => {
            let repository = ApiClient::new().context("Failed to create API client")?;
            run(&repository, args.subcommand).await
        }
    }
}
