use std::io::Write;

use anyhow::{Context, Result};

use crate::bucket::MonthKey;
use crate::datetime::local_hm;
use crate::duration::sum_durations;
use crate::ticket::Ticket;
use crate::time_entry::TimeEntry;

/// 月毎の集計結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub total: String,
    /// プロジェクト名と合計時間。プロジェクトなしは空文字列。
    pub projects: Vec<(String, String)>,
    /// 集計対象外となった計測中、または不正なentryの数。
    pub skipped: usize,
}

/// Consoleに表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;

    /// 月毎の集計結果を表示する。
    fn show_monthly_summaries(&mut self, summaries: &[MonthlySummary]) -> Result<()>;

    /// チケットを表示する。
    fn show_tickets(&mut self, tickets: &[Ticket]) -> Result<()>;
}

/// Markdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // time entryをlist形式で表示し、最後に合計を表示する。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.start);

        for entry in &sorted_entries {
            let end_str = entry
                .end
                .as_ref()
                .map(local_hm)
                .unwrap_or_else(|| "now".to_string());
            let elapsed = match (entry.is_running(), entry.elapsed()) {
                (true, _) => "running".to_string(),
                (false, Some(elapsed)) => elapsed,
                (false, None) => "invalid".to_string(),
            };
            let project = match entry.project_name() {
                "" => String::new(),
                name => format!(" [{}]", name),
            };
            writeln!(
                self.writer,
                "- {} ~ {} ({}): {}{}",
                local_hm(&entry.start),
                end_str,
                elapsed,
                entry.notes,
                project
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        if !sorted_entries.is_empty() {
            let total = sum_durations(sorted_entries.iter().filter_map(TimeEntry::elapsed));
            writeln!(self.writer, "\nTotal: {}", total).context("Failed to write total")?;
        }

        Ok(())
    }

    fn show_monthly_summaries(&mut self, summaries: &[MonthlySummary]) -> Result<()> {
        for summary in summaries {
            writeln!(self.writer, "## {}", summary.month)
                .and_then(|_| writeln!(self.writer, "- Total: {}", summary.total))
                .with_context(|| format!("Failed to write summary of {}", summary.month))?;
            for (project, total) in &summary.projects {
                let name = if project.is_empty() { "(no project)" } else { project.as_str() };
                writeln!(self.writer, "  - {}: {}", name, total)
                    .with_context(|| format!("Failed to write project {}", name))?;
            }
            if summary.skipped > 0 {
                writeln!(self.writer, "- Skipped: {}", summary.skipped)
                    .context("Failed to write skipped count")?;
            }
        }

        Ok(())
    }

    fn show_tickets(&mut self, tickets: &[Ticket]) -> Result<()> {
        for ticket in tickets {
            let deadline = ticket
                .deadline
                .map(|deadline| format!(" (due {})", deadline.format("%Y-%m-%d")))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "- #{} [{}] {:?}: {}{}",
                ticket.id, ticket.status, ticket.priority, ticket.task, deadline
            )
            .with_context(|| format!("Failed to write ticket: {:?}", ticket))?;
        }

        Ok(())
    }
}
