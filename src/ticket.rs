use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// チケットの優先度。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// 並び替え用の順位。高いほど小さい。
    fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// チケットの状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Todo,
    InProgress,
    Done,
}

impl TicketStatus {
    /// 1つ先の状態を返す。`Done`の場合は`None`。
    pub fn advance(&self) -> Option<Self> {
        match self {
            Self::Todo => Some(Self::InProgress),
            Self::InProgress => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// 1つ前の状態を返す。`Todo`の場合は`None`。
    pub fn revert(&self) -> Option<Self> {
        match self {
            Self::Todo => None,
            Self::InProgress => Some(Self::Todo),
            Self::Done => Some(Self::InProgress),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        };
        f.write_str(s)
    }
}

/// チケット(todo)。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub task: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub creator_id: i64,
    #[serde(default)]
    pub assignee_ids: Vec<i64>,
    #[serde(default)]
    pub project_ids: Vec<i64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Ticket {
    /// ユーザーが作成者、または担当者かどうかを返す。
    pub fn involves(&self, user_id: i64) -> bool {
        self.creator_id == user_id || self.assignee_ids.contains(&user_id)
    }
}

/// 優先度の高い順、締め切りの早い順に比較する。締め切りのないチケットは後ろに並ぶ。
fn compare_tickets(a: &Ticket, b: &Ticket) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// 表示するチケットを並び替えて返す。
///
/// `include_hidden`が`false`の場合、アーカイブ済み、非表示のチケットは除く。
pub fn sort_for_listing(tickets: &[Ticket], include_hidden: bool) -> Vec<Ticket> {
    let mut listed: Vec<Ticket> = tickets
        .iter()
        .filter(|ticket| include_hidden || !(ticket.archived || ticket.hidden))
        .cloned()
        .collect();
    listed.sort_by(compare_tickets);
    listed
}
