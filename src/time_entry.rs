use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::compute_duration;

/// 開始・終了がどこから設定されたかを表す。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Website,
    Chip,
    #[serde(rename = "API")]
    Api,
}

/// time entryに紐づくプロジェクト。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub customer: Option<String>,
}

/// 1件の作業時間の記録。
///
/// `end`が`None`の場合は計測中を表す。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: i64,
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub break_minutes: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    pub start_type: Provenance,
    #[serde(default)]
    pub end_type: Option<Provenance>,
    /// サーバー側で保存されている経過時間。参考値であり集計には利用しない。
    #[serde(default)]
    pub time: Option<String>,
}

impl TimeEntry {
    /// 計測中かどうかを返す。
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// 休憩を差し引いた経過時間を`HH:MM:SS`で返す。
    ///
    /// 計測中、または終了が開始より前になる不正なentryの場合は`None`を返す。
    pub fn elapsed(&self) -> Option<String> {
        let end = self.end?;
        compute_duration(&self.start, &end, Some(self.break_minutes))
    }

    /// プロジェクト名を返す。未設定の場合は空文字列。
    pub fn project_name(&self) -> &str {
        self.project
            .as_ref()
            .map(|project| project.name.as_str())
            .unwrap_or_default()
    }
}
