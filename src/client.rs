use std::{env, fs, path::Path};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};

use crate::access::User;
use crate::ticket::{Ticket, TicketStatus};
use crate::time_entry::TimeEntry;

const DEFAULT_API_URL: &str = "http://localhost:3000";

/// チケットの部分更新。`None`の項目は送信しない。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// 作業時間アプリのデータにアクセスするためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkTimeRepository: Send + Sync {
    /// ログイン中のユーザーを取得する。
    async fn current_user(&self) -> Result<User>;

    /// 指定した期間に開始したタイムエントリーを取得する。
    ///
    /// # Arguments
    ///
    /// * `start_at` - 取得するタイムエントリーの開始日時
    /// * `end_at` - 取得するタイムエントリーの終了日時
    /// * `user_id` - 対象のユーザー。`None`の場合はログイン中のユーザー
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
        user_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>>;

    /// チケットを取得する。
    async fn read_tickets(&self) -> Result<Vec<Ticket>>;

    /// チケットを更新し、更新後のチケットを返す。
    async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<Ticket>;
}

/// 作業時間アプリのAPIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = ApiClient::new().unwrap();
/// let time_entries = client.read_time_entries(&start_at, &end_at, None).await.unwrap();
/// ```
pub struct ApiClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl ApiClient {
    /// 新しい`ApiClient`を返す。
    ///
    /// 環境変数`WORKTIME_API_TOKEN`が設定されていない場合はエラーを返す。
    /// 接続先は`WORKTIME_API_URL`で変更できる。
    pub fn new() -> Result<Self> {
        let api_token = env::var("WORKTIME_API_TOKEN").context("WORKTIME_API_TOKEN must be set")?;
        let api_url = env::var("WORKTIME_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self::with_base_url(api_url, api_token))
    }

    /// 接続先とトークンを指定して`ApiClient`を返す。
    pub fn with_base_url(api_url: String, api_token: String) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.api_token)
            .header(CONTENT_TYPE, "application/json")
    }
}

#[async_trait]
impl WorkTimeRepository for ApiClient {
    async fn current_user(&self) -> Result<User> {
        let user = self
            .get("/api/users/me")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<User>()
            .await
            .context("Failed to deserialize user")?;
        debug!("Signed in as {} ({:?})", user.tag, user.role);

        Ok(user)
    }

    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
        user_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>> {
        let mut query = vec![
            ("from", start_at.to_rfc3339()),
            ("to", end_at.to_rfc3339()),
        ];
        if let Some(user_id) = user_id {
            query.push(("userId", user_id.to_string()));
        }

        let time_entries = self
            .get("/api/times")
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<TimeEntry>>()
            .await
            .context("Failed to deserialize time entries")?;
        info!("Number of time entries: {}", time_entries.len());

        Ok(time_entries)
    }

    async fn read_tickets(&self) -> Result<Vec<Ticket>> {
        let tickets = self
            .get("/api/todos")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<Ticket>>()
            .await
            .context("Failed to deserialize tickets")?;

        Ok(tickets)
    }

    async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<Ticket> {
        let ticket = self
            .client
            .patch(format!("{}/api/todos/{}", self.api_url, id))
            .bearer_auth(&self.api_token)
            .json(update)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .with_context(|| format!("Failed to update ticket {}", id))?
            .json::<Ticket>()
            .await
            .context("Failed to deserialize ticket")?;
        info!("Updated ticket {}: {:?}", id, update);

        Ok(ticket)
    }
}

/// エクスポートされたJSONファイルの構造。
#[derive(Debug, Deserialize)]
struct Snapshot {
    user: User,
    #[serde(default)]
    times: Vec<TimeEntry>,
    #[serde(default)]
    todos: Vec<Ticket>,
}

/// エクスポートされたJSONファイルを読み込む、読み取り専用のリポジトリ。
pub struct JsonFileRepository {
    snapshot: Snapshot,
}

impl JsonFileRepository {
    /// JSONファイルを読み込んで`JsonFileRepository`を返す。
    pub fn open(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn from_json(contents: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(contents)?;
        info!(
            "Loaded {} time entries and {} tickets",
            snapshot.times.len(),
            snapshot.todos.len()
        );

        Ok(Self { snapshot })
    }
}

#[async_trait]
impl WorkTimeRepository for JsonFileRepository {
    async fn current_user(&self) -> Result<User> {
        Ok(self.snapshot.user.clone())
    }

    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
        user_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>> {
        let user_id = user_id.unwrap_or(self.snapshot.user.id);
        let time_entries = self
            .snapshot
            .times
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter(|entry| entry.start >= *start_at && entry.start < *end_at)
            .cloned()
            .collect();

        Ok(time_entries)
    }

    async fn read_tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self.snapshot.todos.clone())
    }

    async fn update_ticket(&self, id: i64, _update: &TicketUpdate) -> Result<Ticket> {
        bail!("Cannot update ticket {}: the JSON file repository is read-only", id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use once_cell::sync::Lazy;

    use super::{ApiClient, JsonFileRepository, TicketUpdate, WorkTimeRepository};
    use crate::access::Role;
    use crate::ticket::TicketStatus;

    static USER_JSON: Lazy<String> = Lazy::new(|| {
        r#"{"id": 3, "tag": "jd", "name": "Jane Doe", "email": "jane@example.com", "role": "user", "chips": []}"#
            .to_string()
    });

    static SNAPSHOT_JSON: Lazy<String> = Lazy::new(|| {
        format!(
            r#"{{
                "user": {},
                "times": [
                    {{"id": 1, "userId": 3, "start": "2024-01-15T09:00:00Z", "end": "2024-01-15T10:00:00Z", "startType": "Website"}},
                    {{"id": 2, "userId": 4, "start": "2024-01-15T09:00:00Z", "end": null, "startType": "Chip"}},
                    {{"id": 3, "userId": 3, "start": "2024-02-01T00:00:00Z", "end": null, "startType": "API"}}
                ],
                "todos": [
                    {{"id": 9, "task": "Backup", "priority": "LOW", "status": "TODO", "creatorId": 3}}
                ]
            }}"#,
            *USER_JSON
        )
    });

    #[tokio::test]
    async fn test_current_user_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users/me")
            .match_header("authorization", "Bearer secret")
            .with_header("content-type", "application/json")
            .with_body(USER_JSON.as_str())
            .create_async()
            .await;
        let client = ApiClient::with_base_url(server.url(), "secret".to_string());

        let user = client.current_user().await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.tag, "jd");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_read_time_entries_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/times")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("from".into(), "2024-01-01T00:00:00+00:00".into()),
                Matcher::UrlEncoded("to".into(), "2024-02-01T00:00:00+00:00".into()),
                Matcher::UrlEncoded("userId".into(), "4".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": 2, "userId": 4, "start": "2024-01-15T09:00:00Z", "end": null, "startType": "Chip"}]"#)
            .create_async()
            .await;
        let client = ApiClient::with_base_url(format!("{}/", server.url()), "secret".to_string());
        let start_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let entries = client
            .read_time_entries(&start_at, &end_at, Some(4))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_running());
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/todos")
            .with_status(401)
            .create_async()
            .await;
        let client = ApiClient::with_base_url(server.url(), "wrong".to_string());

        let result = client.read_tickets().await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_ticket_sends_only_changed_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/todos/9")
            .match_body(Matcher::JsonString(r#"{"status": "IN_PROGRESS"}"#.to_string()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 9, "task": "Backup", "priority": "LOW", "status": "IN_PROGRESS", "creatorId": 3}"#)
            .create_async()
            .await;
        let client = ApiClient::with_base_url(server.url(), "secret".to_string());
        let update = TicketUpdate {
            status: Some(TicketStatus::InProgress),
            ..TicketUpdate::default()
        };

        let ticket = client.update_ticket(9, &update).await.unwrap();

        mock.assert_async().await;
        assert_eq!(ticket.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn test_json_file_repository_filters_entries() {
        let repository = JsonFileRepository::from_json(&SNAPSHOT_JSON).unwrap();
        let start_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mine = repository
            .read_time_entries(&start_at, &end_at, None)
            .await
            .unwrap();
        let theirs = repository
            .read_time_entries(&start_at, &end_at, Some(4))
            .await
            .unwrap();

        assert_eq!(mine.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(theirs.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_json_file_repository_is_read_only() {
        let repository = JsonFileRepository::from_json(&SNAPSHOT_JSON).unwrap();

        assert_eq!(repository.read_tickets().await.unwrap().len(), 1);
        assert!(repository
            .update_ticket(9, &TicketUpdate::default())
            .await
            .is_err());
    }
}
