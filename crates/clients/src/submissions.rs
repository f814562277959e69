// crates/clients/src/submissions.rs
//! Store over the spreadsheet data service holding submission records.
//!
//! Submissions are immutable value types; every write capability lives on
//! [`SubmissionStore`] and is passed to the call site that needs it. The
//! store performs exactly one write -- applying a confirmed hour-sync.
//! Records that fail to parse are logged and skipped: malformed upstream
//! schema is absence of data, never a crash.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "spreadsheet";

/// One reviewed project submission, as read from the spreadsheet service.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub project_name: String,
    pub author_email: String,
    /// Raw declared time-tracking project keys (comma/semicolon separated).
    pub hackatime_project_keys: String,
    pub approved: bool,
    pub repo_url: String,
    /// Self-reported hours, if any.
    pub hours: Option<f64>,
    pub hours_justification: Option<String>,
    pub status: String,
}

// Spreadsheet wire shapes. Field names are the sheet's column headers.

#[derive(Debug, Default, Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: String,
    #[serde(default)]
    fields: RecordFields,
}

#[derive(Debug, Default, Deserialize)]
struct RecordFields {
    #[serde(default, rename = "Project Name")]
    project_name: String,
    #[serde(default, rename = "Email")]
    email: String,
    #[serde(default, rename = "Hackatime Project Keys")]
    hackatime_project_keys: String,
    #[serde(default, rename = "Approved")]
    approved: bool,
    #[serde(default, rename = "Code URL")]
    code_url: String,
    #[serde(default, rename = "Hours")]
    hours: Option<f64>,
    #[serde(default, rename = "Hours Justification")]
    hours_justification: Option<String>,
    #[serde(default, rename = "Status")]
    status: String,
}

impl From<Record> for Submission {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            project_name: record.fields.project_name,
            author_email: record.fields.email,
            hackatime_project_keys: record.fields.hackatime_project_keys,
            approved: record.fields.approved,
            repo_url: record.fields.code_url,
            hours: record.fields.hours,
            hours_justification: record.fields.hours_justification,
            status: record.fields.status,
        }
    }
}

/// Configuration for [`SubmissionStore`].
#[derive(Debug, Clone)]
pub struct SubmissionStoreConfig {
    /// Service root including the base id, e.g. `https://api.example.com/v0/appXXXX`.
    pub base_url: String,
    pub api_key: String,
    /// Table name holding the submissions.
    pub table: String,
}

impl SubmissionStoreConfig {
    /// Read configuration from `SPREADSHEET_BASE_URL` / `SPREADSHEET_API_KEY`
    /// / `SPREADSHEET_TABLE`.
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var("SPREADSHEET_BASE_URL")
            .map_err(|_| ClientError::config(SERVICE, "SPREADSHEET_BASE_URL is not set"))?;
        let api_key = std::env::var("SPREADSHEET_API_KEY")
            .map_err(|_| ClientError::config(SERVICE, "SPREADSHEET_API_KEY is not set"))?;
        let table =
            std::env::var("SPREADSHEET_TABLE").unwrap_or_else(|_| "Submissions".to_string());
        Ok(Self {
            base_url,
            api_key,
            table,
        })
    }
}

/// Read (and one-write) store over the spreadsheet service.
pub struct SubmissionStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SubmissionStore {
    pub fn new(config: SubmissionStoreConfig) -> ClientResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::config(SERVICE, "API key is empty"));
        }
        if !config.base_url.starts_with("http") {
            return Err(ClientError::config(
                SERVICE,
                format!("base URL is not http(s): {}", config.base_url),
            ));
        }
        if config.table.trim().is_empty() {
            return Err(ClientError::config(SERVICE, "table name is empty"));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            table: config.table,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(&self.table))
    }

    async fn fetch_records(&self, query: Option<(&str, String)>) -> ClientResult<Vec<Submission>> {
        let mut request = self.http.get(self.table_url()).bearer_auth(&self.api_key);
        if let Some((name, value)) = query {
            request = request.query(&[(name, value)]);
        }

        let response = request.send().await.map_err(|source| ClientError::Request {
            service: SERVICE,
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(SERVICE, status.as_u16(), message));
        }

        let envelope: RecordsEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::schema(SERVICE, e.to_string()))?;

        // Per-record tolerance: one malformed row must not hide the rest.
        let submissions = envelope
            .records
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Record>(value) {
                Ok(record) => Some(Submission::from(record)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed submission record");
                    None
                }
            })
            .collect();
        Ok(submissions)
    }

    /// All submissions in the review queue.
    pub async fn list(&self) -> ClientResult<Vec<Submission>> {
        self.fetch_records(None).await
    }

    /// One submission by record id. `None` when the record does not exist.
    pub async fn get(&self, id: &str) -> ClientResult<Option<Submission>> {
        let url = format!("{}/{}", self.table_url(), urlencoding::encode(id));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(SERVICE, status.as_u16(), message));
        }

        match response.json::<serde_json::Value>().await {
            Ok(value) => match serde_json::from_value::<Record>(value) {
                Ok(record) => Ok(Some(Submission::from(record))),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Malformed submission record");
                    Ok(None)
                }
            },
            Err(e) => Err(ClientError::schema(SERVICE, e.to_string())),
        }
    }

    /// All submissions by one author, for cross-submission aggregation.
    pub async fn list_by_author(&self, email: &str) -> ClientResult<Vec<Submission>> {
        let formula = format!("{{Email}}='{}'", email.replace('\'', "\\'"));
        self.fetch_records(Some(("filterByFormula", formula))).await
    }

    /// Write a confirmed hour-sync back to the submission record. The one
    /// write this core performs against the spreadsheet service.
    pub async fn apply_hour_sync(
        &self,
        id: &str,
        hours: f64,
        justification: &str,
    ) -> ClientResult<()> {
        let url = format!("{}/{}", self.table_url(), urlencoding::encode(id));
        let body = serde_json::json!({
            "fields": {
                "Hours": hours,
                "Hours Justification": justification,
            }
        });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(SERVICE, status.as_u16(), message));
        }

        tracing::info!(id = %id, hours, "Applied hour-sync to submission");
        Ok(())
    }
}
