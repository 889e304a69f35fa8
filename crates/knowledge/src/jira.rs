//! Jira adapter for [`TicketSource`].
//!
//! Jira REST API v2 search: <https://developer.atlassian.com/cloud/jira/platform/rest/v2/>

use crate::source::{TicketPage, TicketSource};
use crate::types::TicketRecord;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use triage_core::{AppError, AppResult, TrackerConfig, TrackerCredentials};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    total: usize,
}

/// Ticket source backed by a Jira instance.
pub struct JiraSource {
    client: reqwest::Client,
    base_url: String,
    credentials: TrackerCredentials,
    root_cause_field: String,
    root_cause_category_field: String,
}

impl JiraSource {
    /// Create a source for `https://<tracker.domain>`.
    pub fn new(tracker: &TrackerConfig, credentials: TrackerCredentials) -> AppResult<Self> {
        let domain = tracker.domain.as_deref().ok_or_else(|| {
            AppError::Config("Tracker domain is not configured".to_string())
        })?;
        Self::with_base_url(format!("https://{}", domain), tracker, credentials)
    }

    /// Create a source against an explicit base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        tracker: &TrackerConfig,
        credentials: TrackerCredentials,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(tracker.timeout))
            .build()
            .map_err(|e| AppError::Source(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            root_cause_field: tracker.root_cause_field.clone(),
            root_cause_category_field: tracker.root_cause_category_field.clone(),
        })
    }

    fn field_list(&self) -> String {
        format!(
            "summary,description,comment,labels,{},{},status,resolution",
            self.root_cause_field, self.root_cause_category_field
        )
    }

    fn map_issue(&self, issue: &Value) -> Option<TicketRecord> {
        let key = issue.get("key")?.as_str()?;
        let fields = issue.get("fields").unwrap_or(&Value::Null);

        let comments = fields
            .pointer("/comment/comments")
            .and_then(Value::as_array)
            .map(|comments| {
                comments
                    .iter()
                    .filter_map(|c| c.get("body").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .unwrap_or_default();

        let labels = fields
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(TicketRecord {
            ticket_id: key.to_string(),
            summary: text_field(fields.get("summary")),
            description: text_field(fields.get("description")),
            root_cause: text_field(fields.get(&self.root_cause_field)),
            root_cause_category: text_field(fields.get(&self.root_cause_category_field)),
            labels,
            comments,
            status: text_field(fields.get("status")),
            resolution: text_field(fields.get("resolution")),
        })
    }
}

/// Flatten a Jira field to text: strings as-is, option objects by `value`
/// or `name`, everything missing or null as "".
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => obj
            .get("value")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl TicketSource for JiraSource {
    fn name(&self) -> &str {
        "jira"
    }

    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn search_page(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> AppResult<TicketPage> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let start_at = start_at.to_string();
        let max_results = max_results.to_string();
        let fields = self.field_list();

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header("Accept", "application/json")
            .query(&[
                ("jql", query),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", fields.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Source(format!("Failed to reach Jira: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Source(format!("Jira search failed ({}): {}", status, body)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Source(format!("Failed to parse Jira response: {}", e)))?;

        let tickets: Vec<TicketRecord> = body
            .issues
            .iter()
            .filter_map(|issue| {
                let mapped = self.map_issue(issue);
                if mapped.is_none() {
                    tracing::warn!("Skipping Jira issue without a key");
                }
                mapped
            })
            .collect();

        tracing::debug!("Jira returned {} issues (total {})", tickets.len(), body.total);

        Ok(TicketPage {
            tickets,
            total: body.total,
        })
    }
}
