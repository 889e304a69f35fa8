//! Decides whether a tracker status-change event should update a project.

use serde::Serialize;
use serde_json::Value;
use triage_core::TrackerConfig;

/// What to do with an incoming tracker event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum TriggerDecision {
    /// The payload lacks the fields needed to decide
    Invalid { reason: String },

    /// The issue moved to a status that does not warrant an update
    Ignored {
        project: String,
        issue: String,
        status: String,
    },

    /// Run a merge-mode ingestion for `project` with `query`
    Update {
        project: String,
        issue: String,
        query: String,
    },
}

fn str_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Decide from a parsed event payload.
pub fn decide(payload: &Value, tracker: &TrackerConfig) -> TriggerDecision {
    let event = str_at(payload, "/webhookEvent").unwrap_or("unknown");
    let issue = str_at(payload, "/issue/key");
    let project = str_at(payload, "/issue/fields/project/key");
    let status = str_at(payload, "/issue/fields/status/name");

    tracing::info!(
        "Received event '{}' for issue {:?} in project {:?} with status {:?}",
        event,
        issue,
        project,
        status
    );

    let (Some(issue), Some(project), Some(status)) = (issue, project, status) else {
        return TriggerDecision::Invalid {
            reason: "Invalid webhook payload: issue key, project key and status are required"
                .to_string(),
        };
    };

    if !tracker.is_closed_status(status) {
        return TriggerDecision::Ignored {
            project: project.to_string(),
            issue: issue.to_string(),
            status: status.to_string(),
        };
    }

    TriggerDecision::Update {
        project: project.to_string(),
        issue: issue.to_string(),
        query: tracker.update_query_for(project),
    }
}

/// Decide from raw payload bytes.
pub fn decide_raw(payload: &[u8], tracker: &TrackerConfig) -> TriggerDecision {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => decide(&value, tracker),
        Err(e) => TriggerDecision::Invalid {
            reason: format!("Payload is not valid JSON: {}", e),
        },
    }
}
