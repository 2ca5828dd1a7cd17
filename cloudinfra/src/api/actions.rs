//! Action API implementation
//!
//! Asynchronous operations (server and load balancer provisioning) return an
//! action that is polled until it reports a finish time.

use super::{ApiError, Client};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfkit::Context;

pub const ACTION_STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub id: i64,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

impl Action {
    /// An action is complete once the API records when it finished
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some(ACTION_STATUS_ERROR)
    }

    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(err) => format!("{}: {}", err.code, err.message),
            None => "action reported status 'error'".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    action: Action,
}

pub struct ActionsApi<'a> {
    client: &'a Client,
}

impl<'a> ActionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /actions/{id}
    pub async fn get(&self, ctx: &Context, id: i64) -> Result<Action, ApiError> {
        let envelope: ActionEnvelope = self
            .client
            .get(ctx, &format!("/actions/{}", id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_at_marks_completion() {
        let action: Action = serde_json::from_str(
            r#"{"id":1,"status":"success","finished_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(action.is_finished());
        assert!(!action.is_failed());

        let running: Action = serde_json::from_str(r#"{"id":1,"status":"running"}"#).unwrap();
        assert!(!running.is_finished());
    }

    #[test]
    fn failure_message_uses_error_details() {
        let action: Action = serde_json::from_str(
            r#"{"id":1,"status":"error","error":{"code":"no_capacity","message":"location full"}}"#,
        )
        .unwrap();
        assert!(action.is_failed());
        assert_eq!(action.failure_message(), "no_capacity: location full");
    }
}
