//! Snapshot orchestration
//!
//! Creates one snapshot per server and optionally waits for the resulting
//! actions to settle. Every server gets an [`OutcomeRecord`]; a failure on one
//! server never stops the others.
//!
//! # Module Structure
//!
//! - [`action`] - Provider action status model

pub mod action;

pub use action::{Action, ActionStatus};

use crate::error::FetchError;
use crate::hcloud::client::HcloudClient;
use crate::resource::{Resource, Server};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Attached to 403 rejections
pub const WRITE_SCOPE_HINT: &str = "token lacks write scope";

/// How a snapshot run behaves
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Prepended to the server name to form the snapshot description
    pub description_prefix: String,
    /// Snapshot running servers without shutting them down first
    pub force: bool,
    pub labels: BTreeMap<String, String>,
    /// Record intent only, send nothing
    pub dry_run: bool,
    /// Poll each action until it settles
    pub wait: bool,
    pub poll_interval: Duration,
    /// Give up waiting after this long, keeping the last known status
    pub max_wait: Option<Duration>,
    /// Give up waiting after this many polls
    pub max_polls: Option<u32>,
    /// Servers processed at the same time
    pub concurrency: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            description_prefix: "snapshot-".to_string(),
            force: false,
            labels: BTreeMap::new(),
            dry_run: false,
            wait: false,
            poll_interval: Duration::from_millis(2000),
            max_wait: Some(Duration::from_secs(600)),
            max_polls: None,
            concurrency: 4,
        }
    }
}

impl SnapshotOptions {
    pub fn description_for(&self, server: &Server) -> String {
        format!("{}{}", self.description_prefix, server.display_name())
    }

    /// Body of the `create_image` request
    pub fn request_body(&self, description: &str) -> Value {
        let mut body = Map::new();
        body.insert("description".to_string(), json!(description));
        body.insert("type".to_string(), json!("snapshot"));
        if self.force {
            body.insert("force".to_string(), json!(true));
        }
        if !self.labels.is_empty() {
            body.insert("labels".to_string(), json!(self.labels));
        }
        Value::Object(body)
    }
}

/// What happened to one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Dry run: the request that would have been sent
    DryRun,
    /// Accepted by the provider
    Submitted {
        action: Action,
        image_id: Option<u64>,
        /// Waiting stopped before the action settled
        timed_out: bool,
    },
    /// The provider refused the request
    Rejected {
        status: u16,
        message: Option<String>,
        hint: Option<&'static str>,
    },
    /// Transport failure or unreadable response
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub server_id: u64,
    pub server_name: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl OutcomeRecord {
    /// The snapshot request itself did not go through
    pub fn is_submission_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Rejected { .. } | Outcome::Failed { .. })
    }

    pub fn action(&self) -> Option<&Action> {
        match &self.outcome {
            Outcome::Submitted { action, .. } => Some(action),
            _ => None,
        }
    }
}

/// Counts per outcome class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub dry_run: usize,
    pub submitted: usize,
    pub succeeded: usize,
    pub action_errors: usize,
    pub unsettled: usize,
    pub submission_failures: usize,
}

impl RunSummary {
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            match &record.outcome {
                Outcome::DryRun => summary.dry_run += 1,
                Outcome::Submitted { action, .. } => {
                    summary.submitted += 1;
                    match action.status {
                        ActionStatus::Success => summary.succeeded += 1,
                        ActionStatus::Error => summary.action_errors += 1,
                        _ => summary.unsettled += 1,
                    }
                }
                Outcome::Rejected { .. } | Outcome::Failed { .. } => {
                    summary.submission_failures += 1
                }
            }
        }

        summary
    }

    pub fn has_submission_failures(&self) -> bool {
        self.submission_failures > 0
    }
}

/// Snapshot every server in `servers`
///
/// Records come back in input order regardless of completion order.
pub async fn run(
    client: &HcloudClient,
    servers: &[Server],
    options: &SnapshotOptions,
) -> Vec<OutcomeRecord> {
    tracing::info!(
        "Snapshotting {} servers (dry run: {}, wait: {}, concurrency: {})",
        servers.len(),
        options.dry_run,
        options.wait,
        options.concurrency
    );

    let mut indexed: Vec<(usize, OutcomeRecord)> = stream::iter(servers.iter().enumerate())
        .map(|(idx, server)| async move { (idx, process_server(client, server, options).await) })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, record)| record).collect()
}

async fn process_server(
    client: &HcloudClient,
    server: &Server,
    options: &SnapshotOptions,
) -> OutcomeRecord {
    let description = options.description_for(server);

    let outcome = if options.dry_run {
        tracing::info!("[dry run] would snapshot {} as '{}'", server.display_name(), description);
        Outcome::DryRun
    } else {
        let mut outcome = submit(client, server, &description, options).await;
        if options.wait {
            if let Outcome::Submitted {
                action, timed_out, ..
            } = &mut outcome
            {
                *timed_out = wait_for_action(client, action, options).await;
            }
        }
        outcome
    };

    OutcomeRecord {
        server_id: server.id,
        server_name: server.display_name(),
        description,
        outcome,
    }
}

async fn submit(
    client: &HcloudClient,
    server: &Server,
    description: &str,
    options: &SnapshotOptions,
) -> Outcome {
    let path = HcloudClient::create_image_path(server.id);
    let body = options.request_body(description);

    let response = match client.post(&path, &body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Snapshot request for {} failed: {}", server.display_name(), e);
            return Outcome::Failed {
                error: e.to_string(),
            };
        }
    };

    if !response.is_success() {
        let status = response.status.as_u16();
        let hint = (status == 403).then_some(WRITE_SCOPE_HINT);
        tracing::warn!(
            "Snapshot of {} rejected with {}",
            server.display_name(),
            status
        );
        return Outcome::Rejected {
            status,
            message: response.error_message(),
            hint,
        };
    }

    let Some(action_id) = response
        .body
        .get("action")
        .and_then(|a| a.get("id"))
        .and_then(|id| id.as_u64())
    else {
        return Outcome::Failed {
            error: "response did not contain an action id".to_string(),
        };
    };

    // Unrecognised initial statuses are left for the poll loop to classify
    let status = match response
        .body
        .get("action")
        .and_then(|a| a.get("status"))
        .and_then(|s| s.as_str())
        .map(ActionStatus::from_provider)
    {
        Some(ActionStatus::Unknown) | None => ActionStatus::Accepted,
        Some(status) => status,
    };
    let image_id = response
        .body
        .get("image")
        .and_then(|i| i.get("id"))
        .and_then(|id| id.as_u64());

    tracing::info!(
        "Snapshot of {} submitted: action {}, image {:?}",
        server.display_name(),
        action_id,
        image_id
    );

    Outcome::Submitted {
        action: Action::new(action_id, server.id, status),
        image_id,
        timed_out: false,
    }
}

/// Poll `action` until it settles or the wait budget runs out
///
/// Returns true when waiting stopped on the budget with the action unsettled.
async fn wait_for_action(client: &HcloudClient, action: &mut Action, options: &SnapshotOptions) -> bool {
    let exhausted = match options.max_wait {
        Some(max_wait) => tokio::time::timeout(max_wait, poll_until_settled(client, action, options))
            .await
            .unwrap_or(true),
        None => poll_until_settled(client, action, options).await,
    };

    if exhausted {
        tracing::warn!(
            "Gave up waiting for action {} after {} polls (last status: {})",
            action.id,
            action.polls,
            action.status
        );
    }
    exhausted
}

/// Returns true when `max_polls` ran out first
async fn poll_until_settled(client: &HcloudClient, action: &mut Action, options: &SnapshotOptions) -> bool {
    while !action.status.ends_polling() {
        if options.max_polls.is_some_and(|max| action.polls >= max) {
            return true;
        }

        tokio::time::sleep(options.poll_interval).await;
        action.polls += 1;

        match fetch_action(client, action.id).await {
            Ok((status, error)) => {
                tracing::debug!("action {} poll {}: {}", action.id, action.polls, status);
                action.advance(status);
                if error.is_some() {
                    action.error = error;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to poll action {}: {}", action.id, e);
                action.advance(ActionStatus::Unknown);
            }
        }
    }
    false
}

async fn fetch_action(client: &HcloudClient, action_id: u64) -> Result<(ActionStatus, Option<String>), FetchError> {
    let body = client.get_json(&HcloudClient::action_path(action_id), &[]).await?;
    let action = body
        .get("action")
        .ok_or_else(|| FetchError::Decode("missing 'action' object".to_string()))?;

    let status = action
        .get("status")
        .and_then(|s| s.as_str())
        .map(ActionStatus::from_provider)
        .unwrap_or(ActionStatus::Unknown);
    let error = action
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string());

    Ok((status, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NamedRef;

    fn server(id: u64, name: Option<&str>) -> Server {
        Server {
            id,
            name: name.map(|n| n.to_string()),
            server_type: NamedRef {
                name: "cx22".to_string(),
            },
            datacenter: None,
            backup_window: None,
        }
    }

    #[test]
    fn test_description_uses_prefix_and_display_name() {
        let options = SnapshotOptions {
            description_prefix: "nightly-".to_string(),
            ..Default::default()
        };
        assert_eq!(options.description_for(&server(1, Some("web"))), "nightly-web");
        assert_eq!(options.description_for(&server(2, None)), "nightly-server-2");
    }

    #[test]
    fn test_request_body_omits_force_unless_set() {
        let options = SnapshotOptions::default();
        assert_eq!(
            options.request_body("snapshot-web"),
            json!({"description": "snapshot-web", "type": "snapshot"})
        );

        let mut labels = BTreeMap::new();
        labels.insert("managed-by".to_string(), "hcfleet".to_string());
        let forced = SnapshotOptions {
            force: true,
            labels,
            ..Default::default()
        };
        assert_eq!(
            forced.request_body("snapshot-web"),
            json!({
                "description": "snapshot-web",
                "type": "snapshot",
                "force": true,
                "labels": {"managed-by": "hcfleet"}
            })
        );
    }

    #[test]
    fn test_summary_counts_each_outcome_class() {
        let record = |outcome| OutcomeRecord {
            server_id: 1,
            server_name: "web".to_string(),
            description: "snapshot-web".to_string(),
            outcome,
        };
        let records = vec![
            record(Outcome::DryRun),
            record(Outcome::Submitted {
                action: Action::new(1, 1, ActionStatus::Success),
                image_id: Some(9),
                timed_out: false,
            }),
            record(Outcome::Submitted {
                action: Action::new(2, 1, ActionStatus::Running),
                image_id: None,
                timed_out: true,
            }),
            record(Outcome::Rejected {
                status: 403,
                message: None,
                hint: Some(WRITE_SCOPE_HINT),
            }),
            record(Outcome::Failed {
                error: "connection reset".to_string(),
            }),
        ];

        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.dry_run, 1);
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.unsettled, 1);
        assert_eq!(summary.submission_failures, 2);
        assert!(summary.has_submission_failures());
        assert!(records[3].is_submission_failure());
        assert!(records[1].action().is_some());
    }

    #[test]
    fn test_dry_run_summary_is_not_a_failure() {
        let records = vec![OutcomeRecord {
            server_id: 1,
            server_name: "web".to_string(),
            description: "snapshot-web".to_string(),
            outcome: Outcome::DryRun,
        }];
        assert!(!RunSummary::from_records(&records).has_submission_failures());
    }
}
