//! Provider-side actions and their status.

use serde::Serialize;
use std::fmt;

/// Status of an asynchronous provider action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Submitted, no status reported yet
    Accepted,
    Running,
    Success,
    Error,
    /// The provider reported something we do not understand
    Unknown,
}

impl ActionStatus {
    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "running" => Self::Running,
            "success" => Self::Success,
            "error" => Self::Error,
            other => {
                tracing::warn!("Unknown action status: {}", other);
                Self::Unknown
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Polling stops on terminal and unknown statuses
    pub fn ends_polling(&self) -> bool {
        self.is_terminal() || matches!(self, Self::Unknown)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Accepted => "◯",
            Self::Running => "↻",
            Self::Success => "✓",
            Self::Error => "✗",
            Self::Unknown => "?",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action created by a snapshot request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: u64,
    pub resource_id: u64,
    pub status: ActionStatus,
    /// Provider error message of a failed action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status polls issued so far
    pub polls: u32,
}

impl Action {
    pub fn new(id: u64, resource_id: u64, status: ActionStatus) -> Self {
        Self {
            id,
            resource_id,
            status,
            error: None,
            polls: 0,
        }
    }

    /// Move to `next`; returns false if the action already settled
    pub fn advance(&mut self, next: ActionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_lifecycle() {
        let mut action = Action::new(77, 1, ActionStatus::Accepted);
        assert!(!action.status.ends_polling());

        assert!(action.advance(ActionStatus::Running));
        assert_eq!(action.status, ActionStatus::Running);

        assert!(action.advance(ActionStatus::Success));
        assert!(action.status.is_terminal());
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut action = Action::new(1, 1, ActionStatus::Error);
        assert!(!action.advance(ActionStatus::Running));
        assert!(!action.advance(ActionStatus::Success));
        assert_eq!(action.status, ActionStatus::Error);
    }

    #[test]
    fn test_status_from_provider() {
        assert_eq!(ActionStatus::from_provider("running"), ActionStatus::Running);
        assert_eq!(ActionStatus::from_provider("SUCCESS"), ActionStatus::Success);
        assert_eq!(ActionStatus::from_provider("error"), ActionStatus::Error);
        assert_eq!(ActionStatus::from_provider("paused"), ActionStatus::Unknown);
    }

    #[test]
    fn test_unknown_ends_polling_without_being_terminal() {
        assert!(ActionStatus::Unknown.ends_polling());
        assert!(!ActionStatus::Unknown.is_terminal());
        assert_eq!(ActionStatus::Unknown.icon(), "?");
    }
}
