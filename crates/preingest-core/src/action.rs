//! Result payload and lifecycle event model.
//!
//! A [`ResultPayload`] is the in-memory outcome of one step execution. It is
//! the unit carried by every [`PreingestEvent`]; the notifier broadcasts it
//! and the action store derives its rows from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PreingestError;

// ---------------------------------------------------------------------------
// ActionPhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of an action.
///
/// Transitions: `Started → Executing* → Completed | Failed`
///
/// The phase tracks whether the step ran to completion. Whether the thing it
/// checked passed is carried by [`ActionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPhase {
    Started,
    Executing,
    Completed,
    Failed,
}

impl ActionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPhase::Started => "Started",
            ActionPhase::Executing => "Executing",
            ActionPhase::Completed => "Completed",
            ActionPhase::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionPhase::Completed | ActionPhase::Failed)
    }
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionPhase {
    type Err = PreingestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Started" => Ok(ActionPhase::Started),
            "Executing" => Ok(ActionPhase::Executing),
            "Completed" => Ok(ActionPhase::Completed),
            "Failed" => Ok(ActionPhase::Failed),
            other => Err(PreingestError::Store(format!("unknown action phase: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionResult
// ---------------------------------------------------------------------------

/// Logical outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionResult {
    /// The check ran and passed.
    Success,
    /// The check ran and the checked value did not pass.
    Error,
    /// The check could not be performed.
    Failed,
}

impl ActionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionResult::Success => "Success",
            ActionResult::Error => "Error",
            ActionResult::Failed => "Failed",
        }
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionResult {
    type Err = PreingestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(ActionResult::Success),
            "Error" => Ok(ActionResult::Error),
            "Failed" => Ok(ActionResult::Failed),
            other => Err(PreingestError::Store(format!("unknown action result: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Processed / accepted / rejected counts of one action.
///
/// All three set to `-1` means the counts could not be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub processed: i64,
    pub accepted: i64,
    pub rejected: i64,
}

impl Summary {
    pub const UNAVAILABLE: Summary = Summary {
        processed: -1,
        accepted: -1,
        rejected: -1,
    };

    pub fn new(processed: i64, accepted: i64, rejected: i64) -> Self {
        Self {
            processed,
            accepted,
            rejected,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::UNAVAILABLE
    }
}

// ---------------------------------------------------------------------------
// ActionProperties / ResultPayload
// ---------------------------------------------------------------------------

/// Identity and metadata of one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionProperties {
    pub process_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub description: String,
    pub creation: DateTime<Utc>,
    #[serde(default)]
    pub result_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub properties: ActionProperties,
    /// `None` until the step reaches a terminal phase.
    pub result: Option<ActionResult>,
    pub summary: Summary,
    pub messages: Vec<String>,
    pub action_data: Vec<String>,
}

impl ResultPayload {
    pub fn new(properties: ActionProperties) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    pub fn process_id(&self) -> Uuid {
        self.properties.process_id
    }

    pub fn session_id(&self) -> Uuid {
        self.properties.session_id
    }
}

// ---------------------------------------------------------------------------
// PreingestEvent
// ---------------------------------------------------------------------------

/// One lifecycle notification, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreingestEvent {
    pub description: String,
    pub initiate: DateTime<Utc>,
    pub action_type: ActionPhase,
    pub preingest_action: ResultPayload,
}

impl PreingestEvent {
    pub fn process_id(&self) -> Uuid {
        self.preingest_action.process_id()
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One row of an action's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status_id: i64,
    pub process_id: Uuid,
    pub name: ActionPhase,
    pub creation: DateTime<Utc>,
    pub message: String,
}

/// An action as persisted by the store, with its status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub process_id: Uuid,
    pub folder_session_id: Uuid,
    pub name: String,
    pub description: String,
    pub creation: DateTime<Utc>,
    pub result_files: Vec<String>,
    /// Unset while the action is still running.
    pub action_status: Option<ActionResult>,
    pub statistics_summary: Option<Summary>,
    pub status: Vec<StatusEntry>,
}

impl ActionRecord {
    /// The most recent lifecycle phase, if any status was recorded.
    pub fn last_phase(&self) -> Option<ActionPhase> {
        self.status.last().map(|s| s.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!ActionPhase::Started.is_terminal());
        assert!(!ActionPhase::Executing.is_terminal());
        assert!(ActionPhase::Completed.is_terminal());
        assert!(ActionPhase::Failed.is_terminal());
    }

    #[test]
    fn phase_and_result_parse_their_display_form() {
        for phase in [
            ActionPhase::Started,
            ActionPhase::Executing,
            ActionPhase::Completed,
            ActionPhase::Failed,
        ] {
            assert_eq!(phase.to_string().parse::<ActionPhase>().unwrap(), phase);
        }
        for result in [ActionResult::Success, ActionResult::Error, ActionResult::Failed] {
            assert_eq!(result.to_string().parse::<ActionResult>().unwrap(), result);
        }
        assert!("Pending".parse::<ActionResult>().is_err());
    }

    #[test]
    fn unavailable_summary_is_all_minus_one() {
        assert!(Summary::UNAVAILABLE.is_unavailable());
        assert_eq!(Summary::UNAVAILABLE, Summary::new(-1, -1, -1));
        assert!(!Summary::new(1, 1, 0).is_unavailable());
    }

    #[test]
    fn event_json_uses_wire_field_names() {
        let event = PreingestEvent {
            description: "Checksum calculation is done.".into(),
            initiate: Utc::now(),
            action_type: ActionPhase::Completed,
            preingest_action: ResultPayload {
                result: Some(ActionResult::Success),
                summary: Summary::new(1, 1, 0),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action_type"], "Completed");
        assert_eq!(json["preingest_action"]["result"], "Success");
        assert_eq!(json["preingest_action"]["summary"]["accepted"], 1);
    }
}
