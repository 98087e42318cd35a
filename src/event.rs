//! Domain events for the support-request assignment lifecycle.
//!
//! Events form a closed tagged union: the codec and projector match on it
//! exhaustively, so an unhandled variant is a compile error rather than a
//! runtime surprise. Field names serialize to the wire's camelCase form and
//! each variant's tag is its dotted wire type (e.g. `"assignment.assigned"`).

use serde::{Deserialize, Serialize};

/// Well-known stream that carries all assignment-lifecycle events.
///
/// Events for different subjects are multiplexed onto this one stream and
/// demultiplexed at fold time by `revertUserId`.
pub const DEFAULT_STREAM: &str = "dashboard-actions";

/// A single event in a support request's history.
///
/// Every variant carries `revert_user_id` -- the subject user whose support
/// request is being tracked -- and an advisory `timestamp`. The timestamp is
/// caller-supplied wall-clock milliseconds and is **never** used for
/// ordering or conflict resolution; only the log-assigned record ID is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SupportEvent {
    /// An end user opened a support request.
    #[serde(rename = "support.requested")]
    SupportRequested {
        #[serde(rename = "revertUserId")]
        revert_user_id: String,
        timestamp: u64,
    },

    /// A supervisor took ownership of the subject's open request.
    ///
    /// `assigned_by_user_id` records the actor who performed the
    /// assignment when it differs from the assignee (e.g. auto-assignment
    /// by a third party). It is omitted from the wire form when absent.
    #[serde(rename = "assignment.assigned")]
    AssignmentAssigned {
        #[serde(rename = "revertUserId")]
        revert_user_id: String,
        #[serde(rename = "supervisorUserId")]
        supervisor_user_id: String,
        #[serde(
            rename = "assignedByUserId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        assigned_by_user_id: Option<String>,
        timestamp: u64,
    },

    /// The current assignment was released, returning the request to an
    /// unassigned-but-open state.
    #[serde(rename = "assignment.unassigned")]
    AssignmentUnassigned {
        #[serde(rename = "revertUserId")]
        revert_user_id: String,
        timestamp: u64,
    },

    /// The support request was closed as resolved.
    #[serde(rename = "support.resolved")]
    SupportResolved {
        #[serde(rename = "revertUserId")]
        revert_user_id: String,
        timestamp: u64,
    },

    /// A resolved request was archived.
    #[serde(rename = "support.archived")]
    SupportArchived {
        #[serde(rename = "revertUserId")]
        revert_user_id: String,
        timestamp: u64,
    },
}

impl SupportEvent {
    /// The subject user this event belongs to (the fold key).
    pub fn revert_user_id(&self) -> &str {
        match self {
            Self::SupportRequested { revert_user_id, .. }
            | Self::AssignmentAssigned { revert_user_id, .. }
            | Self::AssignmentUnassigned { revert_user_id, .. }
            | Self::SupportResolved { revert_user_id, .. }
            | Self::SupportArchived { revert_user_id, .. } => revert_user_id,
        }
    }

    /// Advisory wall-clock milliseconds stamped at publish time.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::SupportRequested { timestamp, .. }
            | Self::AssignmentAssigned { timestamp, .. }
            | Self::AssignmentUnassigned { timestamp, .. }
            | Self::SupportResolved { timestamp, .. }
            | Self::SupportArchived { timestamp, .. } => *timestamp,
        }
    }

    /// The dotted wire tag for this variant (e.g. `"assignment.assigned"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SupportRequested { .. } => "support.requested",
            Self::AssignmentAssigned { .. } => "assignment.assigned",
            Self::AssignmentUnassigned { .. } => "assignment.unassigned",
            Self::SupportResolved { .. } => "support.resolved",
            Self::SupportArchived { .. } => "support.archived",
        }
    }
}
