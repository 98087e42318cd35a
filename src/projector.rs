//! Support-state projection: pure fold of a subject's event history.
//!
//! State is never stored; it is always re-derived from the log. The fold
//! is total and deterministic -- the same event sequence always yields
//! the same state -- which is what lets any number of projector
//! instances run concurrently over the same stream with no coordination.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::LogError;
use crate::event::{DEFAULT_STREAM, SupportEvent};
use crate::log::{EventLog, RecordId};

/// Current support status of a subject, derived from its event history.
///
/// `Active` records the current owner. Ownership disputes are settled by
/// log order alone: whichever `assignment.assigned` record the log
/// ordered last wins, regardless of the events' advisory timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportState {
    /// No support request exists for this subject.
    #[default]
    None,
    /// A request is open and waiting for a supervisor.
    Pending,
    /// A supervisor currently owns the request.
    Active {
        /// The current owner.
        supervisor_user_id: String,
    },
    /// The request was closed as resolved.
    Resolved,
    /// The resolved request was archived. Terminal.
    Archived,
}

impl SupportState {
    /// Short lowercase label, used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Active { .. } => "active",
            Self::Resolved => "resolved",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for SupportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply a single event to a state, producing the next state.
///
/// Pure and total: transitions that make no sense from the current state
/// (an unassign while nothing is assigned, a resolve of an already
/// closed request) leave the state unchanged instead of failing. This is
/// what makes replays and at-least-once duplicate deliveries safe.
///
/// The caller is responsible for only feeding events that belong to the
/// subject whose state is being folded, in log order.
pub fn step(state: SupportState, event: &SupportEvent) -> SupportState {
    match event {
        SupportEvent::SupportRequested { .. } => SupportState::Pending,
        SupportEvent::AssignmentAssigned {
            supervisor_user_id, ..
        } => match state {
            // Assigning onto an already-active request is a reassignment:
            // the newer record overwrites the owner (last-writer-wins).
            SupportState::Pending | SupportState::Active { .. } => SupportState::Active {
                supervisor_user_id: supervisor_user_id.clone(),
            },
            other => other,
        },
        SupportEvent::AssignmentUnassigned { .. } => match state {
            SupportState::Active { .. } => SupportState::Pending,
            // Idempotent no-op: duplicates and retries within a delivery
            // window may unassign something already unassigned or closed.
            other => other,
        },
        SupportEvent::SupportResolved { .. } => match state {
            SupportState::Pending | SupportState::Active { .. } => SupportState::Resolved,
            other => other,
        },
        SupportEvent::SupportArchived { .. } => match state {
            SupportState::Resolved => SupportState::Archived,
            other => other,
        },
    }
}

/// Fold an ordered event sequence into the subject's current state.
///
/// Events for other subjects are filtered out, so a full multiplexed
/// stream can be passed directly. The input order must be log order
/// (ascending record id); timestamps play no part. An empty history
/// yields [`SupportState::None`].
pub fn project<'a, I>(revert_user_id: &str, events: I) -> SupportState
where
    I: IntoIterator<Item = &'a SupportEvent>,
{
    events
        .into_iter()
        .filter(|event| event.revert_user_id() == revert_user_id)
        .fold(SupportState::default(), step)
}

/// Catch-up projector maintaining per-subject state over a stream.
///
/// Holds a resume cursor (the last record id it has seen) and a map of
/// subject states. [`catch_up`](StatusProjector::catch_up) reads records
/// after the cursor, decodes each one, and folds it in; malformed
/// records are skipped with a warning so one corrupt record cannot halt
/// all future state derivation. A projector restarted from any
/// previously observed cursor re-derives identical state, because the
/// fold is deterministic and the log's order is stable.
#[derive(Debug)]
pub struct StatusProjector<L> {
    log: L,
    stream: String,
    cursor: Option<RecordId>,
    states: HashMap<String, SupportState>,
}

impl<L: EventLog> StatusProjector<L> {
    /// Create a projector over [`DEFAULT_STREAM`].
    pub fn new(log: L) -> Self {
        Self::with_stream(log, DEFAULT_STREAM)
    }

    /// Create a projector over the named stream.
    pub fn with_stream(log: L, stream: impl Into<String>) -> Self {
        Self {
            log,
            stream: stream.into(),
            cursor: None,
            states: HashMap::new(),
        }
    }

    /// Create a projector resuming from a previously observed cursor.
    ///
    /// State derived before the cursor must be rebuilt by the caller if
    /// needed; this constructor exists for readers that checkpoint both
    /// cursor and state together.
    pub fn resume_from(log: L, stream: impl Into<String>, cursor: Option<RecordId>) -> Self {
        Self {
            cursor,
            ..Self::with_stream(log, stream)
        }
    }

    /// The last record id this projector has folded (resume token).
    pub fn cursor(&self) -> Option<RecordId> {
        self.cursor
    }

    /// Read and fold all records after the current cursor.
    ///
    /// Returns the number of events applied (skipped malformed records
    /// are not counted).
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] if reading the stream fails. The cursor
    /// only advances past records that were actually folded or skipped,
    /// so a failed read can simply be retried.
    pub async fn catch_up(&mut self) -> Result<usize, LogError> {
        let batch = self.log.read_from(&self.stream, self.cursor).await?;

        let mut applied = 0;
        for (id, fields) in batch {
            match codec::decode(&fields) {
                Ok(event) => {
                    let subject = event.revert_user_id().to_owned();
                    let state = self.states.remove(&subject).unwrap_or_default();
                    self.states.insert(subject, step(state, &event));
                    applied += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        stream = %self.stream,
                        record_id = %id,
                        error = %e,
                        "skipping malformed event record"
                    );
                }
            }
            self.cursor = Some(id);
        }
        Ok(applied)
    }

    /// Current state for a subject. Unknown subjects are
    /// [`SupportState::None`].
    pub fn state_of(&self, revert_user_id: &str) -> SupportState {
        self.states.get(revert_user_id).cloned().unwrap_or_default()
    }

    /// Iterate over every subject observed on the stream and its state.
    pub fn subjects(&self) -> impl Iterator<Item = (&str, &SupportState)> {
        self.states.iter().map(|(id, state)| (id.as_str(), state))
    }
}
