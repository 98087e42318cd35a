//! Assignment service: validates lifecycle transitions before publishing.
//!
//! This is the only place the state-machine rules are enforced. Each
//! operation reads the subject's current state (a fresh fold over the
//! stream -- derived state is never cached), checks the requested
//! transition, and on success appends exactly one event.
//!
//! Callers are assumed to be pre-authorized: the service trusts the
//! supplied actor identities and performs no authorization or
//! supervisor-validity checks of its own.

use std::time::SystemTime;

use crate::codec;
use crate::error::{AssignmentError, LogError};
use crate::event::{DEFAULT_STREAM, SupportEvent};
use crate::log::EventLog;
use crate::projector::{SupportState, project};
use crate::publish::EventPublisher;

/// Wall-clock milliseconds, stamped on published events.
///
/// Advisory only: nothing in this crate orders or resolves conflicts by
/// timestamp.
fn now_millis() -> u64 {
    let elapsed = SystemTime::UNIX_EPOCH
        .elapsed()
        .expect("system clock is before Unix epoch");
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Orchestrates the support-request lifecycle over one event stream.
///
/// # Concurrency
///
/// No cross-process lock is taken. Two concurrent `assign` calls for the
/// same subject can both observe `pending` and both publish; this is
/// accepted, and the conflict resolves at fold time by log order
/// (last-writer-wins). Callers that need single-assignee exclusivity
/// must add an external compare-and-append guard; the event shape does
/// not change either way.
#[derive(Debug, Clone)]
pub struct AssignmentService<L> {
    log: L,
    publisher: EventPublisher<L>,
    stream: String,
}

impl<L: EventLog + Clone> AssignmentService<L> {
    /// Create a service over [`DEFAULT_STREAM`].
    pub fn new(log: L) -> Self {
        Self::with_stream(log, DEFAULT_STREAM)
    }

    /// Create a service over the named stream.
    pub fn with_stream(log: L, stream: impl Into<String>) -> Self {
        let stream = stream.into();
        Self {
            publisher: EventPublisher::with_stream(log.clone(), stream.clone()),
            log,
            stream,
        }
    }

    /// Decoded event history for one subject, in log order.
    ///
    /// Malformed records are skipped with a warning rather than failing
    /// the whole read; one corrupt record must not make a subject's
    /// state underivable.
    async fn history(&self, revert_user_id: &str) -> Result<Vec<SupportEvent>, LogError> {
        let batch = self.log.read_from(&self.stream, None).await?;

        let mut events = Vec::new();
        for (id, fields) in batch {
            match codec::decode(&fields) {
                Ok(event) => {
                    if event.revert_user_id() == revert_user_id {
                        events.push(event);
                    }
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
        }
        Ok(events)
    }

    /// Current projected state for a subject.
    ///
    /// Always a fresh fold over the stream; nothing is cached between
    /// calls.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Log`] if reading the stream fails.
    pub async fn current_state(
        &self,
        revert_user_id: &str,
    ) -> Result<SupportState, AssignmentError> {
        let events = self.history(revert_user_id).await?;
        Ok(project(revert_user_id, &events))
    }

    /// Open a support request for a subject.
    ///
    /// Allowed only when no request exists (`none`). Re-raising a closed
    /// request is rejected so intake stays explicit.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::InvalidTransition`] carrying the observed
    /// state, or a log/publish error.
    pub async fn request_support(
        &self,
        revert_user_id: &str,
    ) -> Result<SupportEvent, AssignmentError> {
        let current = self.current_state(revert_user_id).await?;
        if current != SupportState::None {
            return Err(AssignmentError::InvalidTransition { current });
        }

        let event = SupportEvent::SupportRequested {
            revert_user_id: revert_user_id.to_owned(),
            timestamp: now_millis(),
        };
        self.publisher.publish(&event).await?;
        Ok(event)
    }

    /// Assign (or reassign) a supervisor to the subject's open request.
    ///
    /// Allowed while the state is `pending` or `active`. Assigning onto
    /// `active` is a reassignment: the new record overwrites the current
    /// owner at fold time, last-writer-wins by log order (never by
    /// timestamp). `assigned_by_user_id` optionally records a third
    /// party who performed the assignment on the assignee's behalf.
    ///
    /// Exactly one event is appended per successful call; the call does
    /// not wait for other projectors to observe it (read-after-append
    /// consistency elsewhere is eventual).
    ///
    /// # Errors
    ///
    /// [`AssignmentError::InvalidTransition`] when the state is `none`,
    /// `resolved`, or `archived` -- a request must exist and not be
    /// closed. The error carries the observed state so the caller can
    /// decide whether to retry or surface a conflict.
    pub async fn assign(
        &self,
        revert_user_id: &str,
        supervisor_user_id: &str,
        assigned_by_user_id: Option<&str>,
    ) -> Result<SupportEvent, AssignmentError> {
        let current = self.current_state(revert_user_id).await?;
        match current {
            SupportState::Pending | SupportState::Active { .. } => {}
            other => return Err(AssignmentError::InvalidTransition { current: other }),
        }

        let event = SupportEvent::AssignmentAssigned {
            revert_user_id: revert_user_id.to_owned(),
            supervisor_user_id: supervisor_user_id.to_owned(),
            assigned_by_user_id: assigned_by_user_id.map(str::to_owned),
            timestamp: now_millis(),
        };
        self.publisher.publish(&event).await?;
        Ok(event)
    }

    /// Release the subject's current assignment.
    ///
    /// Never fails on "already unassigned": the event is published and
    /// reconciled idempotently at fold time, because at-least-once
    /// delivery and retries can duplicate or reorder within a delivery
    /// window anyway. The only rejection is a subject with no history at
    /// all, to avoid appending orphaned events for requests that never
    /// existed.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::UnknownSubject`] for an unknown subject, or a
    /// log/publish error.
    pub async fn unassign(&self, revert_user_id: &str) -> Result<SupportEvent, AssignmentError> {
        let events = self.history(revert_user_id).await?;
        if events.is_empty() {
            return Err(AssignmentError::UnknownSubject {
                revert_user_id: revert_user_id.to_owned(),
            });
        }

        let event = SupportEvent::AssignmentUnassigned {
            revert_user_id: revert_user_id.to_owned(),
            timestamp: now_millis(),
        };
        self.publisher.publish(&event).await?;
        Ok(event)
    }

    /// Close the subject's open request as resolved.
    ///
    /// Allowed while the state is `pending` or `active`.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::InvalidTransition`] otherwise, or a
    /// log/publish error.
    pub async fn resolve(&self, revert_user_id: &str) -> Result<SupportEvent, AssignmentError> {
        let current = self.current_state(revert_user_id).await?;
        match current {
            SupportState::Pending | SupportState::Active { .. } => {}
            other => return Err(AssignmentError::InvalidTransition { current: other }),
        }

        let event = SupportEvent::SupportResolved {
            revert_user_id: revert_user_id.to_owned(),
            timestamp: now_millis(),
        };
        self.publisher.publish(&event).await?;
        Ok(event)
    }

    /// Archive a resolved request. Terminal.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::InvalidTransition`] unless the state is
    /// `resolved`, or a log/publish error.
    pub async fn archive(&self, revert_user_id: &str) -> Result<SupportEvent, AssignmentError> {
        let current = self.current_state(revert_user_id).await?;
        if current != SupportState::Resolved {
            return Err(AssignmentError::InvalidTransition { current });
        }

        let event = SupportEvent::SupportArchived {
            revert_user_id: revert_user_id.to_owned(),
            timestamp: now_millis(),
        };
        self.publisher.publish(&event).await?;
        Ok(event)
    }
}
