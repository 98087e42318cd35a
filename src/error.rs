//! Crate-level error types for decoding, log transport, and commands.

use crate::projector::SupportState;

/// Error returned when decoding a log record into a domain event fails.
///
/// Raised only by the codec. During a multi-record fold the offending
/// record is skipped (with a warning) rather than halting state
/// derivation; a single corrupt record must never make a subject's state
/// underivable forever.
#[derive(Debug, thiserror::Error)]
pub enum MalformedEvent {
    /// The record carries no `event` field.
    #[error("record has no 'event' field")]
    MissingEventField,

    /// The `event` field is not valid JSON.
    #[error("event payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The record has a `type` tag this crate does not recognize.
    ///
    /// Decoding never silently coerces an unknown tag into a known
    /// variant; the caller decides whether to skip or surface it.
    #[error("unrecognized event type {event_type:?}")]
    UnknownType { event_type: String },

    /// The `type` tag is known but a required field is missing or has
    /// the wrong type.
    #[error("malformed {event_type:?} event: {source}")]
    InvalidShape {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by an [`EventLog`](crate::EventLog) backend.
///
/// A failed `append` means the outcome is **unknown**: the record may or
/// may not have been written. Callers retry if they need the action, and
/// the idempotent fold absorbs any resulting duplicate.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Transport failure or timeout reaching the log. Transient; retry
    /// with backoff.
    #[error("event log unavailable: {reason}")]
    Unavailable { reason: String },

    /// Disk I/O failure in a file-backed log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned when publishing a domain event fails.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The event could not be serialized. Does not occur for the closed
    /// set of known variants, but the codec signature is fallible.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The log rejected or never acknowledged the append.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Error returned by [`AssignmentService`](crate::AssignmentService)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    /// The requested transition is not legal from the subject's current
    /// state. Carries the actual observed state so the caller can decide
    /// whether to retry, reassign, or surface a conflict.
    #[error("invalid transition: support status is {current}")]
    InvalidTransition { current: SupportState },

    /// The subject has no event history at all, so there is no request
    /// to act on.
    #[error("no support request history for user {revert_user_id:?}")]
    UnknownSubject { revert_user_id: String },

    /// Reading the event stream failed.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Publishing the resulting event failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}
