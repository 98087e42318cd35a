//! Event publisher: the single write path onto the log.
//!
//! Everything that appends an assignment-lifecycle event goes through
//! [`EventPublisher`], so the encode-then-append sequence (and its
//! logging) lives in exactly one place.

use crate::codec;
use crate::error::PublishError;
use crate::event::{DEFAULT_STREAM, SupportEvent};
use crate::log::{EventLog, RecordId};

/// Appends domain events to a configured stream.
///
/// `Clone` is as cheap as cloning the underlying log handle.
#[derive(Debug, Clone)]
pub struct EventPublisher<L> {
    log: L,
    stream: String,
}

impl<L: EventLog> EventPublisher<L> {
    /// Create a publisher writing to [`DEFAULT_STREAM`].
    pub fn new(log: L) -> Self {
        Self::with_stream(log, DEFAULT_STREAM)
    }

    /// Create a publisher writing to the named stream.
    pub fn with_stream(log: L, stream: impl Into<String>) -> Self {
        Self {
            log,
            stream: stream.into(),
        }
    }

    /// The stream this publisher writes to.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Encode the event and append it to the stream.
    ///
    /// Exactly one record is appended per successful call.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if encoding fails or the log append
    /// fails. A failed append has an **unknown** outcome: the record may
    /// still have been written, and callers retrying must rely on the
    /// idempotent fold downstream.
    pub async fn publish(&self, event: &SupportEvent) -> Result<RecordId, PublishError> {
        let fields = codec::encode(event)?;
        let id = self.log.append(&self.stream, fields).await?;

        tracing::debug!(
            stream = %self.stream,
            record_id = %id,
            event_type = event.event_type(),
            revert_user_id = event.revert_user_id(),
            "published event"
        );
        Ok(id)
    }
}
