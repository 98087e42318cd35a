//! Event-sourced support-request assignment tracking.
//!
//! The source of truth is an append-only event stream, not mutable rows:
//! a subject's current [`SupportState`] is always a pure fold of its
//! event history in log order. The [`AssignmentService`] validates each
//! requested transition against that fold before publishing, and the
//! idempotent fold makes at-least-once delivery and replay safe.

mod codec;
pub use codec::{EVENT_FIELD, decode, encode};
mod error;
pub use error::{AssignmentError, LogError, MalformedEvent, PublishError};
mod event;
pub use event::{DEFAULT_STREAM, SupportEvent};
mod log;
pub use log::{EventLog, MemoryLog, RecordFields, RecordId};
mod projector;
pub use projector::{StatusProjector, SupportState, project, step};
mod publish;
pub use publish::EventPublisher;
mod service;
pub use service::AssignmentService;
mod storage;
pub use storage::{JsonlLog, LogDir};
