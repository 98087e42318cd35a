//! Abstract append-only event log and the in-memory backend.
//!
//! The rest of the crate never touches a transport directly: the
//! [`EventLog`] trait is the seam behind which a Redis stream, a gRPC
//! event store, or the in-tree backends ([`MemoryLog`] here,
//! [`JsonlLog`](crate::JsonlLog) in `storage`) all look the same. The log
//! is durable, strictly ordered, and at-least-once on the read side:
//! a reader resuming from a previously observed [`RecordId`] may see a
//! record again, and correctness downstream relies on the fold being
//! idempotent rather than on exactly-once delivery.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::LogError;

/// Log-assigned position of a record within a stream.
///
/// Monotonically increasing in append order. This is the **only**
/// authoritative ordering key; event timestamps are advisory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat string field pairs, the shape a stream record natively stores.
pub type RecordFields = Vec<(String, String)>;

/// A durable, ordered, append-only stream of opaque records.
///
/// # Contract
///
/// - `append` serializes concurrent writers and assigns each record a
///   unique, totally ordered [`RecordId`] per stream. A transport
///   failure means the outcome is *unknown* -- the record may have been
///   written -- so callers must rely on idempotent folding, not on
///   failure meaning no-op.
/// - `read_from` returns records in ascending [`RecordId`] order,
///   strictly after the given cursor. Restarting from any previously
///   observed id resumes without loss; duplication is bounded only by
///   the log's own at-least-once guarantee.
pub trait EventLog {
    /// Append a record to the named stream.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Unavailable`] (or [`LogError::Io`] for
    /// file-backed logs) on transport failure.
    fn append(
        &self,
        stream: &str,
        fields: RecordFields,
    ) -> impl Future<Output = Result<RecordId, LogError>> + Send;

    /// Read all records currently in the named stream with an id
    /// strictly greater than `after` (`None` reads from the start).
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] on transport failure.
    fn read_from(
        &self,
        stream: &str,
        after: Option<RecordId>,
    ) -> impl Future<Output = Result<Vec<(RecordId, RecordFields)>, LogError>> + Send;
}

/// Per-log state behind the [`MemoryLog`] mutex.
#[derive(Debug, Default)]
struct MemoryLogInner {
    /// Last assigned record id. Ids are unique across streams, which is
    /// stricter than the per-stream contract requires.
    last_id: u64,
    /// Records per stream, in append order.
    streams: HashMap<String, Vec<(RecordId, RecordFields)>>,
}

/// In-memory [`EventLog`] backend.
///
/// Appends are serialized by a `tokio` mutex, giving the same
/// total-order guarantee a real stream server provides. `Clone` is
/// cheap -- clones share the same underlying log, so one clone can feed
/// a service while another feeds a projector, mirroring how separate
/// processes share one stream.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<MemoryLogInner>>,
}

impl MemoryLog {
    /// Create an empty in-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently in the named stream.
    ///
    /// Test and diagnostics helper; not part of the [`EventLog`]
    /// contract.
    pub async fn len(&self, stream: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.streams.get(stream).map_or(0, Vec::len)
    }
}

impl EventLog for MemoryLog {
    async fn append(&self, stream: &str, fields: RecordFields) -> Result<RecordId, LogError> {
        let mut inner = self.inner.lock().await;
        inner.last_id += 1;
        let id = RecordId(inner.last_id);
        inner
            .streams
            .entry(stream.to_owned())
            .or_default()
            .push((id, fields));
        Ok(id)
    }

    async fn read_from(
        &self,
        stream: &str,
        after: Option<RecordId>,
    ) -> Result<Vec<(RecordId, RecordFields)>, LogError> {
        let inner = self.inner.lock().await;
        let records = inner
            .streams
            .get(stream)
            .map(|records| {
                records
                    .iter()
                    .filter(|(id, _)| after.is_none_or(|cursor| *id > cursor))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }
}
