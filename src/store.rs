//! ==============================================================================
//! store.rs - process-wide owner of snapshot, history and event log
//! ==============================================================================
//!
//! purpose:
//!     the only shared mutable state in the process. the sampler writes,
//!     the api reads (and clears logs).
//!
//! locking:
//!     each entity has its own tokio rwlock so the three are read and written
//!     independently:
//!     - snapshot: Arc<Snapshot> swapped whole, readers clone the Arc and
//!       release the lock immediately (copy-on-write)
//!     - history: download and upload buffers under one lock, pushed as a pair
//!     - logs: append and clear serialize on the same lock, so an append lands
//!       fully before or fully after a clear
//!
//!     no lock is ever held across a device call.
//!
//! relationships:
//!     - cloned into: sampler.rs (writer), api.rs (reader)
//!
//! ==============================================================================

use crate::domain::{LogEntry, Snapshot};
use crate::history::HistoryBuffer;
use crate::logstore::LogStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// ordered copies of both throughput windows, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub download: Vec<f64>,
    pub upload: Vec<f64>,
}

struct HistoryPair {
    download: HistoryBuffer,
    upload: HistoryBuffer,
}

impl HistoryPair {
    fn push(&mut self, down: f64, up: f64) {
        self.download.push(down);
        self.upload.push(up);
    }
}

struct Inner {
    snapshot: RwLock<Arc<Snapshot>>,
    history: RwLock<HistoryPair>,
    logs: RwLock<LogStore>,
}

/// cheap to clone handle; every clone refers to the same state
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl StateStore {
    pub fn new(history_capacity: usize, log_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(Arc::new(Snapshot::connecting())),
                history: RwLock::new(HistoryPair {
                    download: HistoryBuffer::new(history_capacity),
                    upload: HistoryBuffer::new(history_capacity),
                }),
                logs: RwLock::new(LogStore::new(log_capacity)),
            }),
        }
    }

    // --------------------------------------------------------------------------
    // readers
    // --------------------------------------------------------------------------

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.read().await.clone()
    }

    pub async fn history(&self) -> HistoryView {
        let history = self.inner.history.read().await;
        HistoryView {
            download: history.download.to_vec(),
            upload: history.upload.to_vec(),
        }
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.inner.logs.read().await.snapshot()
    }

    /// empty the log store, returning how many entries were dropped
    pub async fn clear_logs(&self) -> usize {
        let mut logs = self.inner.logs.write().await;
        let dropped = logs.len();
        logs.clear();
        dropped
    }

    // --------------------------------------------------------------------------
    // sampler-side mutators
    // --------------------------------------------------------------------------

    pub async fn commit_snapshot(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        *self.inner.snapshot.write().await = next;
    }

    /// history only, without a snapshot; the sampler always goes through
    /// commit_sample
    #[cfg(test)]
    pub async fn push_history(&self, down: f64, up: f64) {
        self.inner.history.write().await.push(down, up);
    }

    /// push a throughput pair and publish the snapshot it came from
    ///
    /// the snapshot swap happens while the history lock is still held, so a
    /// later history read never runs ahead of the committed snapshot.
    pub async fn commit_sample(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        let mut history = self.inner.history.write().await;
        history.push(next.download_mbps, next.upload_mbps);
        *self.inner.snapshot.write().await = next;
    }

    pub async fn append_log(&self, entry: LogEntry) {
        self.inner.logs.write().await.append(entry);
    }
}
