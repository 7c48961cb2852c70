//! Asynchronous audit logger.
//!
//! Handlers hand entries to [`AuditLogger::record`], which enqueues them on a
//! bounded channel and returns immediately. A background task drains the
//! queue into the database. Delivery is at most once: a full queue drops the
//! entry, a failed insert is not retried. Both outcomes are counted and
//! exposed through [`AuditLogger::stats`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::{AuditRepository, RepositoryError};
use crate::models::{AuditStats, NewAuditEntry};

/// Destination of audit entries.
pub trait AuditSink: Send + Sync + 'static {
    /// Persist one entry.
    fn write(&self, entry: &NewAuditEntry)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl AuditSink for PgPool {
    async fn write(&self, entry: &NewAuditEntry) -> Result<(), RepositoryError> {
        AuditRepository::new(self).insert(entry).await.map(|_| ())
    }
}

#[derive(Debug, Default)]
struct Counters {
    recorded: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Handle to the audit queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: mpsc::Sender<NewAuditEntry>,
    counters: Arc<Counters>,
}

impl AuditLogger {
    /// Start the writer task and return the handle plus the task.
    ///
    /// The task ends once every handle has been dropped and the queue is
    /// drained.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or if called outside a Tokio runtime.
    pub fn spawn<S: AuditSink>(sink: S, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NewAuditEntry>(capacity);
        let counters = Arc::new(Counters::default());

        let writer_counters = Arc::clone(&counters);
        let task = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match sink.write(&entry).await {
                    Ok(()) => {
                        writer_counters.recorded.fetch_add(1, Ordering::Relaxed);
                        debug!(action = %entry.action, "audit entry written");
                    }
                    Err(e) => {
                        writer_counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(action = %entry.action, error = %e, "failed to write audit entry");
                    }
                }
            }
        });

        (Self { tx, counters }, task)
    }

    /// Enqueue an entry without waiting.
    pub fn record(&self, entry: NewAuditEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, "audit queue full, entry dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, "audit writer stopped, entry dropped");
            }
        }
    }

    /// Snapshot of the delivery counters.
    #[must_use]
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
