//! Durable single-consumer processing queue.
//!
//! Entries live in SQLite so a restart loses nothing; the in-process side
//! is one worker thread parked on a wake channel. Waking is a hint, not a
//! handoff: on every wake the worker drains whatever the table holds, so
//! a missed signal costs latency, never work.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{DatabaseError, SqliteStore};

use super::processor::{DocumentProcessor, ProcessingError};

pub const DEFAULT_PRIORITY: i64 = 0;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct ProcessingQueue {
    store: SqliteStore,
    wake: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ProcessingQueue {
    /// Spawn the worker thread and drain any entries that survived a
    /// previous run.
    pub fn start(store: SqliteStore, processor: DocumentProcessor) -> Self {
        let (wake, wakeups) = mpsc::channel();
        let worker_store = store.clone();
        let worker = std::thread::Builder::new()
            .name("processing-queue".into())
            .spawn(move || worker_loop(worker_store, processor, wakeups))
            .ok();

        if worker.is_none() {
            error!("Could not spawn processing queue worker thread");
        }

        // Drain whatever is already durable before the first enqueue.
        let _ = wake.send(());

        Self {
            store,
            wake: Some(wake),
            worker,
        }
    }

    /// Add a document to the queue. Returns false when the document
    /// already has an entry; enqueueing is idempotent per document.
    pub fn enqueue(&self, document_id: &Uuid, priority: i64) -> Result<bool, QueueError> {
        let inserted = self.store.enqueue(document_id, priority)?;
        if inserted {
            debug!(document_id = %document_id, priority, "Enqueued document");
        } else {
            debug!(document_id = %document_id, "Document already queued");
        }

        if let Some(wake) = &self.wake {
            // A dead worker makes this a no-op; entries stay durable.
            let _ = wake.send(());
        }
        Ok(inserted)
    }

    pub fn pending_count(&self) -> Result<i64, QueueError> {
        Ok(self.store.pending_count()?)
    }

    /// Stop accepting wakeups and wait for the in-flight document to
    /// finish. Unprocessed entries remain durable for the next start.
    pub fn shutdown(&mut self) {
        self.wake.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Processing queue worker panicked");
            }
        }
    }
}

impl Drop for ProcessingQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(store: SqliteStore, processor: DocumentProcessor, wakeups: Receiver<()>) {
    info!("Processing queue worker started");

    loop {
        // Drain the table completely before parking again.
        loop {
            let entry = match store.next_entry() {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Could not read next queue entry");
                    break;
                }
            };

            // Removing the entry first keeps the queue moving even when
            // processing fails; the document row carries the outcome.
            if let Err(e) = store.remove_entry(entry.id) {
                error!(error = %e, entry_id = entry.id, "Could not remove queue entry");
                break;
            }

            match processor.process_document(&entry.document_id) {
                Ok(()) => {}
                Err(
                    e @ (ProcessingError::NotPending { .. }
                    | ProcessingError::DocumentNotFound(_)),
                ) => {
                    debug!(
                        document_id = %entry.document_id,
                        reason = %e,
                        "Discarded stale queue entry"
                    );
                }
                Err(e) => {
                    warn!(
                        document_id = %entry.document_id,
                        error = %e,
                        "Document processing failed, continuing with queue"
                    );
                }
            }
        }

        // Park until the next enqueue; a closed channel means shutdown.
        if wakeups.recv().is_err() {
            break;
        }
    }

    info!("Processing queue worker stopped");
}
