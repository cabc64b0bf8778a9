//! Ordered persistence of serialized documents.
//!
//! Saves go through a FIFO queue drained one job at a time, so a later
//! save can never land before an earlier one. A failed job is reported
//! and the queue moves on.

use std::collections::VecDeque;
use std::io;

use tracing::{debug, error};

use crate::storage::Storage;

/// One whole-file write.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteJob {
    pub path: String,
    pub text: String,
    /// Document revision the text was serialized from.
    pub revision: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome {
    Written { path: String, revision: u64 },
    Failed { path: String, revision: u64, error: String },
}

impl WriteOutcome {
    pub fn revision(&self) -> u64 {
        match self {
            WriteOutcome::Written { revision, .. } | WriteOutcome::Failed { revision, .. } => {
                *revision
            }
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

#[derive(Debug, Default)]
pub struct WriteQueue {
    jobs: VecDeque<WriteJob>,
    completed: u64,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, job: WriteJob) {
        debug!(path = %job.path, revision = job.revision, queued = self.jobs.len() + 1, "Write enqueued");
        self.jobs.push_back(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs finished since creation, failed ones included.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Write every queued job in order.
    pub fn drain(&mut self, storage: &dyn Storage) -> Vec<WriteOutcome> {
        let mut outcomes = Vec::with_capacity(self.jobs.len());
        while let Some(job) = self.jobs.pop_front() {
            let outcome = match write_job(storage, &job) {
                Ok(()) => WriteOutcome::Written {
                    path: job.path,
                    revision: job.revision,
                },
                Err(e) => {
                    error!(path = %job.path, revision = job.revision, error = %e, "Write failed");
                    WriteOutcome::Failed {
                        path: job.path,
                        revision: job.revision,
                        error: e.to_string(),
                    }
                }
            };
            self.completed += 1;
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn write_job(storage: &dyn Storage, job: &WriteJob) -> io::Result<()> {
    let handle = storage
        .get_file_handle(&job.path, true)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("cannot create {}", job.path)))?;
    storage.write_text(&handle, &job.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn job(path: &str, text: &str, revision: u64) -> WriteJob {
        WriteJob {
            path: path.into(),
            text: text.into(),
            revision,
        }
    }

    #[test]
    fn drains_in_order_and_last_write_wins() {
        let storage = MemoryStorage::new();
        let mut queue = WriteQueue::new();
        queue.enqueue(job("t.otio", "first", 1));
        queue.enqueue(job("t.otio", "second", 2));
        assert_eq!(queue.len(), 2);

        let outcomes = queue.drain(&storage);
        assert_eq!(outcomes.iter().map(WriteOutcome::revision).collect::<Vec<_>>(), vec![1, 2]);
        assert!(outcomes.iter().all(WriteOutcome::is_written));
        assert_eq!(storage.contents("t.otio").as_deref(), Some("second"));
        assert!(queue.is_empty());
        assert_eq!(queue.completed(), 2);
    }

    #[test]
    fn failures_do_not_block_later_jobs() {
        let storage = MemoryStorage::new();
        let mut queue = WriteQueue::new();
        storage.fail_writes(Some("read-only"));
        queue.enqueue(job("t.otio", "a", 1));
        let outcomes = queue.drain(&storage);
        assert!(matches!(&outcomes[0], WriteOutcome::Failed { error, .. } if error.contains("read-only")));

        storage.fail_writes(None);
        queue.enqueue(job("t.otio", "b", 2));
        assert!(queue.drain(&storage)[0].is_written());
        assert_eq!(storage.contents("t.otio").as_deref(), Some("b"));
    }
}
