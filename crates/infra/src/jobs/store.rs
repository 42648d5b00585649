//! Job ledger implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use wabulk_core::JobId;

use super::types::Job;

pub const DEFAULT_LEDGER_CAPACITY: usize = 50;

/// Registry of bulk-send jobs, queryable by id.
///
/// Readers get snapshots; a job's fields are only ever written by the task
/// running that job.
pub trait JobLedger: Send + Sync {
    /// Register a new job, then evict the oldest entries beyond capacity.
    fn create(&self, job: Job) -> Result<JobId, LedgerError>;

    /// Snapshot of a job. `None` for unknown or evicted ids.
    fn get(&self, job_id: JobId) -> Result<Option<Job>, LedgerError>;

    /// Apply an in-place mutation to a job.
    fn update(&self, job_id: JobId, apply: &mut dyn FnMut(&mut Job)) -> Result<(), LedgerError>;

    /// Number of jobs currently retained.
    fn len(&self) -> Result<usize, LedgerError>;

    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

/// Job ledger error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("ledger lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    job: Job,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Entry>,
    next_seq: u64,
}

/// Volatile, capacity-bounded ledger.
///
/// Eviction removes the oldest jobs by `created_at` (insertion order breaks
/// ties) whatever their status; a running job that gets evicted keeps sending
/// but can no longer be queried.
#[derive(Debug)]
pub struct InMemoryJobLedger {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl InMemoryJobLedger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Drop the oldest jobs until the ledger is back at capacity.
    /// Returns the evicted ids, oldest first.
    pub fn evict_oldest(&self) -> Result<Vec<JobId>, LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        Ok(evict_over_capacity(&mut inner, self.capacity))
    }
}

impl Default for InMemoryJobLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn evict_over_capacity(inner: &mut Inner, capacity: usize) -> Vec<JobId> {
    let excess = inner.jobs.len().saturating_sub(capacity);
    if excess == 0 {
        return Vec::new();
    }

    let mut by_age: Vec<_> = inner
        .jobs
        .iter()
        .map(|(id, e)| (e.job.created_at, e.seq, *id))
        .collect();
    by_age.sort_unstable_by_key(|(at, seq, _)| (*at, *seq));

    by_age
        .into_iter()
        .take(excess)
        .map(|(_, _, id)| {
            inner.jobs.remove(&id);
            id
        })
        .collect()
}

impl JobLedger for InMemoryJobLedger {
    fn create(&self, job: Job) -> Result<JobId, LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        if inner.jobs.contains_key(&job.id) {
            return Err(LedgerError::AlreadyExists(job.id));
        }

        let id = job.id;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(id, Entry { seq, job });

        let evicted = evict_over_capacity(&mut inner, self.capacity);
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "evicted oldest jobs from ledger");
        }
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, LedgerError> {
        let inner = self.inner.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(inner.jobs.get(&job_id).map(|e| e.job.clone()))
    }

    fn update(&self, job_id: JobId, apply: &mut dyn FnMut(&mut Job)) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        let entry = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(LedgerError::NotFound(job_id))?;
        apply(&mut entry.job);
        Ok(())
    }

    fn len(&self) -> Result<usize, LedgerError> {
        let inner = self.inner.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(inner.jobs.len())
    }
}
