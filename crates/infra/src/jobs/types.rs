//! Job and per-contact result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wabulk_core::{Contact, JobId};

/// Job execution status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Background task still iterating contacts
    Running,
    /// Every contact has a terminal status (or the task gave up)
    Completed,
}

/// Delivery status of a single contact.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    Sent,
    Failed,
}

impl ContactStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContactStatus::Pending)
    }
}

/// Outcome for one input contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResult {
    pub phone: String,
    pub name: Option<String>,
    pub status: ContactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ContactResult {
    pub fn pending(contact: &Contact) -> Self {
        Self {
            phone: contact.phone.clone(),
            name: contact.name.clone(),
            status: ContactStatus::Pending,
            error: None,
            provider_message_id: None,
            timestamp: None,
        }
    }
}

/// One bulk send and its progress.
///
/// `sent + failed + pending == total_contacts` after every mutation, and
/// `results` holds one entry per input contact in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub total_contacts: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<ContactResult>,
}

impl Job {
    /// A running job with every contact pending.
    pub fn new(contacts: &[Contact]) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Running,
            total_contacts: contacts.len(),
            sent: 0,
            failed: 0,
            pending: contacts.len(),
            created_at: Utc::now(),
            completed_at: None,
            results: contacts.iter().map(ContactResult::pending).collect(),
        }
    }

    /// Override the creation timestamp (ordering tests, imports).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Record a provider-accepted message. Returns `false` if the slot was
    /// missing or already terminal.
    pub fn mark_sent(&mut self, index: usize, provider_message_id: Option<String>) -> bool {
        self.settle(index, |result| {
            result.status = ContactStatus::Sent;
            result.provider_message_id = provider_message_id;
        })
    }

    /// Record a failed contact. Returns `false` if the slot was missing or
    /// already terminal.
    pub fn mark_failed(&mut self, index: usize, error: impl Into<String>) -> bool {
        let error = error.into();
        self.settle(index, |result| {
            result.status = ContactStatus::Failed;
            result.error = Some(error);
        })
    }

    fn settle(&mut self, index: usize, apply: impl FnOnce(&mut ContactResult)) -> bool {
        let Some(result) = self.results.get_mut(index) else {
            return false;
        };
        if result.status.is_terminal() {
            return false;
        }

        apply(result);
        result.timestamp = Some(Utc::now());
        self.pending = self.pending.saturating_sub(1);
        match result.status {
            ContactStatus::Sent => self.sent += 1,
            ContactStatus::Failed => self.failed += 1,
            ContactStatus::Pending => {}
        }
        true
    }

    /// Finalize the job. Idempotent; the first completion time wins.
    pub fn mark_completed(&mut self) {
        if self.status == JobStatus::Completed {
            return;
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// Whether the counters agree with each other and with `results`.
    pub fn counts_consistent(&self) -> bool {
        let tally = |s: ContactStatus| self.results.iter().filter(|r| r.status == s).count();
        self.sent + self.failed + self.pending == self.total_contacts
            && self.results.len() == self.total_contacts
            && tally(ContactStatus::Sent) == self.sent
            && tally(ContactStatus::Failed) == self.failed
            && tally(ContactStatus::Pending) == self.pending
    }
}
