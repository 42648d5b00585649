//! Bulk-send dispatcher.
//!
//! `submit` validates the request, registers a [`Job`] in the ledger and
//! returns immediately. The send loop then runs on its own tokio task:
//! contacts are processed strictly one at a time, batch by batch, with a
//! paced gap after every contact and a longer pause between batches.

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use wabulk_core::{Contact, DomainError, JobId, TemplateRequest};

use crate::config::SendSettings;
use crate::pacing::{DelayKind, Sleeper, TokioSleeper};
use crate::payload::PayloadBuilder;
use crate::provider::MessageProvider;
use crate::retry::{SendError, send_with_retry};

use super::store::{JobLedger, LedgerError};
use super::types::Job;

/// Rejected submission. No job is created for any of these.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("No contacts provided")]
    NoContacts,
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("WhatsApp API config missing")]
    ProviderNotConfigured,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SubmitError {
    /// Caused by the request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SubmitError::NoContacts | SubmitError::Invalid(_))
    }
}

/// Handle to a submitted job's background task.
///
/// Dropping the handle detaches the task; it keeps running to completion.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    join: JoinHandle<()>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait until the job has been finalized in the ledger.
    pub async fn wait(self) -> Result<(), JoinError> {
        self.join.await
    }
}

#[derive(Debug, Clone)]
enum Delivery {
    Sent(Option<String>),
    Failed(String),
}

/// Drives bulk sends against a [`MessageProvider`], tracking progress in a [`JobLedger`].
pub struct Dispatcher {
    ledger: Arc<dyn JobLedger>,
    provider: Arc<dyn MessageProvider>,
    sleeper: Arc<dyn Sleeper>,
    payloads: PayloadBuilder,
    settings: SendSettings,
}

impl Dispatcher {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        provider: Arc<dyn MessageProvider>,
        payloads: PayloadBuilder,
        settings: SendSettings,
    ) -> Self {
        Self {
            ledger,
            provider,
            sleeper: Arc::new(TokioSleeper),
            payloads,
            settings,
        }
    }

    /// Replace the timer (tests use a recording sleeper).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn JobLedger> {
        &self.ledger
    }

    pub fn provider(&self) -> &Arc<dyn MessageProvider> {
        &self.provider
    }

    /// Snapshot of a job; `None` when unknown or evicted.
    pub fn job(&self, job_id: JobId) -> Result<Option<Job>, LedgerError> {
        self.ledger.get(job_id)
    }

    /// Validate, register the job and start sending in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        contacts: Vec<Contact>,
        template: TemplateRequest,
    ) -> Result<JobHandle, SubmitError> {
        if contacts.is_empty() {
            return Err(SubmitError::NoContacts);
        }
        template.validate()?;
        if !self.provider.is_configured() {
            return Err(SubmitError::ProviderNotConfigured);
        }

        let id = self.ledger.create(Job::new(&contacts))?;
        info!(
            job_id = %id,
            template = %template.template_name,
            contacts = contacts.len(),
            "bulk send queued"
        );

        let run = JobRun {
            id,
            contacts,
            template,
            ledger: self.ledger.clone(),
            provider: self.provider.clone(),
            sleeper: self.sleeper.clone(),
            payloads: self.payloads.clone(),
            settings: self.settings.clone(),
        };
        let ledger = self.ledger.clone();

        // The send loop runs on an inner task so a panic anywhere inside it
        // still reaches finalization below.
        let join = tokio::spawn(async move {
            match tokio::spawn(run.execute()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(job_id = %id, error = %e, "bulk send aborted"),
                Err(e) => error!(job_id = %id, error = %e, "bulk send task crashed"),
            }
            finalize(ledger.as_ref(), id);
        });

        Ok(JobHandle { id, join })
    }
}

fn finalize(ledger: &dyn JobLedger, id: JobId) {
    let mut summary = None;
    let result = ledger.update(id, &mut |job| {
        job.mark_completed();
        summary = Some((job.sent, job.failed, job.pending));
    });

    match result {
        Ok(()) => {
            if let Some((sent, failed, pending)) = summary {
                info!(job_id = %id, sent, failed, pending, "bulk send completed");
            }
        }
        Err(LedgerError::NotFound(_)) => {
            debug!(job_id = %id, "job evicted from ledger before completion")
        }
        Err(e) => error!(job_id = %id, error = %e, "failed to finalize job"),
    }
}

/// Everything one background send loop needs, owned.
struct JobRun {
    id: JobId,
    contacts: Vec<Contact>,
    template: TemplateRequest,
    ledger: Arc<dyn JobLedger>,
    provider: Arc<dyn MessageProvider>,
    sleeper: Arc<dyn Sleeper>,
    payloads: PayloadBuilder,
    settings: SendSettings,
}

impl JobRun {
    async fn execute(self) -> Result<(), LedgerError> {
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = self.contacts.len().div_ceil(batch_size);
        debug!(job_id = %self.id, batch_size, batch_count, "bulk send started");

        for (batch_no, batch) in self.contacts.chunks(batch_size).enumerate() {
            for (offset, contact) in batch.iter().enumerate() {
                let delivery = self.deliver(contact).await;
                self.record(batch_no * batch_size + offset, delivery)?;

                let pause = self.settings.delays.inter_message_delay();
                self.sleeper.sleep(DelayKind::Message, pause).await;
            }

            if batch_no + 1 < batch_count {
                let pause = self.settings.delays.inter_batch_delay();
                debug!(
                    job_id = %self.id,
                    batch = batch_no + 1,
                    pause_ms = pause.as_millis() as u64,
                    "batch done; pausing"
                );
                self.sleeper.sleep(DelayKind::Batch, pause).await;
            }
        }
        Ok(())
    }

    async fn deliver(&self, contact: &Contact) -> Delivery {
        let phone = match contact.normalized_phone() {
            Ok(phone) => phone,
            Err(e) => {
                warn!(job_id = %self.id, phone = %contact.phone, "skipping contact: {e}");
                return Delivery::Failed(e.to_string());
            }
        };

        let payload = self.payloads.build(&self.template, contact, &phone);
        let result = send_with_retry(&self.settings.retry, self.sleeper.as_ref(), |_| {
            self.provider.send_template(&payload)
        })
        .await;

        match result {
            Ok(response) => Delivery::Sent(response.message_id().map(str::to_string)),
            Err(err) => {
                let reason = failure_reason(&err);
                warn!(
                    job_id = %self.id,
                    to = %payload.to,
                    provider_body = ?provider_body(&err),
                    "send failed: {reason}"
                );
                Delivery::Failed(reason)
            }
        }
    }

    fn record(&self, index: usize, delivery: Delivery) -> Result<(), LedgerError> {
        let result = self.ledger.update(self.id, &mut |job| {
            match &delivery {
                Delivery::Sent(message_id) => job.mark_sent(index, message_id.clone()),
                Delivery::Failed(reason) => job.mark_failed(index, reason.clone()),
            };
        });

        match result {
            // Evicted while running: keep sending, nothing left to track.
            Err(LedgerError::NotFound(_)) => {
                debug!(job_id = %self.id, index, "job no longer in ledger; result dropped");
                Ok(())
            }
            other => other,
        }
    }
}

/// Provider-reported detail first, then the error's own message.
fn failure_reason(err: &SendError) -> String {
    match err {
        SendError::Provider(e) => e.detail().unwrap_or_else(|| e.to_string()),
        SendError::MaxRetriesExceeded { .. } => err.to_string(),
    }
}

fn provider_body(err: &SendError) -> Option<&serde_json::Value> {
    match err {
        SendError::Provider(e) => e.body(),
        SendError::MaxRetriesExceeded { last, .. } => last.as_ref().and_then(|e| e.body()),
    }
}
