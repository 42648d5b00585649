use serde::{Deserialize, Serialize};

use wabulk_core::{Contact, JobId, TemplateRequest};
use wabulk_infra::jobs::Job;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/messages/template-message`.
#[derive(Debug, Deserialize)]
pub struct SendTemplateRequest {
    #[serde(default)]
    pub contacts: Option<Vec<Contact>>,
    #[serde(flatten)]
    pub template: TemplateRequest,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub success: bool,
    pub job_id: JobId,
    pub total_contacts: usize,
}

impl JobAccepted {
    pub fn new(job_id: JobId, total_contacts: usize) -> Self {
        Self {
            success: true,
            job_id,
            total_contacts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobEnvelope {
    pub success: bool,
    pub job: Job,
}

impl From<Job> for JobEnvelope {
    fn from(job: Job) -> Self {
        Self { success: true, job }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplatesEnvelope {
    pub success: bool,
    pub data: serde_json::Value,
}
