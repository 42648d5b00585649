//! Send engine: pacing, retries, provider client, job tracking.

pub mod config;
pub mod jobs;
pub mod pacing;
pub mod payload;
pub mod provider;
pub mod retry;
