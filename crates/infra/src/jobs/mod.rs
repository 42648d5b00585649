//! Bulk-send jobs.
//!
//! - `types`: the `Job` record and per-contact results
//! - `store`: the capacity-bounded `JobLedger`
//! - `executor`: the `Dispatcher` that runs a job in the background

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{Dispatcher, JobHandle, SubmitError};
pub use store::{DEFAULT_LEDGER_CAPACITY, InMemoryJobLedger, JobLedger, LedgerError};
pub use types::{ContactResult, ContactStatus, Job, JobStatus};
