//! Process-wide logging setup for the bulk-send service.

/// Tracing subscriber configuration.
pub mod tracing;

pub use tracing::{LogFormat, init, init_with};
