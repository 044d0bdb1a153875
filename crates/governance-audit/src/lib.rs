//! Append-only audit trail.
//!
//! Two physical streams: a line-delimited JSON trace with one record per
//! decision (flushed immediately, so a crashed run keeps everything it
//! decided), and an end-of-run summary with per-rule histograms.

pub mod record;
pub mod summary;
pub mod writer;

pub use record::{AttemptRecord, DecisionRecord};
pub use summary::RunSummary;
pub use writer::AuditWriter;
