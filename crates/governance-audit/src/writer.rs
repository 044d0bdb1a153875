use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use governance_core::{GovernanceError, Result};

use crate::record::DecisionRecord;
use crate::summary::RunSummary;

/// Append-only writer over two sinks: the per-decision JSONL trace and
/// the end-of-run summary. Records are flushed as they are written.
pub struct AuditWriter {
    trace: Box<dyn Write + Send>,
    summary_sink: Box<dyn Write + Send>,
    summary: RunSummary,
    finalized: bool,
}

impl AuditWriter {
    pub fn new(trace: Box<dyn Write + Send>, summary_sink: Box<dyn Write + Send>) -> Self {
        Self {
            trace,
            summary_sink,
            summary: RunSummary::default(),
            finalized: false,
        }
    }

    pub fn to_files(trace_path: impl AsRef<Path>, summary_path: impl AsRef<Path>) -> Result<Self> {
        let trace = BufWriter::new(File::create(trace_path)?);
        let summary = BufWriter::new(File::create(summary_path)?);
        Ok(Self::new(Box::new(trace), Box::new(summary)))
    }

    /// Append one decision row and flush it.
    pub fn write(&mut self, record: &DecisionRecord) -> Result<()> {
        if self.finalized {
            return Err(GovernanceError::Audit(
                "audit writer already finalized".into(),
            ));
        }
        let line = serde_json::to_string(record)?;
        self.trace.write_all(line.as_bytes())?;
        self.trace.write_all(b"\n")?;
        self.trace.flush()?;
        self.summary.absorb(record);
        Ok(())
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Write the aggregated summary and seal the writer.
    pub fn finalize(&mut self) -> Result<RunSummary> {
        if self.finalized {
            return Err(GovernanceError::Audit(
                "audit writer already finalized".into(),
            ));
        }
        self.finalized = true;
        let text = serde_json::to_string_pretty(&self.summary)?;
        self.summary_sink.write_all(text.as_bytes())?;
        self.summary_sink.write_all(b"\n")?;
        self.summary_sink.flush()?;
        tracing::info!(decisions = self.summary.decisions, "audit finalized");
        Ok(self.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance_core::DecisionOutcome;
    use std::io::Read;

    fn record(agent: &str, outcome: DecisionOutcome) -> DecisionRecord {
        let mut record = DecisionRecord::new(1, agent, "household");
        record.approved_skill = "do_nothing".into();
        record.outcome = outcome;
        record
    }

    #[test]
    fn test_jsonl_trace_and_summary_files() {
        let trace_file = tempfile::NamedTempFile::new().unwrap();
        let summary_file = tempfile::NamedTempFile::new().unwrap();

        let mut writer =
            AuditWriter::to_files(trace_file.path(), summary_file.path()).unwrap();
        writer.write(&record("a1", DecisionOutcome::Approved)).unwrap();
        writer.write(&record("a2", DecisionOutcome::Rejected)).unwrap();
        let summary = writer.finalize().unwrap();
        drop(writer);

        let mut trace_text = String::new();
        File::open(trace_file.path())
            .unwrap()
            .read_to_string(&mut trace_text)
            .unwrap();
        let lines: Vec<&str> = trace_text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let parsed: DecisionRecord = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.approved_skill, "do_nothing");
        }

        assert_eq!(summary.decisions, 2);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.rejected, 1);

        let mut summary_text = String::new();
        File::open(summary_file.path())
            .unwrap()
            .read_to_string(&mut summary_text)
            .unwrap();
        let parsed: RunSummary = serde_json::from_str(&summary_text).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_write_after_finalize_is_an_error() {
        let mut writer = AuditWriter::new(Box::new(Vec::new()), Box::new(Vec::new()));
        writer.finalize().unwrap();
        let result = writer.write(&record("a1", DecisionOutcome::Approved));
        assert!(matches!(result, Err(GovernanceError::Audit(_))));
    }

    #[test]
    fn test_double_finalize_is_an_error() {
        let mut writer = AuditWriter::new(Box::new(Vec::new()), Box::new(Vec::new()));
        writer.finalize().unwrap();
        assert!(writer.finalize().is_err());
    }
}
