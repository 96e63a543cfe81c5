//! Severity-tagged migration log.
//!
//! Every accepted or rejected copy lands here as a record. The log is
//! part of the migration report and, when requested, written out as
//! plain text with one record per line.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Ordered list of log records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MigrationLog {
    records: Vec<LogRecord>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Records are mirrored to `tracing` at debug level.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(severity = %severity, "{}", message);
        self.records.push(LogRecord { severity, message });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Severity::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records at exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Records whose message contains `needle`.
    pub fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.records.iter().filter(move |r| r.message.contains(needle))
    }

    /// Append every record of `other`, keeping order.
    pub fn extend(&mut self, other: MigrationLog) {
        self.records.extend(other.records);
    }

    /// `SEVERITY: message`, one record per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_has_one_line_per_record() {
        let mut log = MigrationLog::new();
        log.info("copied 'water'");
        log.warning("skipped 2 attribute(s) of type 'Obsolete'");
        log.error("id 5 is taken");
        assert_eq!(
            log.to_text(),
            "INFO: copied 'water'\nWARNING: skipped 2 attribute(s) of type 'Obsolete'\nERROR: id 5 is taken\n"
        );
        assert_eq!(log.count(Severity::Warning), 1);
        assert!(log.has_errors());
        assert_eq!(log.matching("Obsolete").count(), 1);
    }

    #[test]
    fn serializes_as_a_record_array() {
        let mut log = MigrationLog::new();
        log.debug("x");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "severity": "DEBUG", "message": "x" }])
        );
    }
}
