//! The append-only version log.

use crate::message::ClientId;
use serde::{Deserialize, Serialize};
use vellum_step::{Step, StepMap};

/// One accepted batch: the rebased steps actually applied, tagged with
/// the submitting client and its request sequence number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub client: ClientId,
    pub request_seq: u64,
    pub steps: Vec<Step>,
}

/// A strictly ordered, append-only record of accepted batches.
///
/// The document version equals the log length: entry `i` produced version
/// `i + 1`. The log is never truncated during a session; compaction for
/// persistence happens elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionLog {
    entries: Vec<LogEntry>,
}

impl VersionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current version: the number of accepted batches.
    pub fn version(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an accepted batch, returning the new version.
    pub fn append(&mut self, entry: LogEntry) -> u64 {
        self.entries.push(entry);
        self.version()
    }

    /// The entries a client at `version` has not seen yet.
    pub fn entries_since(&self, version: u64) -> &[LogEntry] {
        &self.entries[(version as usize).min(self.entries.len())..]
    }

    /// The positional effect of every step past `version`, in log order;
    /// this is what a stale batch must be rebased through.
    pub fn maps_since(&self, version: u64) -> Vec<StepMap> {
        self.entries_since(version)
            .iter()
            .flat_map(|entry| entry.steps.iter().map(Step::step_map))
            .collect()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(client: &str, seq: u64, steps: Vec<Step>) -> LogEntry {
        LogEntry {
            client: ClientId::new(client),
            request_seq: seq,
            steps,
        }
    }

    #[test]
    fn test_version_equals_length() {
        let mut log = VersionLog::new();
        assert_eq!(log.version(), 0);
        assert_eq!(log.append(entry("a", 1, vec![Step::insert_text(0, "x")])), 1);
        assert_eq!(log.append(entry("b", 1, vec![])), 2);
        assert_eq!(log.version(), 2);
    }

    #[test]
    fn test_entries_since() {
        let mut log = VersionLog::new();
        log.append(entry("a", 1, vec![Step::insert_text(0, "x")]));
        log.append(entry("b", 1, vec![Step::insert_text(1, "y")]));
        assert_eq!(log.entries_since(0).len(), 2);
        assert_eq!(log.entries_since(1).len(), 1);
        assert_eq!(log.entries_since(2).len(), 0);
        assert_eq!(log.entries_since(99).len(), 0);
    }

    #[test]
    fn test_maps_since_flattens_batches() {
        let mut log = VersionLog::new();
        log.append(entry(
            "a",
            1,
            vec![Step::insert_text(0, "ab"), Step::insert_text(2, "c")],
        ));
        assert_eq!(log.maps_since(0).len(), 2);
    }
}
