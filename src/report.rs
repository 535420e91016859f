//! End-of-run counters: what was read, decoded, dropped, and written.

use crate::assemble::AssemblyStats;
use crate::schema::DecodeError;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Counters for one dump table (Posts or Comments).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub rows_read: u64,
    pub malformed_rows: u64,
    pub decoded: u64,
    pub missing_field: u64,
    pub conversion_failed: u64,
    /// Dropped rows keyed by the field that failed.
    pub dropped_by_field: BTreeMap<String, u64>,
}

impl StreamStats {
    pub fn dropped(&self) -> u64 {
        self.missing_field + self.conversion_failed
    }

    /// Count a skipped data error. Schema errors are never skipped, so they are not counted.
    pub fn record_drop(&mut self, err: &DecodeError) {
        match err {
            DecodeError::MissingField { .. } => self.missing_field += 1,
            DecodeError::Conversion { .. } => self.conversion_failed += 1,
            DecodeError::UnsupportedType { .. } => return,
        }
        *self.dropped_by_field.entry(err.field().to_string()).or_insert(0) += 1;
    }
}

/// Summary of one dump → corpus run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub data_dir: String,
    pub output: String,
    pub comments: StreamStats,
    pub posts: StreamStats,
    pub assembly: AssemblyStats,
    pub documents_written: u64,
    pub answered_documents: u64,
}

impl RunReport {
    pub fn log(&self) {
        tracing::info!(
            data_dir = %self.data_dir,
            comment_rows = self.comments.rows_read,
            post_rows = self.posts.rows_read,
            decoded = self.comments.decoded + self.posts.decoded,
            dropped = self.comments.dropped() + self.posts.dropped(),
            malformed = self.comments.malformed_rows + self.posts.malformed_rows,
            orphan_comments = self.assembly.orphan_comments,
            orphan_answers = self.assembly.orphan_answers,
            documents = self.documents_written,
            answered = self.answered_documents,
            "run complete"
        );
        if self.comments.dropped() + self.posts.dropped() > 0 {
            tracing::warn!(
                comments = ?self.comments.dropped_by_field,
                posts = ?self.posts.dropped_by_field,
                "rows dropped by failing field"
            );
        }
    }
}

/// Write one or more run reports as pretty JSON.
pub fn save_reports(reports: &[RunReport], path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, reports)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_are_counted_by_kind_and_field() {
        let mut s = StreamStats::default();
        s.record_drop(&DecodeError::MissingField { field: "Score", key: "Score" });
        s.record_drop(&DecodeError::Conversion { field: "Score", value: "x".into(), source: "bad".into() });
        s.record_drop(&DecodeError::MissingField { field: "Id", key: "Id" });
        assert_eq!(s.missing_field, 2);
        assert_eq!(s.conversion_failed, 1);
        assert_eq!(s.dropped(), 3);
        assert_eq!(s.dropped_by_field["Score"], 2);
    }

    #[test]
    fn schema_errors_leave_drop_counters_consistent() {
        let mut s = StreamStats::default();
        s.record_drop(&DecodeError::UnsupportedType { field: "Geo", declared: "Point" });
        assert_eq!(s.dropped(), 0);
        assert!(s.dropped_by_field.is_empty());
    }

    #[test]
    fn reports_serialize_as_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("report.json");
        let r = RunReport { documents_written: 3, ..Default::default() };
        save_reports(&[r], &p).unwrap();
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&p).unwrap()).unwrap();
        assert_eq!(v[0]["documents_written"], 3);
        assert_eq!(v[0]["assembly"]["orphan_comments"], 0);
    }
}
