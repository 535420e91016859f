//! Append-only JSONL corpus writer.

use crate::flatten::FlatDocument;
use crate::util::append_with_backoff;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One corpus line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub text: String,
    pub meta: CorpusMeta,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusMeta {
    pub set_name: String,
    pub score: i64,
    pub question_id: i64,
}

impl CorpusRecord {
    pub fn from_document(doc: FlatDocument, set_name: &str) -> Self {
        Self {
            text: doc.text,
            meta: CorpusMeta { set_name: set_name.to_string(), score: doc.score, question_id: doc.question_id },
        }
    }
}

/// Buffered JSONL writer that appends to an existing corpus file.
/// Lines already in the file are left untouched.
pub struct NdjsonWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
    written: u64,
}

impl NdjsonWriter {
    pub fn append(path: &Path, buf_bytes: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let f = append_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)),
            written: 0,
        })
    }

    pub fn write_record<T: Serialize>(&mut self, rec: &T) -> Result<()> {
        if let Some(w) = &mut self.w {
            serde_json::to_writer(&mut *w, rec)?;
            w.write_all(b"\n")?;
            self.written += 1;
        }
        Ok(())
    }

    /// Flush and return the number of records this writer appended.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(self.written)
    }
}
