use crate::assemble::{assemble, Assembly};
use crate::config::{BadRecordPolicy, ConvertOptions};
use crate::flatten::{flatten, FlatDocument};
use crate::model::{Comment, LinkedQuestion, Post};
use crate::ndjson::{CorpusRecord, NdjsonWriter};
use crate::paths::{locate_dump, DumpFiles};
use crate::progress::{make_count_progress, make_progress_bar_labeled};
use crate::report::{RunReport, StreamStats};
use crate::schema::{decode_record, Record};
use crate::util::init_tracing_once;
use crate::xml_rows::open_rows;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::Path;

/// Refresh byte progress every this many rows.
const PROGRESS_EVERY_ROWS: u64 = 4096;

/// Decoded and assembled content of one dump, with per-table counters.
#[derive(Debug)]
pub struct LoadedDump {
    pub assembly: Assembly,
    pub comments: StreamStats,
    pub posts: StreamStats,
}

/// One-shot dump → corpus converter.
#[derive(Clone)]
pub struct DumpConverter {
    pub(crate) opts: ConvertOptions,
}

impl Default for DumpConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpConverter {
    pub fn new() -> Self {
        Self { opts: ConvertOptions::default() }
    }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_out_dir(dir); self }
    pub fn output_name(mut self, name: impl Into<String>) -> Self { self.opts = self.opts.with_output_name(name); self }
    pub fn set_name(mut self, name: impl Into<String>) -> Self { self.opts = self.opts.with_set_name(name); self }
    pub fn bad_records(mut self, policy: BadRecordPolicy) -> Self { self.opts = self.opts.with_bad_records(policy); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    /// Stream one dump table and decode every row into `R`.
    ///
    /// Data errors follow the configured [`BadRecordPolicy`]; schema errors and read
    /// failures abort at once.
    pub fn decode_file<R: Record>(&self, path: &Path) -> Result<(Vec<R>, StreamStats)> {
        let mut rows = open_rows(path, self.opts.read_buffer_bytes)?;
        let record = R::schema().record;

        let total_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let pb = if self.opts.progress {
            let label = match self.opts.progress_label.as_deref() {
                Some(l) => format!("{l}: {record}"),
                None => format!("Decoding {record}"),
            };
            Some(make_progress_bar_labeled(total_bytes, &label))
        } else {
            None
        };

        let mut stats = StreamStats::default();
        let mut out = Vec::new();
        let mut seen = 0u64;
        while let Some(item) = rows.next() {
            let raw = item.with_context(|| format!("read {}", path.display()))?;
            seen += 1;
            if seen % PROGRESS_EVERY_ROWS == 0 {
                if let Some(pb) = &pb { pb.set_position(rows.bytes_read()); }
            }
            match decode_record::<R>(&raw) {
                Ok(rec) => {
                    stats.decoded += 1;
                    out.push(rec);
                }
                Err(e) if e.is_fatal() => {
                    return Err(anyhow!(e)).with_context(|| format!("{record} schema cannot decode {}", path.display()));
                }
                Err(e) => match self.opts.bad_records {
                    BadRecordPolicy::Abort => {
                        return Err(anyhow!(e))
                            .with_context(|| format!("bad {record} row #{seen} in {}", path.display()));
                    }
                    BadRecordPolicy::Skip => {
                        tracing::debug!(record, row = seen, error = %e, "skipping row");
                        stats.record_drop(&e);
                    }
                },
            }
        }
        stats.rows_read = rows.rows_read();
        stats.malformed_rows = rows.rows_skipped();

        if let Some(pb) = pb {
            pb.set_position(rows.bytes_read());
            pb.finish_with_message(format!("{record} done"));
        }
        tracing::info!(
            record,
            path = %path.display(),
            decoded = stats.decoded,
            dropped = stats.dropped(),
            malformed = stats.malformed_rows,
            "processed dump table"
        );
        Ok((out, stats))
    }

    fn dump_files(&self) -> Result<DumpFiles> {
        locate_dump(&self.opts.data_dir)
    }

    /// Decode both tables and assemble linked questions. Holds the whole dump in memory.
    pub fn load(&self) -> Result<LoadedDump> {
        init_tracing_once();
        let files = self.dump_files()?;
        let (comments, comment_stats) = self.decode_file::<Comment>(&files.comments)?;
        let (posts, post_stats) = self.decode_file::<Post>(&files.posts)?;
        let assembly = assemble(comments, posts);
        Ok(LoadedDump { assembly, comments: comment_stats, posts: post_stats })
    }

    /// Flatten every question, preserving ascending question-id order.
    pub fn flatten_all(&self, questions: &[&LinkedQuestion]) -> Result<Vec<FlatDocument>> {
        let pb = if self.opts.progress {
            Some(make_count_progress(questions.len() as u64, "Flattening"))
        } else {
            None
        };
        let run = || -> Vec<FlatDocument> {
            questions
                .par_iter()
                .map(|q| {
                    let doc = flatten(q);
                    if let Some(pb) = &pb { pb.inc(1); }
                    doc
                })
                .collect()
        };
        let docs = match self.opts.parallelism {
            Some(n) if n > 0 => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .context("build flatten thread pool")?
                .install(run),
            _ => run(),
        };
        if let Some(pb) = pb {
            pb.finish_with_message("Flattening done");
        }
        Ok(docs)
    }

    /// Full run: decode, assemble, flatten, append to the corpus file.
    pub fn run(&self) -> Result<RunReport> {
        init_tracing_once();
        let loaded = self.load()?;
        let questions: Vec<&LinkedQuestion> = loaded.assembly.questions.values().collect();
        let docs = self.flatten_all(&questions)?;

        let out_path = self.opts.output_path();
        let mut writer = NdjsonWriter::append(&out_path, self.opts.write_buffer_bytes)?;
        let mut answered = 0u64;
        for doc in docs {
            if doc.was_answered {
                answered += 1;
            }
            writer.write_record(&CorpusRecord::from_document(doc, &self.opts.set_name))?;
        }
        let written = writer.finish()?;

        let report = RunReport {
            data_dir: self.opts.data_dir.display().to_string(),
            output: out_path.display().to_string(),
            comments: loaded.comments,
            posts: loaded.posts,
            assembly: loaded.assembly.stats,
            documents_written: written,
            answered_documents: answered,
        };
        report.log();
        Ok(report)
    }
}
